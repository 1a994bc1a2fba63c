use ash::vk;

use truvis_gfx::{
    gfx_core::GfxCore,
    lifetime::lifetime::GfxLifetime,
    swapchain::render_swapchain::GfxRenderSwapchain,
};
use truvis_render_interface::{
    image_resource::ImageResource, image_state::ImageSyncState, pipeline_settings::DefaultRendererSettings,
};

use crate::present::frame_pacer::SWAPCHAIN_ACQUIRE_WAIT_STAGE;

/// swapchain 以及其作用域
///
/// swapchain 与其 image views 登记在 swapchain_lifetime 上。
/// 重建时先清理整个作用域，再创建新的 swapchain。
pub struct RenderPresent {
    swapchain: GfxRenderSwapchain,
    swapchain_lifetime: GfxLifetime,

    present_mode: vk::PresentModeKHR,
    surface_format: vk::SurfaceFormatKHR,

    /// present 得到 out of date 或 suboptimal 之后，在下一帧开始时重建
    need_rebuild: bool,
}

// new & init
impl RenderPresent {
    pub fn new(core: &GfxCore, present_mode: vk::PresentModeKHR, window_extent: vk::Extent2D) -> Self {
        let mut swapchain_lifetime = GfxLifetime::new("swapchain");
        let surface_format = DefaultRendererSettings::DEFAULT_SURFACE_FORMAT;
        let swapchain = Self::create_swapchain(core, present_mode, surface_format, window_extent, &mut swapchain_lifetime);

        Self {
            swapchain,
            swapchain_lifetime,
            present_mode,
            surface_format,
            need_rebuild: false,
        }
    }

    fn create_swapchain(
        core: &GfxCore,
        present_mode: vk::PresentModeKHR,
        surface_format: vk::SurfaceFormatKHR,
        window_extent: vk::Extent2D,
        lifetime: &mut GfxLifetime,
    ) -> GfxRenderSwapchain {
        GfxRenderSwapchain::new(
            core.device(),
            core.physical_device().vk_handle(),
            core.surface(),
            present_mode,
            surface_format,
            window_extent,
            lifetime,
        )
    }
}

// getters
impl RenderPresent {
    #[inline]
    pub fn swapchain(&self) -> &GfxRenderSwapchain {
        &self.swapchain
    }
    #[inline]
    pub fn need_rebuild(&self) -> bool {
        self.need_rebuild
    }

    /// 以外部 record 的形式提供给 FrameResourceTable
    ///
    /// 每帧都会覆盖 swapchain image 的全部内容，初始 layout 为 UNDEFINED。
    /// src stage 与等待 image acquired 的 stage 一致。
    pub fn swapchain_image(&self, image_index: u32) -> ImageResource {
        ImageResource::from_external_image(
            self.swapchain.image(image_index),
            self.swapchain.image_view(image_index),
            GfxRenderSwapchain::image_usage(),
            self.swapchain.extent(),
            self.swapchain.color_format(),
            ImageSyncState {
                stage: SWAPCHAIN_ACQUIRE_WAIT_STAGE,
                ..ImageSyncState::UNDEFINED
            },
        )
    }
}

// update
impl RenderPresent {
    #[inline]
    pub fn request_rebuild(&mut self) {
        self.need_rebuild = true;
    }

    /// 调用者需要保证 device 已经 idle
    pub fn rebuild(&mut self, core: &GfxCore, window_extent: vk::Extent2D) {
        let _span = tracy_client::span!("RenderPresent::rebuild");
        log::info!("rebuild swapchain, window extent: {}x{}", window_extent.width, window_extent.height);

        self.swapchain_lifetime.cleanup(core.device(), core.allocator());
        self.swapchain = Self::create_swapchain(
            core,
            self.present_mode,
            self.surface_format,
            window_extent,
            &mut self.swapchain_lifetime,
        );
        self.need_rebuild = false;
    }
}

// destroy
impl RenderPresent {
    pub fn destroy(mut self, core: &GfxCore) {
        self.swapchain_lifetime.cleanup(core.device(), core.allocator());
    }
}
