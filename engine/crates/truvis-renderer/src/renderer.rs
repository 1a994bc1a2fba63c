use std::time::Instant;

use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use truvis_gfx::{
    commands::command_buffer::GfxCommandBuffer,
    foundation::device::GfxDevice,
    gfx_core::GfxCore,
    lifetime::lifetime::GfxLifetime,
    swapchain::render_swapchain::{GfxAcquireResult, GfxPresentResult},
};
use truvis_render_interface::{
    frame_counter::FrameCounter,
    frame_resource_table::FrameResourceTable,
    gfx_resource_manager::GfxResourceManager,
    handles::GfxImageHandle,
    image_state::ImageSyncState,
    pipeline_settings::{ConfiguredExtents, FrameLabel, FrameSettings},
    resource_builder::GfxResourceBuilder,
    resource_definition::{ImageResourceId, default_image_definition},
};

use crate::{
    frame_timer::FrameTimer,
    present::{frame_pacer::FramePacer, render_present::RenderPresent},
    render_config::RendererConfig,
};

/// 平台层需要提供的窗口信息
pub trait RenderWindow {
    fn raw_display_handle(&self) -> RawDisplayHandle;
    fn raw_window_handle(&self) -> RawWindowHandle;
    /// 以像素为单位的尺寸，最小化时为 0
    fn physical_extent(&self) -> vk::Extent2D;
    fn should_continue(&self) -> bool;
}

/// begin_frame 得到的一帧
///
/// 必须交还给 end_frame
pub struct RenderFrame {
    pub table: FrameResourceTable,
    pub cmd: GfxCommandBuffer,
    pub image_index: u32,
    pub frame_id: u64,
    pub frame_label: FrameLabel,
    /// 当前帧的 swapchain image
    pub swapchain_image: GfxImageHandle,
}

/// 渲染器
///
/// 负责设备、swapchain、帧节奏以及资源管理器的生命周期。
/// 具体绘制什么由外部的 pass 决定，pass 通过 RenderFrame 中的 table 访问资源。
pub struct Renderer {
    core: GfxCore,
    config: RendererConfig,

    frame_settings: FrameSettings,
    configured_extents: ConfiguredExtents,

    resource_manager: GfxResourceManager,
    present: RenderPresent,
    pacer: FramePacer,

    /// 帧同步对象，退出时销毁
    global_lifetime: GfxLifetime,
    /// 当前帧中延迟销毁的对象
    frame_lifetime: GfxLifetime,
    /// 每个 slot 上一轮登记的延迟销毁对象，在这个 slot 的 fence 等待之后才能销毁
    retiring_lifetimes: [GfxLifetime; FrameCounter::FIF_COUNT],
    /// 每个 slot 已提交的帧表，transient 资源在这个 slot 的 fence 等待之后才能交还
    in_flight_tables: [Option<FrameResourceTable>; FrameCounter::FIF_COUNT],

    swapchain_image: GfxImageHandle,
    timer: FrameTimer,
}

// new & init
impl Renderer {
    pub fn new(app_name: &str, window: &impl RenderWindow, config: RendererConfig) -> anyhow::Result<Self> {
        tracy_client::Client::start();
        let _span = tracy_client::span!("Renderer::new");

        let core = GfxCore::new(
            app_name,
            window.raw_display_handle(),
            window.raw_window_handle(),
            config.enable_validation,
        )?;

        let present = RenderPresent::new(&core, config.present_mode.to_vk(), window.physical_extent());
        let mut global_lifetime = GfxLifetime::new("global");
        let pacer = FramePacer::new(core.device(), core.physical_device(), &mut global_lifetime, config.frame_timeout_ns);

        let mut resource_manager = GfxResourceManager::new();
        let swapchain_image = resource_manager
            .register_external_image(ImageResourceId::Swapchain, default_image_definition(ImageResourceId::Swapchain));

        let frame_settings = FrameSettings {
            color_format: present.swapchain().color_format(),
            frame_extent: present.swapchain().extent(),
            internal_resolution_scale: config.internal_resolution_scale,
            ..Default::default()
        };
        let configured_extents = config.configured_extents();

        Ok(Self {
            core,
            config,
            frame_settings,
            configured_extents,
            resource_manager,
            present,
            pacer,
            global_lifetime,
            frame_lifetime: GfxLifetime::new("frame"),
            retiring_lifetimes: FrameCounter::frame_labes().map(|_| GfxLifetime::new("frame")),
            in_flight_tables: FrameCounter::frame_labes().map(|_| None),
            swapchain_image,
            timer: FrameTimer::default(),
        })
    }
}

// getters
impl Renderer {
    #[inline]
    pub fn device(&self) -> &GfxDevice {
        self.core.device()
    }
    #[inline]
    pub fn core(&self) -> &GfxCore {
        &self.core
    }
    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }
    #[inline]
    pub fn frame_settings(&self) -> &FrameSettings {
        &self.frame_settings
    }
    #[inline]
    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }
    #[inline]
    pub fn frame_counter(&self) -> &FrameCounter {
        self.pacer.frame_counter()
    }

    /// 注册资源只能发生在帧之间
    #[inline]
    pub fn resource_manager_mut(&mut self) -> &mut GfxResourceManager {
        &mut self.resource_manager
    }

    /// 登记到这里的对象在 GPU 完成当前帧之后销毁
    #[inline]
    pub fn frame_lifetime_mut(&mut self) -> &mut GfxLifetime {
        &mut self.frame_lifetime
    }
}

// phase
impl Renderer {
    /// 等待空闲的 slot，acquire swapchain image，组装这一帧的资源
    ///
    /// 窗口最小化时返回 None，这一帧被跳过
    pub fn begin_frame(&mut self, window: &impl RenderWindow) -> Option<RenderFrame> {
        let _span = tracy_client::span!("Renderer::begin_frame");

        let window_extent = window.physical_extent();
        if window_extent.width == 0 || window_extent.height == 0 {
            return None;
        }
        self.timer.tick();

        let wait_start = Instant::now();
        let gpu_time_ms = self.pacer.wait_slot(self.core.device());
        self.timer.record_fence_wait(wait_start.elapsed());
        self.timer.record_gpu_time(gpu_time_ms);

        // GPU 已经不再使用这个 slot 上一轮的 transient 资源
        if let Some(table) = self.in_flight_tables[*self.pacer.frame_label()].take() {
            self.resource_manager.release_frame_data(table);
        }

        if self.present.need_rebuild() {
            self.rebuild(window_extent);
        }

        let acquire_start = Instant::now();
        let image_index = loop {
            match self.pacer.acquire(self.core.device(), self.present.swapchain()) {
                GfxAcquireResult::Acquired { image_index, .. } => break image_index,
                GfxAcquireResult::OutOfDate => self.rebuild(window_extent),
            }
        };
        self.timer.record_acquire(acquire_start.elapsed());

        let cmd = self.pacer.begin_recording(self.core.device());

        let mut builder = GfxResourceBuilder::new(
            self.core.device(),
            self.core.allocator(),
            &self.frame_settings,
            &mut self.configured_extents,
        );
        let mut table = self.resource_manager.acquire_frame_data(self.pacer.frame_label(), &mut builder);
        table.set_external_image(self.swapchain_image, self.present.swapchain_image(image_index));

        let frame_counter = self.pacer.frame_counter();
        Some(RenderFrame {
            table,
            cmd,
            image_index,
            frame_id: frame_counter.frame_id(),
            frame_label: frame_counter.frame_label(),
            swapchain_image: self.swapchain_image,
        })
    }

    /// 提交并 present
    ///
    /// storage 资源立即交还给管理器，transient 资源随帧表留在这个 slot 上，
    /// 直到下一次轮到这个 slot 的 begin_frame
    pub fn end_frame(&mut self, frame: RenderFrame) {
        let _span = tracy_client::span!("Renderer::end_frame");
        let RenderFrame {
            mut table,
            cmd,
            image_index,
            swapchain_image,
            ..
        } = frame;

        let device = self.core.device();
        if let Some(barrier) = table.get_image_mut(swapchain_image).prepare_barrier(ImageSyncState::PRESENT) {
            cmd.image_memory_barrier(device, &[barrier]);
        }

        self.pacer.submit(device, self.core.gfx_queue());
        match self.pacer.present(device, self.core.gfx_queue(), self.present.swapchain(), image_index) {
            GfxPresentResult::Presented => {}
            GfxPresentResult::Suboptimal | GfxPresentResult::OutOfDate => self.present.request_rebuild(),
        }

        // 这个 slot 上一轮登记的对象已经被 begin_frame 中的 fence 等待保护
        self.resource_manager.collect_retired(&mut self.frame_lifetime);
        let slot = *self.pacer.frame_label();
        let finished = std::mem::replace(
            &mut self.retiring_lifetimes[slot],
            std::mem::replace(&mut self.frame_lifetime, GfxLifetime::new("frame")),
        );
        Self::flush_lifetime(&self.core, finished);

        self.resource_manager.finish_recording(&mut table);
        self.in_flight_tables[slot] = Some(table);
        self.pacer.finish_frame();
    }

    #[inline]
    pub fn request_rebuild(&mut self) {
        self.present.request_rebuild();
    }

    /// 重建 swapchain 以及依赖 swapchain 的资源
    fn rebuild(&mut self, window_extent: vk::Extent2D) {
        let _span = tracy_client::span!("Renderer::rebuild");
        self.core.device().wait_idle();
        self.release_in_flight_tables();

        self.present.rebuild(&self.core, window_extent);
        self.frame_settings.frame_extent = self.present.swapchain().extent();
        self.frame_settings.color_format = self.present.swapchain().color_format();

        // device 已经 idle，可以立即销毁
        let mut stale = GfxLifetime::new("stale");
        self.resource_manager.invalidate_swapchain_dependents(&mut stale);
        Self::flush_lifetime(&self.core, stale);
    }

    /// 只能在 device idle 之后调用
    fn release_in_flight_tables(&mut self) {
        for table in self.in_flight_tables.iter_mut().filter_map(Option::take) {
            self.resource_manager.release_frame_data(table);
        }
    }

    fn flush_lifetime(core: &GfxCore, mut lifetime: GfxLifetime) {
        lifetime.cleanup(core.device(), core.allocator());
    }
}

// destroy
impl Renderer {
    /// wait idle -> 资源管理器 -> swapchain -> 延迟销毁的对象 -> 帧同步对象 -> 设备
    pub fn destroy(mut self) {
        let _span = tracy_client::span!("Renderer::destroy");
        self.core.device().wait_idle();
        self.release_in_flight_tables();

        let Self {
            core,
            resource_manager,
            present,
            mut global_lifetime,
            frame_lifetime,
            retiring_lifetimes,
            ..
        } = self;

        let mut resources = GfxLifetime::new("resources");
        resource_manager.destroy(&mut resources);
        Self::flush_lifetime(&core, resources);

        present.destroy(&core);

        Self::flush_lifetime(&core, frame_lifetime);
        for lifetime in retiring_lifetimes {
            Self::flush_lifetime(&core, lifetime);
        }

        global_lifetime.cleanup(core.device(), core.allocator());
        core.destroy();
        log::info!("renderer destroyed");
    }
}
