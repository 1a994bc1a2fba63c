use ash::vk;

use truvis_gfx::{
    commands::barrier::GfxImageBarrier,
    foundation::debug_messenger::DebugType,
    lifetime::{
        entries::{AllocatorEntry, DeviceEntry},
        lifetime::GfxLifetime,
    },
};

use crate::{image_state::ImageSyncState, resource_definition::aspect_mask_of_usage};

/// image 的所有权来源
pub enum ImageSource {
    /// 由 vma 分配，image 与 view 都由 record 持有，需要 tie 到某个 lifetime 才能销毁
    Allocated(vk_mem::Allocation),
    /// 由外部持有（例如 swapchain image），这里只引用 handle
    External,
}

/// dynamic rendering 中 attachment 的 load 方式
#[derive(Clone, Copy)]
pub enum AttachmentLoad {
    Clear(vk::ClearValue),
    Load,
    DontCare,
}

/// 一个 image 的物理记录
///
/// sync_state 始终等于最近一次为这个物理对象发出的 barrier 的目标状态。
/// record 只能移动，不能复制：持有 allocation 的 record 被丢弃之前必须 tie 到 lifetime。
pub struct ImageResource {
    image: vk::Image,
    view: vk::ImageView,
    sync_state: ImageSyncState,
    source: ImageSource,

    usage: vk::ImageUsageFlags,
    aspect: vk::ImageAspectFlags,
    extent: vk::Extent2D,
    format: vk::Format,
}

impl DebugType for ImageResource {
    fn debug_type_name() -> &'static str {
        "ImageResource"
    }

    fn vk_handle(&self) -> impl vk::Handle + Copy {
        self.image
    }
}

impl Drop for ImageResource {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        if matches!(self.source, ImageSource::Allocated(_)) {
            panic!("image {:?} dropped without being tied to a lifetime", self.image);
        }
    }
}

// new & init
impl ImageResource {
    /// 新分配的 image，内容未定义
    pub fn new_allocated(
        image: vk::Image,
        view: vk::ImageView,
        allocation: vk_mem::Allocation,
        usage: vk::ImageUsageFlags,
        extent: vk::Extent2D,
        format: vk::Format,
    ) -> Self {
        Self {
            image,
            view,
            sync_state: ImageSyncState::UNDEFINED,
            source: ImageSource::Allocated(allocation),
            usage,
            aspect: aspect_mask_of_usage(usage),
            extent,
            format,
        }
    }

    /// 包装一个由外部持有的 image，sync_state 由持有者告知
    pub fn from_external_image(
        image: vk::Image,
        view: vk::ImageView,
        usage: vk::ImageUsageFlags,
        extent: vk::Extent2D,
        format: vk::Format,
        sync_state: ImageSyncState,
    ) -> Self {
        Self {
            image,
            view,
            sync_state,
            source: ImageSource::External,
            usage,
            aspect: aspect_mask_of_usage(usage),
            extent,
            format,
        }
    }
}

// getters
impl ImageResource {
    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.image
    }
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.view
    }
    #[inline]
    pub fn sync_state(&self) -> ImageSyncState {
        self.sync_state
    }
    #[inline]
    pub fn usage(&self) -> vk::ImageUsageFlags {
        self.usage
    }
    #[inline]
    pub fn aspect(&self) -> vk::ImageAspectFlags {
        self.aspect
    }
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }
    #[inline]
    pub fn is_external(&self) -> bool {
        matches!(self.source, ImageSource::External)
    }
}

// barrier
impl ImageResource {
    /// 从当前状态迁移到 next
    ///
    /// layout 与 queue family 都相同时不产生 barrier（例如连续的读）。
    /// 无论是否产生 barrier，记录的状态都会被覆盖为 next。
    pub fn prepare_barrier(&mut self, next: ImageSyncState) -> Option<GfxImageBarrier> {
        let prev = std::mem::replace(&mut self.sync_state, next);
        if !prev.needs_barrier_to(&next) {
            return None;
        }

        let mut barrier = GfxImageBarrier::new()
            .image(self.image)
            .image_aspect_flag(self.aspect)
            .layout_transfer(prev.layout, next.layout)
            .src_mask(prev.stage, prev.access)
            .dst_mask(next.stage, next.access);
        if prev.is_queue_transfer_to(&next) {
            barrier = barrier.queue_family_transfer(prev.queue_family, next.queue_family);
        }
        Some(barrier)
    }

    /// 丢弃之前的内容：下一次 barrier 会从 UNDEFINED 开始，不需要等待之前的读写
    #[inline]
    pub fn invalidate(&mut self) {
        self.sync_state = ImageSyncState::UNDEFINED;
    }

    /// 以当前 layout 作为 dynamic rendering 的 attachment
    ///
    /// 调用之前需要先通过 prepare_barrier 迁移到 attachment layout
    pub fn as_attachment(&self, load: AttachmentLoad) -> vk::RenderingAttachmentInfo<'static> {
        let layout = self.sync_state.layout;
        if !matches!(
            layout,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
                | vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL
                | vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
                | vk::ImageLayout::GENERAL
        ) {
            panic!("image {:?} used as attachment in layout {:?}", self.image, layout);
        }

        let (load_op, clear_value) = match load {
            AttachmentLoad::Clear(value) => (vk::AttachmentLoadOp::CLEAR, value),
            AttachmentLoad::Load => (vk::AttachmentLoadOp::LOAD, vk::ClearValue::default()),
            AttachmentLoad::DontCare => (vk::AttachmentLoadOp::DONT_CARE, vk::ClearValue::default()),
        };

        vk::RenderingAttachmentInfo::default()
            .image_view(self.view)
            .image_layout(layout)
            .load_op(load_op)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(clear_value)
    }
}

// destroy
impl ImageResource {
    /// 将 image、view 与 allocation 交给 lifetime，外部 image 什么都不做
    ///
    /// lifetime cleanup 时先清理 device 栈，因此 view 会在 image 之前销毁
    pub fn tie(mut self, lifetime: &mut GfxLifetime) {
        if let ImageSource::Allocated(allocation) = std::mem::replace(&mut self.source, ImageSource::External) {
            lifetime.tie_device(DeviceEntry::ImageView(self.view));
            lifetime.tie_allocator(AllocatorEntry::Image {
                image: self.image,
                allocation,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;

    fn color_target() -> ImageResource {
        ImageResource::from_external_image(
            vk::Image::from_raw(0x10),
            vk::ImageView::from_raw(0x11),
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            vk::Extent2D {
                width: 64,
                height: 64,
            },
            vk::Format::R8G8B8A8_UNORM,
            ImageSyncState::UNDEFINED,
        )
    }

    #[test]
    fn test_same_state_twice_emits_no_barrier() {
        let mut image = color_target();
        assert!(image.prepare_barrier(ImageSyncState::FRAGMENT_SHADER_READ_ONLY).is_some());
        assert!(image.prepare_barrier(ImageSyncState::FRAGMENT_SHADER_READ_ONLY).is_none());
    }

    #[test]
    fn test_state_equals_last_request() {
        let mut image = color_target();
        let requests = [
            ImageSyncState::COLOR_ATTACHMENT_OUTPUT,
            ImageSyncState::COLOR_ATTACHMENT_OUTPUT,
            ImageSyncState::TRANSFER_SRC.with_queue_family(2),
            ImageSyncState::FRAGMENT_SHADER_READ_ONLY,
            ImageSyncState::UNDEFINED,
        ];
        for request in requests {
            image.prepare_barrier(request);
            assert_eq!(image.sync_state(), request);
        }
    }

    #[test]
    fn test_invalidate_then_color_attachment() {
        let mut image = color_target();
        image.prepare_barrier(ImageSyncState::FRAGMENT_SHADER_READ_ONLY);

        image.invalidate();
        assert_eq!(image.sync_state(), ImageSyncState::UNDEFINED);

        let barrier = image
            .prepare_barrier(ImageSyncState::COLOR_ATTACHMENT_OUTPUT)
            .expect("layout changes, barrier expected");
        let inner = barrier.inner();
        assert_eq!(inner.old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(inner.new_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(inner.src_stage_mask, vk::PipelineStageFlags2::TOP_OF_PIPE);
        assert_eq!(inner.src_access_mask, vk::AccessFlags2::NONE);
        assert_eq!(inner.dst_stage_mask, vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(inner.subresource_range.aspect_mask, vk::ImageAspectFlags::COLOR);
        assert_eq!(inner.image, vk::Image::from_raw(0x10));

        assert!(image.prepare_barrier(ImageSyncState::COLOR_ATTACHMENT_OUTPUT).is_none());
    }

    #[test]
    fn test_queue_ownership_transfer() {
        let mut image = color_target();
        image.prepare_barrier(ImageSyncState::TRANSFER_SRC.with_queue_family(0));

        let barrier = image
            .prepare_barrier(ImageSyncState::TRANSFER_SRC.with_queue_family(1))
            .expect("queue family changes, barrier expected");
        assert_eq!(barrier.inner().src_queue_family_index, 0);
        assert_eq!(barrier.inner().dst_queue_family_index, 1);
        assert_eq!(barrier.inner().old_layout, barrier.inner().new_layout);
    }

    #[test]
    fn test_depth_aspect() {
        let mut depth = ImageResource::from_external_image(
            vk::Image::from_raw(0x20),
            vk::ImageView::from_raw(0x21),
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            vk::Extent2D {
                width: 32,
                height: 32,
            },
            vk::Format::D16_UNORM,
            ImageSyncState::UNDEFINED,
        );
        let barrier = depth.prepare_barrier(ImageSyncState::LATE_DEPTH).expect("barrier expected");
        assert_eq!(barrier.inner().subresource_range.aspect_mask, vk::ImageAspectFlags::DEPTH);
    }

    #[test]
    fn test_as_attachment() {
        let mut image = color_target();
        image.prepare_barrier(ImageSyncState::COLOR_ATTACHMENT_OUTPUT);
        let attachment = image.as_attachment(AttachmentLoad::DontCare);
        assert_eq!(attachment.image_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(attachment.load_op, vk::AttachmentLoadOp::DONT_CARE);
        assert_eq!(attachment.image_view, vk::ImageView::from_raw(0x11));
    }

    #[test]
    #[should_panic(expected = "used as attachment")]
    fn test_attachment_requires_attachment_layout() {
        let image = color_target();
        image.as_attachment(AttachmentLoad::Load);
    }

    #[test]
    fn test_external_tie_is_noop() {
        let mut lifetime = GfxLifetime::new("frame");
        color_target().tie(&mut lifetime);
        assert!(lifetime.is_empty());
    }
}
