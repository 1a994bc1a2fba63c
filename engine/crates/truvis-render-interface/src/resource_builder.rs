use ash::vk;
use vk_mem::Alloc;

use truvis_gfx::{
    foundation::{device::GfxDevice, mem_allocator::GfxMemAllocator},
    resources::create_info::{GfxImageCreateInfo, GfxImageViewCreateInfo},
};

use crate::{
    buffer_resource::BufferResource,
    image_resource::ImageResource,
    pipeline_settings::{ConfiguredExtents, FrameSettings},
    resource_definition::{BufferDefinition, ImageDefinition},
};

/// 根据 definition 创建 image
///
/// 返回的 record 的同步状态为 UNDEFINED
pub trait ImageBuilder {
    fn build_image(&mut self, definition: &ImageDefinition) -> ImageResource;
}

/// 根据 definition 创建 buffer
pub trait BufferBuilder {
    fn build_buffer(&mut self, definition: &BufferDefinition) -> BufferResource;
}

/// 通过 vma 分配资源的 builder
///
/// 尺寸与格式根据当前的 FrameSettings 以及 ConfiguredExtents 决定。
/// 分配失败意味着显存耗尽，直接 panic。
pub struct GfxResourceBuilder<'a> {
    device: &'a GfxDevice,
    allocator: &'a GfxMemAllocator,
    frame_settings: &'a FrameSettings,
    configured_extents: &'a mut ConfiguredExtents,
}

impl<'a> GfxResourceBuilder<'a> {
    pub fn new(
        device: &'a GfxDevice,
        allocator: &'a GfxMemAllocator,
        frame_settings: &'a FrameSettings,
        configured_extents: &'a mut ConfiguredExtents,
    ) -> Self {
        Self {
            device,
            allocator,
            frame_settings,
            configured_extents,
        }
    }
}

impl ImageBuilder for GfxResourceBuilder<'_> {
    fn build_image(&mut self, definition: &ImageDefinition) -> ImageResource {
        let _span = tracy_client::span!("GfxResourceBuilder::build_image");

        let extent = definition.resolve_extent(self.frame_settings, self.configured_extents);
        let format = definition.resolve_format(self.frame_settings);
        let aspect = definition.aspect_mask();

        let image_ci = GfxImageCreateInfo::new_image_2d_info(extent, format, definition.usage);
        let alloc_ci = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferDevice,
            ..Default::default()
        };
        let (image, allocation) = unsafe { self.allocator.create_image(image_ci.as_info(), &alloc_ci) }
            .unwrap_or_else(|e| panic!("failed to allocate image <{}>: {:?}", definition.debug_name, e));
        self.device.set_object_debug_name(image, format!("{} image", definition.debug_name));

        let view_ci = GfxImageViewCreateInfo::new_image_view_2d_info(image, format, aspect);
        let view = unsafe { self.device.create_image_view(view_ci.as_info(), None) }
            .unwrap_or_else(|e| panic!("failed to create image view <{}>: {:?}", definition.debug_name, e));
        self.device.set_object_debug_name(view, format!("{} view", definition.debug_name));

        log::debug!(
            "build image <{}>: {}x{} {:?}",
            definition.debug_name,
            extent.width,
            extent.height,
            format
        );
        ImageResource::new_allocated(image, view, allocation, definition.usage, extent, format)
    }
}

impl BufferBuilder for GfxResourceBuilder<'_> {
    fn build_buffer(&mut self, definition: &BufferDefinition) -> BufferResource {
        let _span = tracy_client::span!("GfxResourceBuilder::build_buffer");

        let buffer_ci = vk::BufferCreateInfo::default()
            .size(definition.size)
            .usage(definition.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let alloc_ci = definition.allocation_create_info();
        let (buffer, mut allocation) = unsafe { self.allocator.create_buffer(&buffer_ci, &alloc_ci) }
            .unwrap_or_else(|e| panic!("failed to allocate buffer <{}>: {:?}", definition.debug_name, e));
        self.device.set_object_debug_name(buffer, format!("{} buffer", definition.debug_name));

        let mapped_ptr = if definition.is_host_visible() {
            let ptr = unsafe { self.allocator.map_memory(&mut allocation) }
                .unwrap_or_else(|e| panic!("failed to map buffer <{}>: {:?}", definition.debug_name, e));
            Some(ptr)
        } else {
            None
        };

        log::debug!("build buffer <{}>: {} bytes", definition.debug_name, definition.size);
        BufferResource::new_allocated(buffer, allocation, mapped_ptr, definition.usage, definition.size)
    }
}
