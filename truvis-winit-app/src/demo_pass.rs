//! 演示用的 pass：更新 camera uniform，清屏 Rendered，再 blit 到 swapchain
//!
//! 只依赖 FrameResourceTable 与 GfxCommandBuffer，不关心资源来自哪个 scope。

use ash::vk;
use bytemuck::{Pod, Zeroable};

use truvis_gfx::foundation::device::GfxDevice;
use truvis_render_interface::{
    gfx_resource_manager::GfxResourceManager,
    handles::{GfxBufferHandle, GfxImageHandle},
    image_resource::AttachmentLoad,
    image_state::ImageSyncState,
    resource_definition::{BufferResourceId, ImageResourceId, default_buffer_definition, default_image_definition},
};
use truvis_renderer::renderer::RenderFrame;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: glam::Mat4,
    pub projection: glam::Mat4,
    /// xyz 为相机位置，w 为累计时间
    pub position: glam::Vec4,
}

impl CameraUniform {
    /// 绕原点旋转的相机
    pub fn orbit(time_s: f32, aspect: f32) -> Self {
        let radius = 5.0;
        let position = glam::Vec3::new(radius * time_s.cos(), 2.0, radius * time_s.sin());
        let view = glam::Mat4::look_at_rh(position, glam::Vec3::ZERO, glam::Vec3::Y);
        let mut projection = glam::Mat4::perspective_rh(60f32.to_radians(), aspect.max(f32::EPSILON), 0.1, 100.0);
        // vulkan 的 NDC y 轴朝下
        projection.y_axis.y *= -1.0;

        Self {
            view,
            projection,
            position: position.extend(time_s),
        }
    }
}

pub struct DemoPass {
    rendered: GfxImageHandle,
    camera: GfxBufferHandle,
}

// new & init
impl DemoPass {
    pub fn register(manager: &mut GfxResourceManager) -> Self {
        let rendered =
            manager.register_transient_image(ImageResourceId::Rendered, default_image_definition(ImageResourceId::Rendered));
        let camera = manager
            .register_transient_buffer(BufferResourceId::Camera, default_buffer_definition(BufferResourceId::Camera));
        log::info!("demo pass registered: rendered {:?}, camera {:?}", rendered, camera);

        Self { rendered, camera }
    }
}

// tools
impl DemoPass {
    fn clear_color(time_s: f32) -> vk::ClearValue {
        let t = time_s * 0.5;
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.5 + 0.5 * t.sin(), 0.5 + 0.5 * (t + 2.0).sin(), 0.5 + 0.5 * (t + 4.0).sin(), 1.0],
            },
        }
    }

    fn full_region(extent: vk::Extent2D) -> [vk::Offset3D; 2] {
        [
            vk::Offset3D::default(),
            vk::Offset3D {
                x: extent.width as i32,
                y: extent.height as i32,
                z: 1,
            },
        ]
    }
}

// update
impl DemoPass {
    pub fn record(&self, device: &GfxDevice, frame: &mut RenderFrame, time_s: f32) {
        let _span = tracy_client::span!("DemoPass::record");
        let cmd = &frame.cmd;
        let table = &mut frame.table;

        let swapchain_extent = table.get_image(frame.swapchain_image).extent();
        let aspect = swapchain_extent.width as f32 / swapchain_extent.height.max(1) as f32;
        table.get_buffer_mut(self.camera).update::<CameraUniform>(|camera| {
            *camera = CameraUniform::orbit(time_s, aspect);
        });

        // 每帧完整覆盖，上一轮的内容不需要保留
        let rendered = table.get_image_mut(self.rendered);
        rendered.invalidate();
        if let Some(barrier) = rendered.prepare_barrier(ImageSyncState::COLOR_ATTACHMENT_OUTPUT) {
            cmd.image_memory_barrier(device, &[barrier]);
        }

        let rendered_extent = rendered.extent();
        let color_attachment = rendered.as_attachment(AttachmentLoad::Clear(Self::clear_color(time_s)));
        let rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent: rendered_extent,
            })
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&color_attachment));
        cmd.begin_rendering(device, &rendering_info);
        cmd.end_rendering(device);

        let mut barriers = Vec::with_capacity(2);
        let rendered = table.get_image_mut(self.rendered);
        barriers.extend(rendered.prepare_barrier(ImageSyncState::TRANSFER_SRC));
        let rendered_image = rendered.handle();

        let swapchain = table.get_image_mut(frame.swapchain_image);
        barriers.extend(swapchain.prepare_barrier(ImageSyncState::TRANSFER_DST));
        let swapchain_image = swapchain.handle();

        if !barriers.is_empty() {
            cmd.image_memory_barrier(device, &barriers);
        }

        let color_layers = vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        };
        let region = vk::ImageBlit2::default()
            .src_subresource(color_layers)
            .src_offsets(Self::full_region(rendered_extent))
            .dst_subresource(color_layers)
            .dst_offsets(Self::full_region(swapchain_extent));
        let blit_info = vk::BlitImageInfo2::default()
            .src_image(rendered_image)
            .src_image_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
            .dst_image(swapchain_image)
            .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .regions(std::slice::from_ref(&region))
            .filter(vk::Filter::LINEAR);
        cmd.blit_image(device, &blit_info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_uniform_fits_camera_buffer() {
        let definition = default_buffer_definition(BufferResourceId::Camera);
        assert!(size_of::<CameraUniform>() as vk::DeviceSize <= definition.size);
    }

    #[test]
    fn test_orbit_camera_keeps_height_and_time() {
        let camera = CameraUniform::orbit(1.5, 16.0 / 9.0);
        assert_eq!(camera.position.y, 2.0);
        assert_eq!(camera.position.w, 1.5);
        assert!(camera.projection.y_axis.y < 0.0);

        // 零高度窗口不会产生 NaN
        let degenerate = CameraUniform::orbit(0.0, 0.0);
        assert!(degenerate.projection.is_finite());
    }

    #[test]
    fn test_full_region_covers_extent() {
        let [min, max] = DemoPass::full_region(vk::Extent2D {
            width: 640,
            height: 360,
        });
        assert_eq!((min.x, min.y, min.z), (0, 0, 0));
        assert_eq!((max.x, max.y, max.z), (640, 360, 1));
    }
}
