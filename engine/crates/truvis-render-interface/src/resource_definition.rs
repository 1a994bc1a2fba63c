use ash::vk;

use crate::pipeline_settings::{ConfiguredExtents, FrameSettings};

/// image 的逻辑身份
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageResourceId {
    Swapchain,
    /// 最终颜色输出，blit 到 swapchain 之前的内部分辨率图像
    Rendered,
    GBuffer0,
    GBuffer1,
    GBuffer2,
    GBuffer3,
    Depth,
    ShadowMap,
}

/// buffer 的逻辑身份
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferResourceId {
    Camera,
    ShadowCamera,
}

/// image 尺寸的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSize {
    /// 与 swapchain 一致
    Framebuffer,
    /// swapchain 尺寸乘以内部分辨率缩放
    InternalResolution,
    Fixed { width: u32, height: u32 },
    /// 从 ConfiguredExtents 中按名字读取，缺失时使用默认值
    Configured {
        name: &'static str,
        default_width: u32,
        default_height: u32,
    },
}

/// image format 的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// 与 swapchain 一致
    Framebuffer,
    Fixed(vk::Format),
}

/// 一个 image 的声明式描述
///
/// 注册之后不可变；值相等的 definition 共享同一个 pool。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDefinition {
    pub usage: vk::ImageUsageFlags,
    pub size: ImageSize,
    pub format: ImageFormat,
    pub debug_name: &'static str,
}

impl ImageDefinition {
    /// swapchain 重建之后需要重新创建
    #[inline]
    pub fn depends_on_swapchain(&self) -> bool {
        matches!(self.size, ImageSize::Framebuffer | ImageSize::InternalResolution)
            || matches!(self.format, ImageFormat::Framebuffer)
    }

    #[inline]
    pub fn aspect_mask(&self) -> vk::ImageAspectFlags {
        aspect_mask_of_usage(self.usage)
    }

    pub fn resolve_extent(&self, frame_settings: &FrameSettings, configured: &mut ConfiguredExtents) -> vk::Extent2D {
        match self.size {
            ImageSize::Framebuffer => frame_settings.frame_extent,
            ImageSize::InternalResolution => frame_settings.internal_extent(),
            ImageSize::Fixed { width, height } => vk::Extent2D { width, height },
            ImageSize::Configured {
                name,
                default_width,
                default_height,
            } => configured.resolve(
                name,
                vk::Extent2D {
                    width: default_width,
                    height: default_height,
                },
            ),
        }
    }

    #[inline]
    pub fn resolve_format(&self, frame_settings: &FrameSettings) -> vk::Format {
        match self.format {
            ImageFormat::Framebuffer => frame_settings.color_format,
            ImageFormat::Fixed(format) => format,
        }
    }
}

/// 根据 usage 推导 barrier 以及 view 使用的 aspect
///
/// - depth stencil attachment -> DEPTH
/// - color attachment / sampled / storage / transfer -> COLOR
///
/// 同时声明 color attachment 与 depth stencil attachment 是非法的。
/// 带有 depth usage 的 image 同时被采样（例如 shadow map）时，aspect 仍然是 DEPTH。
pub fn aspect_mask_of_usage(usage: vk::ImageUsageFlags) -> vk::ImageAspectFlags {
    let is_depth = usage.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT);
    if is_depth && usage.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT) {
        panic!("image usage {:?} declares both color and depth attachment", usage);
    }
    if is_depth {
        return vk::ImageAspectFlags::DEPTH;
    }

    let color_usage = vk::ImageUsageFlags::COLOR_ATTACHMENT
        | vk::ImageUsageFlags::SAMPLED
        | vk::ImageUsageFlags::STORAGE
        | vk::ImageUsageFlags::TRANSFER_SRC
        | vk::ImageUsageFlags::TRANSFER_DST;
    if usage.intersects(color_usage) {
        vk::ImageAspectFlags::COLOR
    } else {
        vk::ImageAspectFlags::empty()
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferOptionFlags: u32 {
        /// CPU 每帧写入，GPU 读取：host visible，持久映射
        const CPU_TO_GPU = 1 << 0;
    }
}

/// 一个 buffer 的声明式描述
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferDefinition {
    pub usage: vk::BufferUsageFlags,
    pub size: vk::DeviceSize,
    pub flags: BufferOptionFlags,
    pub debug_name: &'static str,
}

impl BufferDefinition {
    #[inline]
    pub fn is_host_visible(&self) -> bool {
        self.flags.contains(BufferOptionFlags::CPU_TO_GPU)
    }

    #[inline]
    pub fn required_memory_flags(&self) -> vk::MemoryPropertyFlags {
        if self.is_host_visible() {
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
        } else {
            vk::MemoryPropertyFlags::empty()
        }
    }

    #[inline]
    pub fn preferred_memory_flags(&self) -> vk::MemoryPropertyFlags {
        vk::MemoryPropertyFlags::DEVICE_LOCAL
    }

    pub fn allocation_create_info(&self) -> vk_mem::AllocationCreateInfo {
        vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferDevice,
            flags: if self.is_host_visible() {
                vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE
            } else {
                vk_mem::AllocationCreateFlags::empty()
            },
            required_flags: self.required_memory_flags(),
            preferred_flags: self.preferred_memory_flags(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImageResourceDefinition {
    pub id: ImageResourceId,
    pub definition: ImageDefinition,
}

#[derive(Debug, Clone, Copy)]
pub struct BufferResourceDefinition {
    pub id: BufferResourceId,
    pub definition: BufferDefinition,
}

pub const SHADOW_MAP_SIZE: u32 = 4096;

/// 相机 uniform：两个 mat4，一个 vec3 加上 padding，对齐到 256
pub const CAMERA_UNIFORM_SIZE: vk::DeviceSize = 256;

/// 渲染管线默认使用的 image
pub const DEFAULT_IMAGE_DEFINITIONS: [ImageResourceDefinition; 8] = [
    ImageResourceDefinition {
        id: ImageResourceId::Swapchain,
        definition: ImageDefinition {
            usage: vk::ImageUsageFlags::from_raw(
                vk::ImageUsageFlags::COLOR_ATTACHMENT.as_raw() | vk::ImageUsageFlags::TRANSFER_DST.as_raw(),
            ),
            size: ImageSize::Framebuffer,
            format: ImageFormat::Framebuffer,
            debug_name: "swapchain",
        },
    },
    ImageResourceDefinition {
        id: ImageResourceId::Rendered,
        definition: ImageDefinition {
            usage: vk::ImageUsageFlags::from_raw(
                vk::ImageUsageFlags::COLOR_ATTACHMENT.as_raw() | vk::ImageUsageFlags::TRANSFER_SRC.as_raw(),
            ),
            size: ImageSize::InternalResolution,
            format: ImageFormat::Fixed(vk::Format::R16G16B16A16_SFLOAT),
            debug_name: "rendered",
        },
    },
    ImageResourceDefinition {
        id: ImageResourceId::GBuffer0,
        definition: ImageDefinition {
            usage: GBUFFER_USAGE,
            size: ImageSize::Framebuffer,
            format: ImageFormat::Fixed(vk::Format::R32G32B32A32_SFLOAT),
            debug_name: "GBuffer0 (RGB: color, A: roughness)",
        },
    },
    ImageResourceDefinition {
        id: ImageResourceId::GBuffer1,
        definition: ImageDefinition {
            usage: GBUFFER_USAGE,
            size: ImageSize::Framebuffer,
            format: ImageFormat::Fixed(vk::Format::R32G32B32A32_SFLOAT),
            debug_name: "GBuffer1 (RGB: normal, A: metallic)",
        },
    },
    ImageResourceDefinition {
        id: ImageResourceId::GBuffer2,
        definition: ImageDefinition {
            usage: GBUFFER_USAGE,
            size: ImageSize::Framebuffer,
            format: ImageFormat::Fixed(vk::Format::R32G32B32A32_SFLOAT),
            debug_name: "GBuffer2 (RGB: view dir)",
        },
    },
    ImageResourceDefinition {
        id: ImageResourceId::GBuffer3,
        definition: ImageDefinition {
            usage: GBUFFER_USAGE,
            size: ImageSize::Framebuffer,
            format: ImageFormat::Fixed(vk::Format::R32G32B32A32_SFLOAT),
            debug_name: "GBuffer3 (RGB: position)",
        },
    },
    ImageResourceDefinition {
        id: ImageResourceId::Depth,
        definition: ImageDefinition {
            usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            size: ImageSize::Framebuffer,
            format: ImageFormat::Fixed(vk::Format::D16_UNORM),
            debug_name: "depth",
        },
    },
    ImageResourceDefinition {
        id: ImageResourceId::ShadowMap,
        definition: ImageDefinition {
            usage: vk::ImageUsageFlags::from_raw(
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT.as_raw() | vk::ImageUsageFlags::SAMPLED.as_raw(),
            ),
            size: ImageSize::Configured {
                name: "shadow_map",
                default_width: SHADOW_MAP_SIZE,
                default_height: SHADOW_MAP_SIZE,
            },
            format: ImageFormat::Fixed(vk::Format::D16_UNORM),
            debug_name: "shadow map",
        },
    },
];

const GBUFFER_USAGE: vk::ImageUsageFlags = vk::ImageUsageFlags::from_raw(
    vk::ImageUsageFlags::COLOR_ATTACHMENT.as_raw() | vk::ImageUsageFlags::STORAGE.as_raw(),
);

/// 渲染管线默认使用的 buffer
pub const DEFAULT_BUFFER_DEFINITIONS: [BufferResourceDefinition; 2] = [
    BufferResourceDefinition {
        id: BufferResourceId::Camera,
        definition: BufferDefinition {
            usage: vk::BufferUsageFlags::UNIFORM_BUFFER,
            size: CAMERA_UNIFORM_SIZE,
            flags: BufferOptionFlags::CPU_TO_GPU,
            debug_name: "camera uniform",
        },
    },
    BufferResourceDefinition {
        id: BufferResourceId::ShadowCamera,
        definition: BufferDefinition {
            usage: vk::BufferUsageFlags::UNIFORM_BUFFER,
            size: CAMERA_UNIFORM_SIZE,
            flags: BufferOptionFlags::CPU_TO_GPU,
            debug_name: "shadow camera uniform",
        },
    },
];

/// 在默认表中查找
pub fn default_image_definition(id: ImageResourceId) -> ImageDefinition {
    DEFAULT_IMAGE_DEFINITIONS
        .iter()
        .find(|def| def.id == id)
        .map(|def| def.definition)
        .unwrap_or_else(|| panic!("image {:?} has no default definition", id))
}

/// 在默认表中查找
pub fn default_buffer_definition(id: BufferResourceId) -> BufferDefinition {
    DEFAULT_BUFFER_DEFINITIONS
        .iter()
        .find(|def| def.id == id)
        .map(|def| def.definition)
        .unwrap_or_else(|| panic!("buffer {:?} has no default definition", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_settings() -> FrameSettings {
        FrameSettings {
            color_format: vk::Format::B8G8R8A8_SRGB,
            depth_format: vk::Format::D16_UNORM,
            frame_extent: vk::Extent2D {
                width: 1280,
                height: 720,
            },
            internal_resolution_scale: 0.5,
        }
    }

    #[test]
    fn test_aspect_mask_from_usage() {
        assert_eq!(default_image_definition(ImageResourceId::GBuffer0).aspect_mask(), vk::ImageAspectFlags::COLOR);
        assert_eq!(default_image_definition(ImageResourceId::Depth).aspect_mask(), vk::ImageAspectFlags::DEPTH);
        assert_eq!(default_image_definition(ImageResourceId::ShadowMap).aspect_mask(), vk::ImageAspectFlags::DEPTH);
        assert_eq!(aspect_mask_of_usage(vk::ImageUsageFlags::SAMPLED), vk::ImageAspectFlags::COLOR);
    }

    #[test]
    #[should_panic(expected = "both color and depth")]
    fn test_color_and_depth_is_illegal() {
        aspect_mask_of_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT);
    }

    #[test]
    fn test_depends_on_swapchain() {
        assert!(default_image_definition(ImageResourceId::Swapchain).depends_on_swapchain());
        assert!(default_image_definition(ImageResourceId::Rendered).depends_on_swapchain());
        assert!(default_image_definition(ImageResourceId::Depth).depends_on_swapchain());
        assert!(!default_image_definition(ImageResourceId::ShadowMap).depends_on_swapchain());

        let fixed_size_framebuffer_format = ImageDefinition {
            usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            size: ImageSize::Fixed { width: 8, height: 8 },
            format: ImageFormat::Framebuffer,
            debug_name: "lut",
        };
        assert!(fixed_size_framebuffer_format.depends_on_swapchain());
    }

    #[test]
    fn test_resolve_extent_and_format() {
        let settings = frame_settings();
        let mut configured = ConfiguredExtents::new();

        let swapchain = default_image_definition(ImageResourceId::Swapchain);
        assert_eq!(swapchain.resolve_extent(&settings, &mut configured), settings.frame_extent);
        assert_eq!(swapchain.resolve_format(&settings), vk::Format::B8G8R8A8_SRGB);

        let rendered = default_image_definition(ImageResourceId::Rendered);
        let extent = rendered.resolve_extent(&settings, &mut configured);
        assert_eq!((extent.width, extent.height), (640, 360));
        assert_eq!(rendered.resolve_format(&settings), vk::Format::R16G16B16A16_SFLOAT);

        configured.set("shadow_map", vk::Extent2D { width: 1024, height: 1024 });
        let shadow = default_image_definition(ImageResourceId::ShadowMap);
        assert_eq!(shadow.resolve_extent(&settings, &mut configured).width, 1024);
    }

    #[test]
    fn test_cpu_to_gpu_memory_flags() {
        let camera = default_buffer_definition(BufferResourceId::Camera);
        assert!(camera.is_host_visible());
        assert!(camera.required_memory_flags().contains(vk::MemoryPropertyFlags::HOST_VISIBLE));
        assert_eq!(camera.preferred_memory_flags(), vk::MemoryPropertyFlags::DEVICE_LOCAL);

        let alloc_info = camera.allocation_create_info();
        assert!(alloc_info.flags.contains(vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE));

        let device_only = BufferDefinition {
            flags: BufferOptionFlags::empty(),
            ..camera
        };
        assert!(device_only.required_memory_flags().is_empty());
    }

    #[test]
    fn test_equal_definitions() {
        let a = default_image_definition(ImageResourceId::GBuffer1);
        let b = ImageDefinition { ..a };
        assert_eq!(a, b);
        assert_ne!(a, default_image_definition(ImageResourceId::GBuffer2));
    }
}
