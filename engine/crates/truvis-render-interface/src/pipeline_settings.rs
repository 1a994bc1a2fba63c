use std::collections::HashMap;
use std::{fmt::Display, ops::Deref};

use ash::vk;

/// 渲染器默认配置
pub struct DefaultRendererSettings;
impl DefaultRendererSettings {
    pub const DEFAULT_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        // shader 输出会被自动改变： liner -> sRGB
        format: vk::Format::B8G8R8A8_SRGB,
        // 通知 OS，将数值按照 sRGB 空间进行处理和显示
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    pub const DEFAULT_PRESENT_MODE: vk::PresentModeKHR = vk::PresentModeKHR::FIFO;
    pub const DEFAULT_DEPTH_FORMAT: vk::Format = vk::Format::D16_UNORM;
    /// 等待 fence 以及 acquire image 的超时时间，超时视为设备丢失
    pub const DEFAULT_FRAME_TIMEOUT_NS: u64 = 1_000_000_000;
    pub const DEFAULT_INTERNAL_RESOLUTION_SCALE: f32 = 0.5;
}

/// 帧级渲染配置，随 swapchain 重建而更新
#[derive(Copy, Clone, Debug)]
pub struct FrameSettings {
    pub color_format: vk::Format,
    pub depth_format: vk::Format,
    pub frame_extent: vk::Extent2D,
    /// InternalResolution 尺寸相对于 frame_extent 的缩放
    pub internal_resolution_scale: f32,
}
impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            color_format: DefaultRendererSettings::DEFAULT_SURFACE_FORMAT.format,
            depth_format: DefaultRendererSettings::DEFAULT_DEPTH_FORMAT,
            frame_extent: vk::Extent2D::default(),
            internal_resolution_scale: DefaultRendererSettings::DEFAULT_INTERNAL_RESOLUTION_SCALE,
        }
    }
}
impl FrameSettings {
    /// 内部渲染分辨率，每个维度至少为 1
    #[inline]
    pub fn internal_extent(&self) -> vk::Extent2D {
        let scale = |v: u32| ((v as f32 * self.internal_resolution_scale) as u32).max(1);
        vk::Extent2D {
            width: scale(self.frame_extent.width),
            height: scale(self.frame_extent.height),
        }
    }
}

/// 具名的可配置尺寸
///
/// 由配置文件初始化，通过引用传递给资源构建过程。
/// 查询一个不存在的名字时，记录并返回默认值。
#[derive(Default, Debug, Clone)]
pub struct ConfiguredExtents {
    extents: HashMap<String, vk::Extent2D>,
}
impl ConfiguredExtents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I: IntoIterator<Item = (String, [u32; 2])>>(pairs: I) -> Self {
        Self {
            extents: pairs
                .into_iter()
                .map(|(name, [width, height])| (name, vk::Extent2D { width, height }))
                .collect(),
        }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<vk::Extent2D> {
        self.extents.get(name).copied()
    }

    #[inline]
    pub fn set(&mut self, name: impl Into<String>, extent: vk::Extent2D) {
        self.extents.insert(name.into(), extent);
    }

    pub fn resolve(&mut self, name: &str, default: vk::Extent2D) -> vk::Extent2D {
        *self.extents.entry(name.to_string()).or_insert_with(|| {
            log::debug!("configured extent <{}> not set, use default {}x{}", name, default.width, default.height);
            default
        })
    }
}

/// 帧标签（A/B）
///
/// 表示当前处于 Frames in Flight 的哪一帧。
/// 通过 `Deref` 转换为索引 0/1。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLabel {
    A,
    B,
}
impl Deref for FrameLabel {
    type Target = usize;
    #[inline]
    fn deref(&self) -> &Self::Target {
        match self {
            Self::A => &Self::INDEX[0],
            Self::B => &Self::INDEX[1],
        }
    }
}
impl Display for FrameLabel {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}
impl FrameLabel {
    const INDEX: [usize; 2] = [0, 1];

    #[inline]
    pub fn from_usize(idx: usize) -> Self {
        match idx {
            0 => Self::A,
            1 => Self::B,
            _ => panic!("Invalid frame index: {idx}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_extent() {
        let settings = FrameSettings {
            frame_extent: vk::Extent2D {
                width: 1920,
                height: 1,
            },
            internal_resolution_scale: 0.5,
            ..Default::default()
        };
        let extent = settings.internal_extent();
        assert_eq!((extent.width, extent.height), (960, 1));
    }

    #[test]
    fn test_configured_extent_records_default() {
        let mut extents = ConfiguredExtents::from_pairs([("bloom".to_string(), [256, 128])]);
        assert_eq!(extents.resolve("bloom", vk::Extent2D { width: 1, height: 1 }).width, 256);

        let default = vk::Extent2D {
            width: 4096,
            height: 4096,
        };
        assert!(extents.get("shadow_map").is_none());
        assert_eq!(extents.resolve("shadow_map", default), default);
        assert_eq!(extents.get("shadow_map"), Some(default));
    }

    #[test]
    fn test_frame_label() {
        assert_eq!(*FrameLabel::from_usize(1), 1);
        assert_eq!(FrameLabel::A.to_string(), "A");
    }

    #[test]
    #[should_panic(expected = "Invalid frame index")]
    fn test_invalid_frame_label() {
        FrameLabel::from_usize(2);
    }
}
