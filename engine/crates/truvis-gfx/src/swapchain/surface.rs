use anyhow::Context;
use ash::vk;

use crate::foundation::{debug_messenger::DebugType, instance::GfxInstance};

/// 窗口 surface，由 instance 作用域负责销毁
pub struct GfxSurface {
    pub(crate) handle: vk::SurfaceKHR,
    pub(crate) pf: ash::khr::surface::Instance,
}

// new & init
impl GfxSurface {
    pub fn new(
        instance: &GfxInstance,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        raw_window_handle: raw_window_handle::RawWindowHandle,
    ) -> anyhow::Result<Self> {
        let handle = unsafe {
            ash_window::create_surface(
                instance.vk_entry(),
                instance.ash_instance(),
                raw_display_handle,
                raw_window_handle,
                None,
            )
        }
        .context("failed to create window surface")?;

        Ok(Self {
            handle,
            pf: instance.surface_pf().clone(),
        })
    }
}

// getters
impl GfxSurface {
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// 实时获取，窗口大小变化之后会改变
    pub fn get_capabilities(&self, pdevice: vk::PhysicalDevice) -> vk::SurfaceCapabilitiesKHR {
        match unsafe { self.pf.get_physical_device_surface_capabilities(pdevice, self.handle) } {
            Ok(capabilities) => capabilities,
            Err(e) => panic!("failed to query surface capabilities: {:?}", e),
        }
    }

    pub fn get_formats(&self, pdevice: vk::PhysicalDevice) -> Vec<vk::SurfaceFormatKHR> {
        match unsafe { self.pf.get_physical_device_surface_formats(pdevice, self.handle) } {
            Ok(formats) => formats,
            Err(e) => panic!("failed to query surface formats: {:?}", e),
        }
    }

    pub fn get_present_modes(&self, pdevice: vk::PhysicalDevice) -> Vec<vk::PresentModeKHR> {
        match unsafe { self.pf.get_physical_device_surface_present_modes(pdevice, self.handle) } {
            Ok(modes) => modes,
            Err(e) => panic!("failed to query surface present modes: {:?}", e),
        }
    }
}

// tools
impl GfxSurface {
    /// 选择 surface format：优先使用期望的 format，其次使用第一个
    ///
    /// 如果 surface 只报告了一个 UNDEFINED，表示任何 format 都可以
    pub fn select_surface_format(
        formats: &[vk::SurfaceFormatKHR],
        preferred: vk::SurfaceFormatKHR,
    ) -> vk::SurfaceFormatKHR {
        match formats {
            [] => preferred,
            [only] if only.format == vk::Format::UNDEFINED => preferred,
            _ => formats
                .iter()
                .find(|f| f.format == preferred.format && f.color_space == preferred.color_space)
                .copied()
                .unwrap_or(formats[0]),
        }
    }

    /// FIFO 是唯一一定会被支持的 present mode，不支持期望的模式时退回 FIFO
    pub fn select_present_mode(modes: &[vk::PresentModeKHR], preferred: vk::PresentModeKHR) -> vk::PresentModeKHR {
        if modes.contains(&preferred) {
            preferred
        } else {
            log::warn!("present mode {:?} is not supported, fallback to FIFO", preferred);
            vk::PresentModeKHR::FIFO
        }
    }
}

impl DebugType for GfxSurface {
    fn debug_type_name() -> &'static str {
        "GfxSurface"
    }
    fn vk_handle(&self) -> impl vk::Handle + Copy {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    #[test]
    fn test_select_preferred_surface_format() {
        let formats = [surface_format(vk::Format::R8G8B8A8_UNORM), surface_format(vk::Format::B8G8R8A8_UNORM)];
        let selected = GfxSurface::select_surface_format(&formats, surface_format(vk::Format::B8G8R8A8_UNORM));
        assert_eq!(selected.format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn test_select_surface_format_fallback() {
        let formats = [surface_format(vk::Format::R8G8B8A8_UNORM)];
        let selected = GfxSurface::select_surface_format(&formats, surface_format(vk::Format::B8G8R8A8_UNORM));
        assert_eq!(selected.format, vk::Format::R8G8B8A8_UNORM);

        let undefined = [surface_format(vk::Format::UNDEFINED)];
        let selected = GfxSurface::select_surface_format(&undefined, surface_format(vk::Format::B8G8R8A8_UNORM));
        assert_eq!(selected.format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn test_select_present_mode() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(GfxSurface::select_present_mode(&modes, vk::PresentModeKHR::MAILBOX), vk::PresentModeKHR::MAILBOX);
        assert_eq!(GfxSurface::select_present_mode(&modes, vk::PresentModeKHR::IMMEDIATE), vk::PresentModeKHR::FIFO);
    }
}
