use ash::prelude::VkResult;
use ash::vk;
use itertools::Itertools;

use crate::{
    commands::{command_queue::GfxCommandQueue, semaphore::GfxSemaphore},
    foundation::device::GfxDevice,
    lifetime::{entries::DeviceEntry, lifetime::GfxLifetime},
    resources::create_info::GfxImageViewCreateInfo,
    swapchain::surface::GfxSurface,
};

/// acquire 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GfxAcquireResult {
    /// suboptimal 时依然可以使用这张 image
    Acquired { image_index: u32, suboptimal: bool },
    /// swapchain 需要重建
    OutOfDate,
}

/// present 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GfxPresentResult {
    Presented,
    /// 已经呈现，但是 swapchain 与 surface 不再完全匹配
    Suboptimal,
    OutOfDate,
}

/// swapchain 以及其 image views
///
/// swapchain 与 views 登记在 swapchain 作用域内，重建时先清理作用域再重新创建。
pub struct GfxRenderSwapchain {
    swapchain_handle: vk::SwapchainKHR,

    swapchain_images: Vec<vk::Image>,
    swapchain_image_views: Vec<vk::ImageView>,

    color_format: vk::Format,
    swapchain_extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
}

// new & init
impl GfxRenderSwapchain {
    pub fn new(
        device: &GfxDevice,
        pdevice: vk::PhysicalDevice,
        surface: &GfxSurface,
        present_mode: vk::PresentModeKHR,
        surface_format: vk::SurfaceFormatKHR,
        window_physical_extent: vk::Extent2D,
        lifetime: &mut GfxLifetime,
    ) -> Self {
        let _span = tracy_client::span!("GfxRenderSwapchain::new");

        let surface_capabilities = surface.get_capabilities(pdevice);
        let present_mode = GfxSurface::select_present_mode(&surface.get_present_modes(pdevice), present_mode);
        let surface_format = GfxSurface::select_surface_format(&surface.get_formats(pdevice), surface_format);

        // 确定 window 的 extent 尺寸
        // 如果 surface_capabilities.current_extent 包含特殊值 0xFFFFFFFF，则表示可以自己设置交换链的 extent
        let extent = Self::calculate_swapchain_extent(&surface_capabilities, window_physical_extent);
        log::info!(
            "create swapchain:
            surface current extent: {}x{}, min extent: {}x{}, max extent: {}x{}
            window physical extent: {}x{}
            final swapchain extent: {}x{}, format: {:?}, present mode: {:?}",
            surface_capabilities.current_extent.width,
            surface_capabilities.current_extent.height,
            surface_capabilities.min_image_extent.width,
            surface_capabilities.min_image_extent.height,
            surface_capabilities.max_image_extent.width,
            surface_capabilities.max_image_extent.height,
            window_physical_extent.width,
            window_physical_extent.height,
            extent.width,
            extent.height,
            surface_format.format,
            present_mode,
        );

        let swapchain_handle =
            Self::create_swapchain(device, surface, &surface_capabilities, surface_format, extent, present_mode);
        lifetime.tie_device(DeviceEntry::Swapchain(swapchain_handle));

        let images = match unsafe { device.swapchain().get_swapchain_images(swapchain_handle) } {
            Ok(images) => images,
            Err(e) => panic!("failed to get swapchain images: {:?}", e),
        };

        // view 在 swapchain 之后登记，因此会先于 swapchain 销毁
        let image_views = images
            .iter()
            .enumerate()
            .map(|(idx, image)| {
                device.set_object_debug_name(*image, format!("swapchain-image-{idx}"));
                let view_ci = GfxImageViewCreateInfo::new_image_view_2d_info(
                    *image,
                    surface_format.format,
                    vk::ImageAspectFlags::COLOR,
                );
                let view = match unsafe { device.create_image_view(view_ci.as_info(), None) } {
                    Ok(view) => view,
                    Err(e) => panic!("failed to create swapchain image view: {:?}", e),
                };
                lifetime.tie_device(DeviceEntry::ImageView(view));
                device.set_object_debug_name(view, format!("swapchain-view-{idx}"));
                view
            })
            .collect_vec();

        Self {
            swapchain_handle,
            swapchain_images: images,
            swapchain_image_views: image_views,
            swapchain_extent: extent,
            color_format: surface_format.format,
            present_mode,
        }
    }

    fn create_swapchain(
        device: &GfxDevice,
        surface: &GfxSurface,
        surface_capabilities: &vk::SurfaceCapabilitiesKHR,
        surface_format: vk::SurfaceFormatKHR,
        extent: vk::Extent2D,
        present_mode: vk::PresentModeKHR,
    ) -> vk::SwapchainKHR {
        // 确定 image count
        // max_image_count == 0，表示不限制 image 数量
        let image_count = if surface_capabilities.max_image_count == 0 {
            surface_capabilities.min_image_count + 1
        } else {
            u32::min(surface_capabilities.max_image_count, surface_capabilities.min_image_count + 1)
        };

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.handle())
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            // TRANSFER_DST 用于 blit 到 swapchain，以及 Nsight 分析
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .pre_transform(surface_capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .clipped(true);

        unsafe {
            let swapchain_handle = match device.swapchain().create_swapchain(&create_info, None) {
                Ok(handle) => handle,
                Err(e) => panic!("failed to create swapchain: {:?}", e),
            };
            device.set_object_debug_name(swapchain_handle, "main");

            swapchain_handle
        }
    }
}

// getters
impl GfxRenderSwapchain {
    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain_handle
    }

    #[inline]
    pub fn image(&self, image_index: u32) -> vk::Image {
        self.swapchain_images[image_index as usize]
    }

    #[inline]
    pub fn image_view(&self, image_index: u32) -> vk::ImageView {
        self.swapchain_image_views[image_index as usize]
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.swapchain_images.len()
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain_extent
    }

    #[inline]
    pub fn color_format(&self) -> vk::Format {
        self.color_format
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// swapchain image 的 usage，与创建时保持一致
    #[inline]
    pub fn image_usage() -> vk::ImageUsageFlags {
        vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST
    }
}

// tools
impl GfxRenderSwapchain {
    /// 确定 window 的 extent 尺寸
    ///
    /// 如果 surface_capabilities.current_extent 包含特殊值 0xFFFFFFFF，则表示可以自己设置交换链的 extent
    pub fn calculate_swapchain_extent(
        surface_capabilities: &vk::SurfaceCapabilitiesKHR,
        window_physical_extent: vk::Extent2D,
    ) -> vk::Extent2D {
        let surface_extent = surface_capabilities.current_extent;
        if surface_extent.width == 0xFFFFFFFF || surface_extent.height == 0xFFFFFFFF {
            let width = window_physical_extent
                .width
                .clamp(surface_capabilities.min_image_extent.width, surface_capabilities.max_image_extent.width);
            let height = window_physical_extent
                .height
                .clamp(surface_capabilities.min_image_extent.height, surface_capabilities.max_image_extent.height);
            vk::Extent2D { width, height }
        } else {
            surface_extent
        }
    }

    /// 只有 out of date 可以恢复，超时意味着设备已经丢失
    pub fn classify_acquire(result: VkResult<(u32, bool)>) -> GfxAcquireResult {
        match result {
            Ok((image_index, suboptimal)) => {
                if suboptimal {
                    log::warn!("swapchain acquire image index {} is not optimal", image_index);
                }
                GfxAcquireResult::Acquired {
                    image_index,
                    suboptimal,
                }
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("swapchain is out of date when acquire next image");
                GfxAcquireResult::OutOfDate
            }
            Err(vk::Result::TIMEOUT) | Err(vk::Result::NOT_READY) => {
                panic!("device lost: timeout when acquire next swapchain image")
            }
            Err(e) => panic!("failed to acquire next swapchain image: {:?}", e),
        }
    }

    pub fn classify_present(result: VkResult<bool>) -> GfxPresentResult {
        match result {
            Ok(false) => GfxPresentResult::Presented,
            Ok(true) => {
                log::warn!("swapchain present is not optimal");
                GfxPresentResult::Suboptimal
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("swapchain is out of date when present image");
                GfxPresentResult::OutOfDate
            }
            Err(e) => panic!("failed to present swapchain image: {:?}", e),
        }
    }
}

// update
impl GfxRenderSwapchain {
    /// timeout: nano seconds
    #[inline]
    pub fn acquire_next_image(&self, device: &GfxDevice, semaphore: &GfxSemaphore, timeout: u64) -> GfxAcquireResult {
        let result = unsafe {
            device.swapchain().acquire_next_image(self.swapchain_handle, timeout, semaphore.handle(), vk::Fence::null())
        };
        Self::classify_acquire(result)
    }

    #[inline]
    pub fn present_image(
        &self,
        device: &GfxDevice,
        queue: &GfxCommandQueue,
        image_index: u32,
        wait_semaphores: &[GfxSemaphore],
    ) -> GfxPresentResult {
        let wait_semaphores = wait_semaphores.iter().map(|s| s.handle()).collect_vec();
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .image_indices(&image_indices)
            .swapchains(std::slice::from_ref(&self.swapchain_handle));

        let result = unsafe { device.swapchain().queue_present(queue.handle(), &present_info) };
        Self::classify_present(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(current: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_extent_follows_surface() {
        let extent = GfxRenderSwapchain::calculate_swapchain_extent(
            &capabilities((800, 600)),
            vk::Extent2D {
                width: 1024,
                height: 768,
            },
        );
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn test_extent_clamped_to_window() {
        let extent = GfxRenderSwapchain::calculate_swapchain_extent(
            &capabilities((0xFFFFFFFF, 0xFFFFFFFF)),
            vk::Extent2D {
                width: 8000,
                height: 0,
            },
        );
        assert_eq!((extent.width, extent.height), (4096, 1));
    }

    #[test]
    fn test_classify_acquire() {
        assert_eq!(
            GfxRenderSwapchain::classify_acquire(Ok((2, false))),
            GfxAcquireResult::Acquired {
                image_index: 2,
                suboptimal: false
            }
        );
        assert_eq!(
            GfxRenderSwapchain::classify_acquire(Ok((0, true))),
            GfxAcquireResult::Acquired {
                image_index: 0,
                suboptimal: true
            }
        );
        assert_eq!(
            GfxRenderSwapchain::classify_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)),
            GfxAcquireResult::OutOfDate
        );
    }

    #[test]
    #[should_panic(expected = "device lost")]
    fn test_classify_acquire_timeout_is_fatal() {
        GfxRenderSwapchain::classify_acquire(Err(vk::Result::TIMEOUT));
    }

    #[test]
    #[should_panic(expected = "failed to acquire")]
    fn test_classify_acquire_unknown_error_is_fatal() {
        GfxRenderSwapchain::classify_acquire(Err(vk::Result::ERROR_SURFACE_LOST_KHR));
    }

    #[test]
    fn test_classify_present() {
        assert_eq!(GfxRenderSwapchain::classify_present(Ok(false)), GfxPresentResult::Presented);
        assert_eq!(GfxRenderSwapchain::classify_present(Ok(true)), GfxPresentResult::Suboptimal);
        assert_eq!(
            GfxRenderSwapchain::classify_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)),
            GfxPresentResult::OutOfDate
        );
    }

    #[test]
    #[should_panic(expected = "failed to present")]
    fn test_classify_present_device_lost_is_fatal() {
        GfxRenderSwapchain::classify_present(Err(vk::Result::ERROR_DEVICE_LOST));
    }
}
