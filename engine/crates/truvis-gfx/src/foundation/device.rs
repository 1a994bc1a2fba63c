use std::ffi::CString;
use std::ops::Deref;

use anyhow::Context;
use ash::vk;

use crate::{
    foundation::{debug_messenger::DebugType, instance::GfxInstance, physical_device::GfxPhysicalDevice},
    lifetime::{deletion_stack::GfxDestroyer, entries::DeviceEntry},
};

/// Vulkan 逻辑设备封装
///
/// 包含核心设备 API 以及 swapchain、debug utils 扩展的函数指针。
/// 这些函数指针在应用生命周期中保持不变。
///
/// device 本身由 instance 作用域的删除栈负责销毁，这里只负责销毁 device 作用域的对象。
pub struct GfxDevice {
    /// 核心 Vulkan 设备 API
    pub(crate) device: ash::Device,
    /// 交换链扩展 API
    pub(crate) swapchain: ash::khr::swapchain::Device,
    /// 调试工具扩展 API，只有开启 validation 时才有
    pub(crate) debug_utils: Option<ash::ext::debug_utils::Device>,

    gfx_queue: vk::Queue,
    gfx_queue_family_index: u32,
}

// 构造
impl GfxDevice {
    pub fn new(instance: &GfxInstance, physical_device: &GfxPhysicalDevice) -> anyhow::Result<Self> {
        let _span = tracy_client::span!("GfxDevice::new");

        let queue_family_index = physical_device.gfx_queue_family_index();
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family_index)
            .queue_priorities(&[1.0])];

        // 帧同步使用 synchronization2，绘制使用 dynamic rendering
        let mut features13 = vk::PhysicalDeviceVulkan13Features::default().synchronization2(true).dynamic_rendering(true);
        let mut all_features = vk::PhysicalDeviceFeatures2::default().push_next(&mut features13);

        let device_exts = [ash::khr::swapchain::NAME.as_ptr()];
        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_exts)
            .push_next(&mut all_features);

        let ash_instance = instance.ash_instance();
        let device = unsafe { ash_instance.create_device(physical_device.vk_handle(), &device_create_info, None) }
            .context("failed to create logical device")?;

        let swapchain = ash::khr::swapchain::Device::new(ash_instance, &device);
        let debug_utils = instance.debug_utils_pf().map(|_| ash::ext::debug_utils::Device::new(ash_instance, &device));
        let gfx_queue = unsafe { device.get_device_queue(queue_family_index, 0) };

        log::info!("create device on {:?}, gfx queue family: {}", physical_device.name(), queue_family_index);

        Ok(Self {
            device,
            swapchain,
            debug_utils,
            gfx_queue,
            gfx_queue_family_index: queue_family_index,
        })
    }
}

// getters
impl GfxDevice {
    #[inline]
    pub fn vk_handle(&self) -> vk::Device {
        self.device.handle()
    }
    #[inline]
    pub fn ash_device(&self) -> &ash::Device {
        &self.device
    }
    #[inline]
    pub fn swapchain(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain
    }
    #[inline]
    pub fn gfx_queue(&self) -> vk::Queue {
        self.gfx_queue
    }
    #[inline]
    pub fn gfx_queue_family_index(&self) -> u32 {
        self.gfx_queue_family_index
    }
}

// tools
impl GfxDevice {
    /// 未开启 validation 时什么也不做
    pub fn set_object_debug_name<T: vk::Handle + Copy>(&self, handle: T, name: impl AsRef<str>) {
        let Some(debug_utils) = &self.debug_utils else {
            return;
        };
        let Ok(name) = CString::new(name.as_ref()) else {
            log::warn!("debug name contains nul: {}", name.as_ref());
            return;
        };
        let result = unsafe {
            debug_utils.set_debug_utils_object_name(
                &vk::DebugUtilsObjectNameInfoEXT::default().object_name(name.as_c_str()).object_handle(handle),
            )
        };
        if let Err(e) = result {
            log::warn!("failed to set debug name {:?}: {:?}", name, e);
        }
    }

    #[inline]
    pub fn set_debug_name<T: DebugType>(&self, handle: &T, name: impl AsRef<str>) {
        self.set_object_debug_name(handle.vk_handle(), format!("{}::{}", T::debug_type_name(), name.as_ref()));
    }

    /// 设备丢失等错误无法恢复
    #[inline]
    pub fn wait_idle(&self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                panic!("failed to wait device idle: {:?}", e);
            }
        }
    }
}

impl GfxDestroyer<DeviceEntry> for GfxDevice {
    fn destroy_entry(&self, entry: DeviceEntry) {
        unsafe {
            match entry {
                DeviceEntry::CommandPool(pool) => self.device.destroy_command_pool(pool, None),
                DeviceEntry::ImageView(view) => self.device.destroy_image_view(view, None),
                DeviceEntry::Swapchain(swapchain) => self.swapchain.destroy_swapchain(swapchain, None),
                DeviceEntry::Fence(fence) => self.device.destroy_fence(fence, None),
                DeviceEntry::Semaphore(semaphore) => self.device.destroy_semaphore(semaphore, None),
                DeviceEntry::QueryPool(pool) => self.device.destroy_query_pool(pool, None),
            }
        }
    }
}

impl Deref for GfxDevice {
    type Target = ash::Device;
    fn deref(&self) -> &Self::Target {
        &self.device
    }
}
impl DebugType for GfxDevice {
    fn debug_type_name() -> &'static str {
        "GfxDevice"
    }
    fn vk_handle(&self) -> impl vk::Handle + Copy {
        self.device.handle()
    }
}
