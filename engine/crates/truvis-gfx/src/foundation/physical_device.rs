use std::ffi::CStr;

use anyhow::Context;
use ash::vk;
use itertools::Itertools;

use crate::foundation::{debug_messenger::DebugType, instance::GfxInstance};

/// 表示一张物理显卡
pub struct GfxPhysicalDevice {
    pub(crate) vk_handle: vk::PhysicalDevice,

    /// 当前 gpu 的基础属性
    pub(crate) basic_props: vk::PhysicalDeviceProperties,

    /// 同时支持 graphics, compute, transfer 以及 present 的 queue family
    pub(crate) gfx_queue_family_index: u32,
    /// 为 0 时这个 queue family 不支持 timestamp query
    pub(crate) gfx_queue_timestamp_valid_bits: u32,
}

impl GfxPhysicalDevice {
    /// 选择一张可以向 surface 呈现的显卡
    ///
    /// 优先选择独立显卡，如果没有则选择第一个可用的显卡
    pub fn new_descrete_physical_device(instance: &GfxInstance, surface: vk::SurfaceKHR) -> anyhow::Result<Self> {
        let pdevices = unsafe { instance.ash_instance().enumerate_physical_devices() }
            .context("failed to enumerate physical devices")?;

        pdevices
            .iter()
            .filter_map(|pdevice| Self::new(*pdevice, instance, surface))
            // 优先使用独立显卡
            .find_or_first(GfxPhysicalDevice::is_descrete_gpu)
            .context("no physical device supports graphics + present for this surface")
    }

    /// 不满足条件的显卡返回 None
    fn new(pdevice: vk::PhysicalDevice, instance: &GfxInstance, surface: vk::SurfaceKHR) -> Option<Self> {
        let ash_instance = instance.ash_instance();
        let basic_props = unsafe { ash_instance.get_physical_device_properties(pdevice) };
        let device_name = basic_props.device_name_as_c_str().unwrap_or(c"unknown");
        log::info!("found gpu: {:?}", device_name);

        if basic_props.api_version < vk::API_VERSION_1_3 {
            log::info!("skip gpu {:?}: vulkan 1.3 is required", device_name);
            return None;
        }

        // 必须支持 swapchain
        let device_extensions = unsafe { ash_instance.enumerate_device_extension_properties(pdevice) }.ok()?;
        let support_swapchain = device_extensions
            .iter()
            .any(|ext| ext.extension_name_as_c_str() == Ok(ash::khr::swapchain::NAME));
        if !support_swapchain {
            log::info!("skip gpu {:?}: swapchain extension is missing", device_name);
            return None;
        }

        // 全能的 Queue：graphics, compute, transfer，并且可以 present
        let queue_family_props = unsafe { ash_instance.get_physical_device_queue_family_properties(pdevice) };
        log::debug!("physical device: queue family props:\n{:#?}", queue_family_props);
        let gfx_flags = vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER;
        let gfx_queue_family_index = queue_family_props.iter().enumerate().find_map(|(family_idx, props)| {
            let family_idx = family_idx as u32;
            let support_present = unsafe {
                instance.surface_pf().get_physical_device_surface_support(pdevice, family_idx, surface)
            }
            .unwrap_or(false);
            (props.queue_flags.contains(gfx_flags) && support_present).then_some(family_idx)
        });
        let Some(gfx_queue_family_index) = gfx_queue_family_index else {
            log::info!("skip gpu {:?}: no queue family supports graphics + present", device_name);
            return None;
        };

        Some(Self {
            vk_handle: pdevice,
            basic_props,
            gfx_queue_family_index,
            gfx_queue_timestamp_valid_bits: queue_family_props[gfx_queue_family_index as usize].timestamp_valid_bits,
        })
    }

    #[inline]
    /// 当前 gpu 是否是独立显卡
    pub fn is_descrete_gpu(&self) -> bool {
        self.basic_props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
    }
}

// getters
impl GfxPhysicalDevice {
    #[inline]
    pub fn vk_handle(&self) -> vk::PhysicalDevice {
        self.vk_handle
    }

    #[inline]
    pub fn gfx_queue_family_index(&self) -> u32 {
        self.gfx_queue_family_index
    }

    #[inline]
    pub fn gfx_queue_timestamp_valid_bits(&self) -> u32 {
        self.gfx_queue_timestamp_valid_bits
    }

    /// 一个 timestamp tick 对应的纳秒数
    #[inline]
    pub fn timestamp_period(&self) -> f32 {
        self.basic_props.limits.timestamp_period
    }

    #[inline]
    pub fn name(&self) -> &CStr {
        self.basic_props.device_name_as_c_str().unwrap_or(c"unknown")
    }
}

impl DebugType for GfxPhysicalDevice {
    fn debug_type_name() -> &'static str {
        "GfxPhysicalDevice"
    }

    fn vk_handle(&self) -> impl vk::Handle + Copy {
        self.vk_handle
    }
}
