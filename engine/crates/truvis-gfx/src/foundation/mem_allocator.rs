use std::ops::Deref;

use anyhow::Context;
use ash::vk;

use crate::{
    foundation::{device::GfxDevice, instance::GfxInstance, physical_device::GfxPhysicalDevice},
    lifetime::{deletion_stack::GfxDestroyer, entries::AllocatorEntry},
};

/// vma 的封装
///
/// vma 需要引用 Instance 以及 Device，因此需要在 device 创建之后再创建，
/// 并且在 device 销毁之前销毁。vk_mem::Allocator 在 drop 时销毁自身。
pub struct GfxMemAllocator {
    inner: vk_mem::Allocator,
}

impl GfxMemAllocator {
    pub fn new(
        instance: &GfxInstance,
        physical_device: &GfxPhysicalDevice,
        device: &GfxDevice,
    ) -> anyhow::Result<Self> {
        let mut vma_ci =
            vk_mem::AllocatorCreateInfo::new(instance.ash_instance(), device.ash_device(), physical_device.vk_handle());
        vma_ci.vulkan_api_version = vk::API_VERSION_1_3;

        let vma = unsafe { vk_mem::Allocator::new(vma_ci) }.context("failed to create vma allocator")?;

        Ok(Self { inner: vma })
    }

    /// allocator 作用域内的对象必须已经全部销毁
    pub fn destroy(self) {
        log::info!("destroying GfxMemAllocator");
        // 通过 drop 触发销毁
    }
}

impl GfxDestroyer<AllocatorEntry> for GfxMemAllocator {
    fn destroy_entry(&self, entry: AllocatorEntry) {
        unsafe {
            match entry {
                AllocatorEntry::Image { image, mut allocation } => self.inner.destroy_image(image, &mut allocation),
                AllocatorEntry::Buffer {
                    buffer,
                    mut allocation,
                    mapped,
                } => {
                    if mapped {
                        self.inner.unmap_memory(&mut allocation);
                    }
                    self.inner.destroy_buffer(buffer, &mut allocation);
                }
            }
        }
    }
}

impl Deref for GfxMemAllocator {
    type Target = vk_mem::Allocator;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
