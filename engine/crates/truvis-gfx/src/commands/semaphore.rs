use ash::vk;

use crate::{
    foundation::{debug_messenger::DebugType, device::GfxDevice},
    lifetime::{entries::DeviceEntry, lifetime::GfxLifetime},
};

/// # Destroy
/// 创建时登记到某个作用域，由作用域负责销毁
#[derive(Clone, Copy)]
pub struct GfxSemaphore {
    semaphore: vk::Semaphore,
}

// 创建
impl GfxSemaphore {
    pub fn new(device: &GfxDevice, lifetime: &mut GfxLifetime, debug_name: &str) -> Self {
        let semaphore = match unsafe { device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) } {
            Ok(semaphore) => semaphore,
            Err(e) => panic!("failed to create semaphore {}: {:?}", debug_name, e),
        };
        lifetime.tie_device(DeviceEntry::Semaphore(semaphore));

        let semaphore = Self { semaphore };
        device.set_debug_name(&semaphore, debug_name);
        semaphore
    }
}

// getters
impl GfxSemaphore {
    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

#[cfg(test)]
impl GfxSemaphore {
    /// 测试中无法创建真正的 semaphore
    pub(crate) fn from_raw_handle(semaphore: vk::Semaphore) -> Self {
        Self { semaphore }
    }
}

impl DebugType for GfxSemaphore {
    fn debug_type_name() -> &'static str {
        "GfxSemaphore"
    }

    fn vk_handle(&self) -> impl vk::Handle + Copy {
        self.semaphore
    }
}
