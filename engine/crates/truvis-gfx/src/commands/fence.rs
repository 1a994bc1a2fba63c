use ash::prelude::VkResult;
use ash::vk;

use crate::{
    foundation::{debug_messenger::DebugType, device::GfxDevice},
    lifetime::{entries::DeviceEntry, lifetime::GfxLifetime},
};

/// # Destroy
/// 创建时登记到某个作用域，由作用域负责销毁，因此可以随意 Copy
#[derive(Clone, Copy)]
pub struct GfxFence {
    fence: vk::Fence,
}

impl DebugType for GfxFence {
    fn debug_type_name() -> &'static str {
        "GfxFence"
    }

    fn vk_handle(&self) -> impl vk::Handle + Copy {
        self.fence
    }
}

// 创建
impl GfxFence {
    /// # param
    /// * signaled - 是否创建时就 signaled
    pub fn new(device: &GfxDevice, lifetime: &mut GfxLifetime, signaled: bool, debug_name: &str) -> Self {
        let fence_flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        let fence = match unsafe { device.create_fence(&vk::FenceCreateInfo::default().flags(fence_flags), None) } {
            Ok(fence) => fence,
            Err(e) => panic!("failed to create fence {}: {:?}", debug_name, e),
        };
        lifetime.tie_device(DeviceEntry::Fence(fence));

        let fence = Self { fence };
        device.set_debug_name(&fence, debug_name);
        fence
    }
}

// getters
impl GfxFence {
    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

// tools
impl GfxFence {
    /// 阻塞等待 fence，超时返回 `Err(vk::Result::TIMEOUT)`
    ///
    /// timeout: nano seconds
    #[inline]
    pub fn wait(&self, device: &GfxDevice, timeout: u64) -> VkResult<()> {
        unsafe { device.wait_for_fences(std::slice::from_ref(&self.fence), true, timeout) }
    }

    #[inline]
    pub fn reset(&self, device: &GfxDevice) {
        unsafe {
            if let Err(e) = device.reset_fences(std::slice::from_ref(&self.fence)) {
                panic!("failed to reset fence: {:?}", e);
            }
        }
    }
}
