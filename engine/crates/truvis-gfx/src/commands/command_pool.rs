use ash::vk;

use crate::{
    foundation::{debug_messenger::DebugType, device::GfxDevice},
    lifetime::{entries::DeviceEntry, lifetime::GfxLifetime},
};

/// 每个 frame slot 拥有一个 command pool，每帧整体 reset
#[derive(Clone, Copy)]
pub struct GfxCommandPool {
    handle: vk::CommandPool,
    queue_family_index: u32,
}

// new & init
impl GfxCommandPool {
    pub fn new(
        device: &GfxDevice,
        lifetime: &mut GfxLifetime,
        queue_family_index: u32,
        flags: vk::CommandPoolCreateFlags,
        debug_name: &str,
    ) -> Self {
        let create_info = vk::CommandPoolCreateInfo::default().queue_family_index(queue_family_index).flags(flags);
        let handle = match unsafe { device.create_command_pool(&create_info, None) } {
            Ok(pool) => pool,
            Err(e) => panic!("failed to create command pool {}: {:?}", debug_name, e),
        };
        lifetime.tie_device(DeviceEntry::CommandPool(handle));

        let pool = Self {
            handle,
            queue_family_index,
        };
        device.set_debug_name(&pool, debug_name);
        pool
    }
}

// getters
impl GfxCommandPool {
    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.handle
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }
}

// tools
impl GfxCommandPool {
    /// 回收 pool 中所有 command buffer 的内存，command buffer 回到 initial 状态
    #[inline]
    pub fn reset(&self, device: &GfxDevice) {
        unsafe {
            if let Err(e) = device.reset_command_pool(self.handle, vk::CommandPoolResetFlags::empty()) {
                panic!("failed to reset command pool: {:?}", e);
            }
        }
    }
}

impl DebugType for GfxCommandPool {
    fn debug_type_name() -> &'static str {
        "GfxCommandPool"
    }

    fn vk_handle(&self) -> impl vk::Handle + Copy {
        self.handle
    }
}
