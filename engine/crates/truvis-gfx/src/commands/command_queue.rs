use ash::vk;
use itertools::Itertools;

use crate::{
    commands::{fence::GfxFence, submit_info::GfxSubmitInfo},
    foundation::{debug_messenger::DebugType, device::GfxDevice},
};

/// 图形队列，同时用于 present
#[derive(Clone, Copy)]
pub struct GfxCommandQueue {
    vk_queue: vk::Queue,
    queue_family_index: u32,
}

// new & init
impl GfxCommandQueue {
    pub fn new_gfx_queue(device: &GfxDevice) -> Self {
        let queue = Self {
            vk_queue: device.gfx_queue(),
            queue_family_index: device.gfx_queue_family_index(),
        };
        device.set_debug_name(&queue, "gfx");
        queue
    }
}

// getters
impl GfxCommandQueue {
    #[inline]
    pub fn handle(&self) -> vk::Queue {
        self.vk_queue
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }
}

// tools
impl GfxCommandQueue {
    /// 提交失败意味着设备丢失或者内存耗尽，无法恢复
    pub fn submit(&self, device: &GfxDevice, batches: &[GfxSubmitInfo], fence: Option<GfxFence>) {
        let _span = tracy_client::span!("GfxCommandQueue::submit");
        let batches = batches.iter().map(|b| b.submit_info()).collect_vec();
        unsafe {
            if let Err(e) =
                device.queue_submit2(self.vk_queue, &batches, fence.map_or(vk::Fence::null(), |f| f.handle()))
            {
                panic!("failed to submit to queue: {:?}", e);
            }
        }
    }
}

impl DebugType for GfxCommandQueue {
    fn debug_type_name() -> &'static str {
        "GfxCommandQueue"
    }

    fn vk_handle(&self) -> impl vk::Handle + Copy {
        self.vk_queue
    }
}
