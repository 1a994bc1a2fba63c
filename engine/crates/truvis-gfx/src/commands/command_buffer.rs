use std::ffi::CString;

use ash::vk;
use itertools::Itertools;

use crate::{
    commands::{barrier::GfxImageBarrier, command_pool::GfxCommandPool, query_pool::GfxQueryPool},
    foundation::{debug_messenger::DebugType, device::GfxDevice},
};

/// 命令缓冲封装
///
/// command buffer 随 command pool 一起销毁，无需单独登记。
///
/// # 使用示例
/// ```ignore
/// let cmd = GfxCommandBuffer::new(&device, &pool, "frame-A");
/// cmd.begin(&device, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, "frame-A");
/// cmd.image_memory_barrier(&device, &barriers);
/// cmd.end(&device);
/// ```
#[derive(Clone, Copy)]
pub struct GfxCommandBuffer {
    vk_handle: vk::CommandBuffer,
}
// new & init
impl GfxCommandBuffer {
    pub fn new(device: &GfxDevice, command_pool: &GfxCommandPool, debug_name: &str) -> Self {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool.handle())
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffer = match unsafe { device.allocate_command_buffers(&info) } {
            Ok(buffers) => buffers[0],
            Err(e) => panic!("failed to allocate command buffer {}: {:?}", debug_name, e),
        };
        let cmd_buffer = GfxCommandBuffer {
            vk_handle: command_buffer,
        };
        device.set_debug_name(&cmd_buffer, debug_name);
        cmd_buffer
    }
}
// Basic 命令
impl GfxCommandBuffer {
    /// 开始录制 command，自动设置 debug label
    #[inline]
    pub fn begin(&self, device: &GfxDevice, usage_flag: vk::CommandBufferUsageFlags, debug_label_name: &str) {
        unsafe {
            if let Err(e) =
                device.begin_command_buffer(self.vk_handle, &vk::CommandBufferBeginInfo::default().flags(usage_flag))
            {
                panic!("failed to begin command buffer: {:?}", e);
            }
        }
        self.begin_label(device, debug_label_name);
    }

    /// 结束录制 command，结束 debug label
    #[inline]
    pub fn end(&self, device: &GfxDevice) {
        self.end_label(device);
        unsafe {
            if let Err(e) = device.end_command_buffer(self.vk_handle) {
                panic!("failed to end command buffer: {:?}", e);
            }
        }
    }
}
// getters
impl GfxCommandBuffer {
    #[inline]
    pub fn vk_handle(&self) -> vk::CommandBuffer {
        self.vk_handle
    }
}
// 同步命令
impl GfxCommandBuffer {
    /// 空的 barrier 列表不会录制任何命令
    #[inline]
    pub fn image_memory_barrier(&self, device: &GfxDevice, barriers: &[GfxImageBarrier]) {
        if barriers.is_empty() {
            return;
        }
        let barriers = barriers.iter().map(|b| *b.inner()).collect_vec();
        let dependency_info = vk::DependencyInfo::default().image_memory_barriers(&barriers);
        unsafe {
            device.cmd_pipeline_barrier2(self.vk_handle, &dependency_info);
        }
    }
}
// query 命令
impl GfxCommandBuffer {
    /// - command type: action
    /// - supported queue types: graphics, compute, transfer
    #[inline]
    pub fn reset_query_pool(&self, device: &GfxDevice, query_pool: &GfxQueryPool, first_query: u32, query_count: u32) {
        unsafe {
            device.cmd_reset_query_pool(self.vk_handle, query_pool.handle(), first_query, query_count);
        }
    }

    /// - command type: action
    /// - supported queue types: graphics, compute, transfer
    #[inline]
    pub fn write_timestamp(
        &self,
        device: &GfxDevice,
        stage: vk::PipelineStageFlags2,
        query_pool: &GfxQueryPool,
        query: u32,
    ) {
        unsafe {
            device.cmd_write_timestamp2(self.vk_handle, stage, query_pool.handle(), query);
        }
    }
}
// 绘制与传输命令
impl GfxCommandBuffer {
    /// - command type: action, state
    /// - supported queue types: graphics
    #[inline]
    pub fn begin_rendering(&self, device: &GfxDevice, render_info: &vk::RenderingInfo) {
        unsafe {
            device.cmd_begin_rendering(self.vk_handle, render_info);
        }
    }

    /// - command type: action, state
    /// - supported queue types: graphics
    #[inline]
    pub fn end_rendering(&self, device: &GfxDevice) {
        unsafe {
            device.cmd_end_rendering(self.vk_handle);
        }
    }

    /// - command type: action
    /// - supported queue types: graphics
    #[inline]
    pub fn blit_image(&self, device: &GfxDevice, blit_info: &vk::BlitImageInfo2) {
        unsafe {
            device.cmd_blit_image2(self.vk_handle, blit_info);
        }
    }
}
// debug label
impl GfxCommandBuffer {
    #[inline]
    pub fn begin_label(&self, device: &GfxDevice, label_name: &str) {
        let Some(debug_utils) = &device.debug_utils else {
            return;
        };
        let Ok(name) = CString::new(label_name) else {
            return;
        };
        unsafe {
            debug_utils.cmd_begin_debug_utils_label(
                self.vk_handle,
                &vk::DebugUtilsLabelEXT::default().label_name(name.as_c_str()).color([0.8, 0.6, 0.2, 1.0]),
            );
        }
    }

    #[inline]
    pub fn end_label(&self, device: &GfxDevice) {
        if let Some(debug_utils) = &device.debug_utils {
            unsafe {
                debug_utils.cmd_end_debug_utils_label(self.vk_handle);
            }
        }
    }
}
impl DebugType for GfxCommandBuffer {
    fn debug_type_name() -> &'static str {
        "GfxCommandBuffer"
    }

    fn vk_handle(&self) -> impl vk::Handle + Copy {
        self.vk_handle
    }
}
