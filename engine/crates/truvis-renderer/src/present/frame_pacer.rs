use ash::{prelude::VkResult, vk};

use truvis_gfx::{
    commands::{
        command_buffer::GfxCommandBuffer, command_queue::GfxCommandQueue, query_pool::timestamp_delta_ms,
        submit_info::GfxSubmitInfo,
    },
    foundation::{device::GfxDevice, physical_device::GfxPhysicalDevice},
    lifetime::lifetime::GfxLifetime,
    swapchain::render_swapchain::{GfxAcquireResult, GfxPresentResult, GfxRenderSwapchain},
};
use truvis_render_interface::{frame_counter::FrameCounter, pipeline_settings::FrameLabel};

use crate::present::{
    frame_phase::FramePhase,
    frame_sync::{FRAME_TIMESTAMP_BOTTOM, FRAME_TIMESTAMP_COUNT, FRAME_TIMESTAMP_TOP, FrameSlot},
};

/// 等待 image acquired 的 stage
///
/// swapchain image 可能作为 attachment 写入，也可能作为 blit 的目标。
/// swapchain image 的第一个 barrier 以这个 stage 作为 src，与 semaphore 的等待构成依赖链。
pub const SWAPCHAIN_ACQUIRE_WAIT_STAGE: vk::PipelineStageFlags2 = vk::PipelineStageFlags2::from_raw(
    vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT.as_raw() | vk::PipelineStageFlags2::TRANSFER.as_raw(),
);

/// 超时意味着 GPU 已经无法完成工作，视为设备丢失
pub fn check_fence_wait(result: VkResult<()>, timeout_ns: u64) {
    match result {
        Ok(()) => {}
        Err(vk::Result::TIMEOUT) => {
            panic!("device lost: frame fence not signaled within {} ns", timeout_ns)
        }
        Err(e) => panic!("failed to wait frame fence: {:?}", e),
    }
}

/// 控制同时在 GPU 上执行的帧数
///
/// slot 按照 frame_id % FIF_COUNT 轮转。复用一个 slot 之前必须等待它的 fence，
/// 这保证了 frame N 的工作在 frame N + FIF_COUNT 开始之前已经完成。
pub struct FramePacer {
    slots: [FrameSlot; FrameCounter::FIF_COUNT],
    frame_counter: FrameCounter,
    phase: FramePhase,
    timeout_ns: u64,

    timestamp_period_ns: f32,
    timestamp_valid_bits: u32,
}

// new & init
impl FramePacer {
    pub fn new(
        device: &GfxDevice,
        physical_device: &GfxPhysicalDevice,
        lifetime: &mut GfxLifetime,
        timeout_ns: u64,
    ) -> Self {
        let timestamp_valid_bits = physical_device.gfx_queue_timestamp_valid_bits();
        let enable_timestamps = timestamp_valid_bits != 0;
        if !enable_timestamps {
            log::warn!("gfx queue does not support timestamp, gpu frame time is disabled");
        }

        let queue_family_index = physical_device.gfx_queue_family_index();
        let slots = FrameCounter::frame_labes()
            .map(|label| FrameSlot::new(device, lifetime, queue_family_index, enable_timestamps, label));
        Self {
            slots,
            frame_counter: FrameCounter::new(0),
            phase: FramePhase::Idle,
            timeout_ns,
            timestamp_period_ns: physical_device.timestamp_period(),
            timestamp_valid_bits,
        }
    }
}

// getters
impl FramePacer {
    #[inline]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }
    #[inline]
    pub fn frame_counter(&self) -> &FrameCounter {
        &self.frame_counter
    }
    #[inline]
    pub fn frame_label(&self) -> FrameLabel {
        self.frame_counter.frame_label()
    }
    #[inline]
    pub fn timeout_ns(&self) -> u64 {
        self.timeout_ns
    }
    #[inline]
    pub fn current_slot(&self) -> &FrameSlot {
        &self.slots[*self.frame_counter.frame_label()]
    }
    #[inline]
    pub fn command_buffer(&self) -> GfxCommandBuffer {
        self.current_slot().command_buffer
    }
    #[inline]
    fn current_slot_mut(&mut self) -> &mut FrameSlot {
        &mut self.slots[*self.frame_counter.frame_label()]
    }
}

// phase
impl FramePacer {
    /// Idle -> Acquiring：等待当前 slot 上一次提交的工作完成
    ///
    /// fence 在这里不会被 reset，acquire 成功之后才 reset。
    /// 这样 acquire 失败重试时，不会等待一个永远不会 signal 的 fence。
    ///
    /// 返回这个 slot 上一次提交的 GPU 耗时（毫秒），没有可读的 timestamp 时返回 None
    pub fn wait_slot(&mut self, device: &GfxDevice) -> Option<f32> {
        let _span = tracy_client::span!("FramePacer::wait_slot");
        self.phase.transition(FramePhase::Acquiring);
        check_fence_wait(self.current_slot().fence.wait(device, self.timeout_ns), self.timeout_ns);

        let (period_ns, valid_bits) = (self.timestamp_period_ns, self.timestamp_valid_bits);
        let slot = self.current_slot_mut();
        let pool = slot.timestamps.filter(|_| slot.timestamps_pending)?;
        slot.timestamps_pending = false;
        match pool.get_results_u64(device) {
            Ok(ticks) => Some(timestamp_delta_ms(
                ticks[FRAME_TIMESTAMP_TOP as usize],
                ticks[FRAME_TIMESTAMP_BOTTOM as usize],
                period_ns,
                valid_bits,
            )),
            Err(e) => {
                log::warn!("failed to read frame timestamps: {:?}", e);
                None
            }
        }
    }

    /// Acquiring -> Acquiring：得到 out of date 时由调用者重建 swapchain 并再次调用
    pub fn acquire(&mut self, device: &GfxDevice, swapchain: &GfxRenderSwapchain) -> GfxAcquireResult {
        let _span = tracy_client::span!("FramePacer::acquire");
        self.phase.transition(FramePhase::Acquiring);
        swapchain.acquire_next_image(device, &self.current_slot().image_acquired, self.timeout_ns)
    }

    /// Acquiring -> Recording：reset fence 以及 command pool，开始录制
    pub fn begin_recording(&mut self, device: &GfxDevice) -> GfxCommandBuffer {
        self.phase.transition(FramePhase::Recording);
        let frame_name = self.frame_counter.frame_name();
        let slot = self.current_slot();

        slot.fence.reset(device);
        slot.command_pool.reset(device);
        slot.command_buffer.begin(device, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, &frame_name);
        if let Some(pool) = &slot.timestamps {
            slot.command_buffer.reset_query_pool(device, pool, 0, FRAME_TIMESTAMP_COUNT);
            slot.command_buffer
                .write_timestamp(device, vk::PipelineStageFlags2::TOP_OF_PIPE, pool, FRAME_TIMESTAMP_TOP);
        }
        slot.command_buffer
    }

    /// Recording -> Submitted：等待 image acquired，signal render done 以及 fence
    pub fn submit(&mut self, device: &GfxDevice, queue: &GfxCommandQueue) {
        self.phase.transition(FramePhase::Submitted);
        let slot = self.current_slot_mut();

        if let Some(pool) = &slot.timestamps {
            slot.command_buffer
                .write_timestamp(device, vk::PipelineStageFlags2::BOTTOM_OF_PIPE, pool, FRAME_TIMESTAMP_BOTTOM);
            slot.timestamps_pending = true;
        }
        slot.command_buffer.end(device);
        let submit_info = GfxSubmitInfo::new(std::slice::from_ref(&slot.command_buffer))
            .wait(&slot.image_acquired, SWAPCHAIN_ACQUIRE_WAIT_STAGE, None)
            .signal(&slot.render_done, vk::PipelineStageFlags2::ALL_COMMANDS, None);
        queue.submit(device, std::slice::from_ref(&submit_info), Some(slot.fence));
    }

    /// Submitted -> Presenting
    pub fn present(
        &mut self,
        device: &GfxDevice,
        queue: &GfxCommandQueue,
        swapchain: &GfxRenderSwapchain,
        image_index: u32,
    ) -> GfxPresentResult {
        let _span = tracy_client::span!("FramePacer::present");
        self.phase.transition(FramePhase::Presenting);
        swapchain.present_image(device, queue, image_index, std::slice::from_ref(&self.current_slot().render_done))
    }

    /// Presenting -> Idle：轮转到下一个 slot
    pub fn finish_frame(&mut self) {
        self.phase.transition(FramePhase::Idle);
        self.frame_counter.next_frame();
    }
}
