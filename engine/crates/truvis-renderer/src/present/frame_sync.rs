use ash::vk;

use truvis_gfx::{
    commands::{
        command_buffer::GfxCommandBuffer, command_pool::GfxCommandPool, fence::GfxFence, query_pool::GfxQueryPool,
        semaphore::GfxSemaphore,
    },
    foundation::device::GfxDevice,
    lifetime::lifetime::GfxLifetime,
};
use truvis_render_interface::pipeline_settings::FrameLabel;

/// 每帧在命令开头与结尾各写一个 timestamp
pub const FRAME_TIMESTAMP_TOP: u32 = 0;
pub const FRAME_TIMESTAMP_BOTTOM: u32 = 1;
pub const FRAME_TIMESTAMP_COUNT: u32 = 2;

/// 一个 in-flight 帧所需的同步对象与命令
///
/// 启动时创建，之后每当 frame_id 轮转到这个 slot 时复用，只在退出时销毁
pub struct FrameSlot {
    /// GPU 完成这个 slot 上一次提交的工作后 signal，创建时即处于 signaled 状态
    pub fence: GfxFence,
    /// swapchain image 可用
    pub image_acquired: GfxSemaphore,
    /// 渲染完成，present 等待它
    pub render_done: GfxSemaphore,

    pub command_pool: GfxCommandPool,
    pub command_buffer: GfxCommandBuffer,

    /// queue 不支持 timestamp 时为 None
    pub timestamps: Option<GfxQueryPool>,
    /// 上一次提交是否写入了 timestamp，fence 等待之后才能读取
    pub timestamps_pending: bool,
}

impl FrameSlot {
    pub fn new(
        device: &GfxDevice,
        lifetime: &mut GfxLifetime,
        queue_family_index: u32,
        enable_timestamps: bool,
        label: FrameLabel,
    ) -> Self {
        let fence = GfxFence::new(device, lifetime, true, &format!("frame-{label}-fence"));
        let image_acquired = GfxSemaphore::new(device, lifetime, &format!("frame-{label}-image-acquired"));
        let render_done = GfxSemaphore::new(device, lifetime, &format!("frame-{label}-render-done"));

        let command_pool = GfxCommandPool::new(
            device,
            lifetime,
            queue_family_index,
            vk::CommandPoolCreateFlags::TRANSIENT,
            &format!("frame-{label}-command-pool"),
        );
        let command_buffer = GfxCommandBuffer::new(device, &command_pool, &format!("frame-{label}-cmd"));
        let timestamps = enable_timestamps.then(|| {
            GfxQueryPool::new(
                device,
                lifetime,
                vk::QueryType::TIMESTAMP,
                FRAME_TIMESTAMP_COUNT,
                &format!("frame-{label}-timestamps"),
            )
        });

        Self {
            fence,
            image_acquired,
            render_done,
            command_pool,
            command_buffer,
            timestamps,
            timestamps_pending: false,
        }
    }
}
