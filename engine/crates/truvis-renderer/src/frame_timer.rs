use std::time::{Duration, Instant};

/// 每个 renderer 自己持有的 CPU 计时
///
/// 记录帧间隔，以及两个阻塞点（fence 等待与 image acquire）的耗时。
/// GPU 耗时来自 timestamp query，比 CPU 时间晚 FIF_COUNT 帧
#[derive(Debug)]
pub struct FrameTimer {
    start_time: Instant,
    last_tick: Instant,

    delta_time: Duration,
    total_time: Duration,
    total_frame: u64,

    fence_wait: Duration,
    acquire: Duration,

    /// 毫秒，None 表示还没有可读的 timestamp
    gpu_time_ms: Option<f32>,
}

impl Default for FrameTimer {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_tick: now,
            delta_time: Duration::ZERO,
            total_time: Duration::ZERO,
            total_frame: 0,
            fence_wait: Duration::ZERO,
            acquire: Duration::ZERO,
            gpu_time_ms: None,
        }
    }
}

// update
impl FrameTimer {
    /// 每帧开始的时候调用
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_tick);
        self.last_tick = now;
        self.total_time = now.duration_since(self.start_time);
        self.total_frame += 1;
    }

    #[inline]
    pub fn record_fence_wait(&mut self, duration: Duration) {
        self.fence_wait = duration;
    }

    #[inline]
    pub fn record_acquire(&mut self, duration: Duration) {
        self.acquire = duration;
    }

    /// 没有读到新的 timestamp 时保留上一次的值
    #[inline]
    pub fn record_gpu_time(&mut self, gpu_time_ms: Option<f32>) {
        if gpu_time_ms.is_some() {
            self.gpu_time_ms = gpu_time_ms;
        }
    }
}

// getters
impl FrameTimer {
    #[inline]
    pub fn delta_time(&self) -> Duration {
        self.delta_time
    }

    /// 上一帧的时间（毫秒）
    #[inline]
    pub fn delta_time_ms(&self) -> f32 {
        self.delta_time.as_secs_f32() * 1000.0
    }

    #[inline]
    pub fn total_time_s(&self) -> f32 {
        self.total_time.as_secs_f32()
    }

    #[inline]
    pub fn total_frame(&self) -> u64 {
        self.total_frame
    }

    #[inline]
    pub fn fence_wait(&self) -> Duration {
        self.fence_wait
    }

    #[inline]
    pub fn acquire(&self) -> Duration {
        self.acquire
    }

    #[inline]
    pub fn gpu_time_ms(&self) -> Option<f32> {
        self.gpu_time_ms
    }
}
