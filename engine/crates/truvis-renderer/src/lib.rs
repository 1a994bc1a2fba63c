//! 帧节奏与 swapchain
//!
//! `Renderer` 将设备、swapchain、帧同步与资源管理器组织在一起，
//! 外部通过 `begin_frame` / `end_frame` 驱动每一帧。

pub mod frame_timer;
pub mod present;
pub mod render_config;
pub mod renderer;
