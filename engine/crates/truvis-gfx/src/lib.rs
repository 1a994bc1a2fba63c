//! Truvis 的 GFX 层，提供 Vulkan 的封装
//!
//! - `foundation`：instance、physical device、device、vma allocator、debug messenger
//! - `lifetime`：作用域化的延迟销毁栈
//! - `commands`：fence、semaphore、command pool/buffer、queue、barrier
//! - `swapchain`：surface 与 swapchain
//!
//! 所有对象都通过参数显式传递，销毁统一通过 `lifetime` 中的删除栈完成。

pub mod commands;
pub mod foundation;
pub mod gfx_core;
pub mod lifetime;
pub mod resources;
pub mod swapchain;
