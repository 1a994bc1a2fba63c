//! 渲染器与 GPU 资源之间的边界
//!
//! 资源的声明（definition）、物理记录（record）、复用方式（scope）、
//! 每帧的资源视图（FrameResourceTable）以及 image 的同步状态机。

pub mod buffer_resource;
pub mod frame_counter;
pub mod frame_resource_table;
pub mod gfx_resource_manager;
pub mod handles;
pub mod image_resource;
pub mod image_state;
pub mod pipeline_settings;
pub mod resource_builder;
pub mod resource_definition;
pub mod resource_pool;
