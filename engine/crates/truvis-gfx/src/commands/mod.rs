pub mod barrier;
pub mod command_buffer;
pub mod command_pool;
pub mod command_queue;
pub mod fence;
pub mod query_pool;
pub mod semaphore;
pub mod submit_info;
