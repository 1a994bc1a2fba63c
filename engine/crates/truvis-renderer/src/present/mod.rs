pub mod frame_pacer;
pub mod frame_phase;
pub mod frame_sync;
pub mod render_present;
