pub mod app;
pub mod demo_pass;
pub mod window;
