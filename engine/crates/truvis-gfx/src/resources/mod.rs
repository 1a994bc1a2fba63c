pub mod create_info;
