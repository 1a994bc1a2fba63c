//! Truvis 工具集
//!
//! 在各个 crates 之间共享的通用工具。
//!
//! # 日志
//! `init_log` 安装带颜色与时间戳的 env_logger 后端，`RUST_LOG` 可以覆盖配置中的日志级别。
//!
//! # 配置
//! `toml_config` 从 TOML 文件反序列化任意配置结构体，错误信息带上文件路径。

pub mod init_log;
pub mod toml_config;
