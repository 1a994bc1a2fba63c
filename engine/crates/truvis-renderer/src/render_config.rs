use std::{collections::HashMap, path::Path};

use ash::vk;
use serde::Deserialize;

use truvis_render_interface::pipeline_settings::{ConfiguredExtents, DefaultRendererSettings};

/// 配置文件中的 present mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeConfig {
    Fifo,
    FifoRelaxed,
    Mailbox,
    Immediate,
}

impl PresentModeConfig {
    #[inline]
    pub fn to_vk(self) -> vk::PresentModeKHR {
        match self {
            Self::Fifo => vk::PresentModeKHR::FIFO,
            Self::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
            Self::Mailbox => vk::PresentModeKHR::MAILBOX,
            Self::Immediate => vk::PresentModeKHR::IMMEDIATE,
        }
    }
}

/// 渲染器的启动配置
///
/// 所有字段都有默认值，空文件也是合法的配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub present_mode: PresentModeConfig,
    /// 等待 fence 以及 acquire image 的超时，超时视为设备丢失
    pub frame_timeout_ns: u64,
    pub internal_resolution_scale: f32,
    pub enable_validation: bool,
    pub log_level: String,
    /// name = [width, height]
    pub configured_extents: HashMap<String, [u32; 2]>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            present_mode: PresentModeConfig::Fifo,
            frame_timeout_ns: DefaultRendererSettings::DEFAULT_FRAME_TIMEOUT_NS,
            internal_resolution_scale: DefaultRendererSettings::DEFAULT_INTERNAL_RESOLUTION_SCALE,
            enable_validation: cfg!(debug_assertions),
            log_level: "info".to_string(),
            configured_extents: HashMap::new(),
        }
    }
}

impl RendererConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config: Self = truvis_crate_tools::toml_config::load_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = truvis_crate_tools::toml_config::parse_toml(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.frame_timeout_ns > 0, "frame_timeout_ns must be positive");
        anyhow::ensure!(
            self.internal_resolution_scale > 0.0 && self.internal_resolution_scale <= 4.0,
            "internal_resolution_scale {} out of range (0, 4]",
            self.internal_resolution_scale
        );
        for (name, [width, height]) in &self.configured_extents {
            anyhow::ensure!(*width > 0 && *height > 0, "configured extent <{}> must not be empty", name);
        }
        Ok(())
    }

    #[inline]
    pub fn configured_extents(&self) -> ConfiguredExtents {
        ConfiguredExtents::from_pairs(self.configured_extents.iter().map(|(name, extent)| (name.clone(), *extent)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RendererConfig::from_toml_str("").unwrap();
        assert_eq!(config.present_mode, PresentModeConfig::Fifo);
        assert_eq!(config.frame_timeout_ns, 1_000_000_000);
        assert_eq!(config.internal_resolution_scale, 0.5);
        assert_eq!(config.log_level, "info");
        assert!(config.configured_extents.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config = RendererConfig::from_toml_str(
            r#"
            present_mode = "mailbox"
            frame_timeout_ns = 500
            internal_resolution_scale = 1.0
            enable_validation = false
            log_level = "debug"

            [configured_extents]
            shadow_map = [2048, 1024]
            "#,
        )
        .unwrap();
        assert_eq!(config.present_mode.to_vk(), vk::PresentModeKHR::MAILBOX);
        assert_eq!(config.frame_timeout_ns, 500);
        assert!(!config.enable_validation);

        let extents = config.configured_extents();
        assert_eq!(
            extents.get("shadow_map"),
            Some(vk::Extent2D {
                width: 2048,
                height: 1024
            })
        );
    }

    #[test]
    fn test_reject_invalid_values() {
        assert!(RendererConfig::from_toml_str("frame_timeout_ns = 0").is_err());
        assert!(RendererConfig::from_toml_str("internal_resolution_scale = -1.0").is_err());
        assert!(RendererConfig::from_toml_str("present_mode = \"vsync\"").is_err());
    }
}
