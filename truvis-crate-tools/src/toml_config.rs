use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;

/// 从 TOML 文件加载配置
///
/// 读取失败与解析失败都会带上文件路径。
pub fn load_toml<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> anyhow::Result<T> {
    let content =
        fs::read_to_string(path.as_ref()).with_context(|| format!("读取配置文件失败: {:?}", path.as_ref()))?;

    parse_toml(&content).with_context(|| format!("解析 TOML 配置失败: {:?}", path.as_ref()))
}

/// 从 TOML 字符串解析配置
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> anyhow::Result<T> {
    let config = toml::from_str(content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Sample {
        name: String,
        #[serde(default)]
        count: u32,
    }

    #[test]
    fn test_parse_toml() {
        let sample: Sample = parse_toml("name = \"truvis\"\ncount = 3").unwrap();
        assert_eq!(
            sample,
            Sample {
                name: "truvis".to_string(),
                count: 3
            }
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_toml::<Sample, _>("definitely/not/here.toml").unwrap_err();
        assert!(format!("{err:#}").contains("读取配置文件失败"));
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(parse_toml::<Sample>("count = 3").is_err());
    }
}
