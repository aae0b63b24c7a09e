//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, PipelineConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<PipelineConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<PipelineConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<PipelineConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AveragingPolicy, DistanceUnits};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[session]
distance_units = "kilometers"

[channels.acceleration]
capacity = 200
min_notify_interval_ms = 50
policy = { kind = "count_window", size = 20 }
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let cfg = result.unwrap();
        assert_eq!(cfg.session.distance_units, DistanceUnits::Kilometers);
        assert_eq!(cfg.channels.acceleration.capacity, Some(200));
        assert_eq!(
            cfg.channels.acceleration.policy,
            AveragingPolicy::CountWindow { size: 20 }
        );
        assert_eq!(cfg.channels.orientation.min_notify_interval_ms, 100);
        assert!(cfg.replay.is_none());
    }

    #[test]
    fn test_parse_empty_toml_uses_defaults() {
        let cfg = parse_toml("").unwrap();
        assert_eq!(cfg.session.distance_units, DistanceUnits::Miles);
        assert_eq!(cfg.channels.heading.policy, AveragingPolicy::MostRecent);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "session": { "fused_min_interval_ms": 50 },
            "channels": {
                "location": { "capacity": null, "policy": { "kind": "time_window", "window_ms": 1000 } }
            },
            "replay": { "directory": "/data/drive1", "speed": 2.0 }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let cfg = result.unwrap();
        assert_eq!(cfg.channels.location.capacity, None);
        assert_eq!(cfg.replay.unwrap().speed, 2.0);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_policy_kind_is_parse_error() {
        let content = r#"
[channels.heading]
policy = { kind = "kalman" }
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
