//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON 格式。

use contracts::{ContractError, StreamerBlueprint};

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

fn parse_toml(content: &str) -> Result<StreamerBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

fn parse_json(content: &str) -> Result<StreamerBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<StreamerBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FilterOp, ReceiverType};

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[sources]
ids = ["orders", "inventory"]
base_path = "./data"
pace_ms = 5

[dispatch]
max_in_flight = 8

[[receivers]]
name = "audit"
receiver_type = "file"
params = { path = "./out/audit.jsonl" }

[receivers.translation]
paths = { "operation" = "op", "payload.structure.dep" = "department" }
filters = [
    { field = "operation", op = "==", value = "INSERT" },
    { field = "payload", op = "type_is", value = "map" },
]
"#;
        let bp = parse(content, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.sources.ids, vec!["orders", "inventory"]);
        assert_eq!(bp.sources.extension, "jsonl");
        assert_eq!(bp.sources.pace_ms, Some(5));
        assert_eq!(bp.dispatch.max_in_flight, 8);
        assert_eq!(bp.dispatch.drain_timeout_ms, 5000);

        let receiver = &bp.receivers[0];
        assert_eq!(receiver.receiver_type, ReceiverType::File);
        let translation = receiver.translation.as_ref().unwrap();
        assert_eq!(translation.separator, ".");
        assert_eq!(translation.paths["payload.structure.dep"], "department");
        assert_eq!(translation.filters[1].op, FilterOp::TypeIs);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "sources": { "ids": ["orders"] },
            "receivers": [{ "name": "console", "receiver_type": "log" }]
        }"#;
        let bp = parse(content, ConfigFormat::Json).unwrap();
        assert_eq!(bp.dispatch.max_in_flight, 20);
        assert!(bp.receivers[0].translation.is_none());
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse("invalid toml [[[", ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let content = r#"
[sources]
ids = ["orders"]

[[receivers]]
name = "console"
receiver_type = "log"
[receivers.translation]
filters = [{ field = "operation", op = "~=", value = "INSERT" }]
"#;
        let err = parse(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
