//! 配置校验模块
//!
//! 校验规则：
//! - 至少一个非空 source id
//! - receiver 名称非空且唯一
//! - max_in_flight > 0, drain_timeout_ms > 0
//! - 转换分隔符非空，过滤规则可构建
//! - receiver 必填参数齐全

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{ContractError, ReceiverConfig, ReceiverType, StreamerBlueprint};
use translator::FilterRule;

/// 校验 StreamerBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &StreamerBlueprint) -> Result<(), ContractError> {
    validate_sources(blueprint)?;
    validate_dispatch(blueprint)?;
    validate_receiver_names(blueprint)?;
    for (idx, receiver) in blueprint.receivers.iter().enumerate() {
        validate_params(idx, receiver)?;
        validate_translation(idx, receiver)?;
    }
    Ok(())
}

fn validate_sources(blueprint: &StreamerBlueprint) -> Result<(), ContractError> {
    if blueprint.sources.active_ids().next().is_none() {
        return Err(ContractError::config_validation(
            "sources.ids",
            "at least one non-empty source id is required",
        ));
    }
    if blueprint.sources.extension.is_empty() {
        return Err(ContractError::config_validation(
            "sources.extension",
            "extension cannot be empty",
        ));
    }
    Ok(())
}

fn validate_dispatch(blueprint: &StreamerBlueprint) -> Result<(), ContractError> {
    let dispatch = &blueprint.dispatch;
    if dispatch.max_in_flight == 0 {
        return Err(ContractError::config_validation(
            "dispatch.max_in_flight",
            "max_in_flight must be > 0",
        ));
    }
    if dispatch.drain_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "dispatch.drain_timeout_ms",
            "drain_timeout_ms must be > 0",
        ));
    }
    Ok(())
}

/// 校验 receiver 名称唯一性
fn validate_receiver_names(blueprint: &StreamerBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, receiver) in blueprint.receivers.iter().enumerate() {
        if receiver.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("receivers[{idx}].name"),
                "receiver name cannot be empty",
            ));
        }
        if !seen.insert(receiver.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("receivers[name={}]", receiver.name),
                "duplicate receiver name",
            ));
        }
    }
    Ok(())
}

/// 校验类型特定参数
fn validate_params(idx: usize, receiver: &ReceiverConfig) -> Result<(), ContractError> {
    let field = |key: &str| format!("receivers[{idx}].params.{key}");
    let required = |key: &str| {
        receiver
            .params
            .get(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ContractError::config_validation(
                    field(key),
                    format!("{:?} receiver requires '{key}'", receiver.receiver_type),
                )
            })
    };

    match receiver.receiver_type {
        ReceiverType::Log => {}
        ReceiverType::File => {
            required("path")?;
            if let Some(raw) = receiver.params.get("append") {
                raw.parse::<bool>().map_err(|_| {
                    ContractError::config_validation(
                        field("append"),
                        format!("expected true or false, got '{raw}'"),
                    )
                })?;
            }
        }
        ReceiverType::Network => {
            let addr = required("addr")?;
            addr.parse::<SocketAddr>().map_err(|e| {
                ContractError::config_validation(field("addr"), format!("invalid address '{addr}': {e}"))
            })?;
            if let Some(raw) = receiver.params.get("max_packet_size") {
                match raw.parse::<usize>() {
                    Ok(size) if size > 0 => {}
                    _ => {
                        return Err(ContractError::config_validation(
                            field("max_packet_size"),
                            format!("expected a positive integer, got '{raw}'"),
                        ))
                    }
                }
            }
        }
    }
    Ok(())
}

/// 校验转换与过滤配置
fn validate_translation(idx: usize, receiver: &ReceiverConfig) -> Result<(), ContractError> {
    let Some(translation) = &receiver.translation else {
        return Ok(());
    };

    if translation.separator.is_empty() {
        return Err(ContractError::config_validation(
            format!("receivers[{idx}].translation.separator"),
            "separator cannot be empty",
        ));
    }

    for (path, destination) in &translation.paths {
        if path.is_empty() || destination.is_empty() {
            return Err(ContractError::config_validation(
                format!("receivers[{idx}].translation.paths"),
                format!("empty path or destination in '{path}' -> '{destination}'"),
            ));
        }
    }

    for (rule_idx, rule) in translation.filters.iter().enumerate() {
        FilterRule::from_config(rule).map_err(|e| {
            ContractError::config_validation(
                format!("receivers[{idx}].translation.filters[{rule_idx}]"),
                e.to_string(),
            )
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigFormat, ConfigLoader};

    fn parse(content: &str) -> StreamerBlueprint {
        crate::parser::parse(content, ConfigFormat::Toml).unwrap()
    }

    fn field_of(err: ContractError) -> String {
        match err {
            ContractError::ConfigValidation { field, .. } => field,
            other => panic!("expected validation error, got {other}"),
        }
    }

    const BASE: &str = r#"
[sources]
ids = ["orders"]

[[receivers]]
name = "console"
receiver_type = "log"
"#;

    #[test]
    fn test_minimal_is_valid() {
        assert!(validate(&parse(BASE)).is_ok());
    }

    #[test]
    fn test_empty_source_ids_rejected() {
        let bp = parse(
            r#"
[sources]
ids = ["", ""]

[[receivers]]
name = "console"
receiver_type = "log"
"#,
        );
        assert_eq!(field_of(validate(&bp).unwrap_err()), "sources.ids");
    }

    #[test]
    fn test_zero_max_in_flight_rejected() {
        let mut bp = parse(BASE);
        bp.dispatch.max_in_flight = 0;
        assert_eq!(field_of(validate(&bp).unwrap_err()), "dispatch.max_in_flight");
    }

    #[test]
    fn test_zero_drain_timeout_rejected() {
        let mut bp = parse(BASE);
        bp.dispatch.drain_timeout_ms = 0;
        assert_eq!(field_of(validate(&bp).unwrap_err()), "dispatch.drain_timeout_ms");
    }

    #[test]
    fn test_duplicate_receiver_rejected() {
        let content = format!("{BASE}\n[[receivers]]\nname = \"console\"\nreceiver_type = \"log\"\n");
        let err = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("duplicate receiver name"));
    }

    #[test]
    fn test_file_requires_path() {
        let content = format!("{BASE}\n[[receivers]]\nname = \"audit\"\nreceiver_type = \"file\"\n");
        let err = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap_err();
        assert_eq!(field_of(err), "receivers[1].params.path");
    }

    #[test]
    fn test_network_addr_must_parse() {
        let content = format!(
            "{BASE}\n[[receivers]]\nname = \"udp\"\nreceiver_type = \"network\"\nparams = {{ addr = \"not an addr\" }}\n"
        );
        let err = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap_err();
        assert_eq!(field_of(err), "receivers[1].params.addr");
    }

    #[test]
    fn test_empty_separator_rejected() {
        let content = format!("{BASE}\n[receivers.translation]\nseparator = \"\"\n");
        let err = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap_err();
        assert_eq!(field_of(err), "receivers[0].translation.separator");
    }

    #[test]
    fn test_kind_check_needs_kind_name() {
        let content = format!(
            "{BASE}\n[receivers.translation]\nfilters = [{{ field = \"payload\", op = \"type_is\", value = 3 }}]\n"
        );
        let err = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap_err();
        assert_eq!(field_of(err), "receivers[0].translation.filters[0]");
    }

    #[test]
    fn test_kind_aliases_accepted() {
        let content = format!(
            "{BASE}\n[receivers.translation]\nfilters = [\n  {{ field = \"a\", op = \"type_is\", value = \"list\" }},\n  {{ field = \"b\", op = \"type_is_not\", value = \"object\" }},\n]\n"
        );
        assert!(ConfigLoader::load_from_str(&content, ConfigFormat::Toml).is_ok());
    }
}
