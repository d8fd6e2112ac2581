//! Translator 错误类型

use thiserror::Error;

/// Translator 错误
#[derive(Debug, Error)]
pub enum TranslatorError {
    /// 载荷不是合法 JSON
    #[error("failed to parse payload: {0}")]
    Parse(#[from] serde_json::Error),

    /// 载荷顶层不是对象
    #[error("payload is not a JSON object (found {found})")]
    NotAnObject {
        /// 实际的顶层类型
        found: &'static str,
    },

    /// 过滤规则的比较值与运算符不匹配
    #[error("filter rule on '{field}': operator '{op}' {message}")]
    InvalidRule {
        /// 字段名
        field: String,
        /// 运算符
        op: String,
        /// 错误消息
        message: String,
    },
}

/// Translator Result 类型别名
pub type Result<T> = std::result::Result<T, TranslatorError>;
