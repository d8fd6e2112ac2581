//! # Translator
//!
//! 结构化转换与过滤引擎。
//!
//! 负责：
//! - 按路径表达式从嵌套 JSON 中取值 (`path`)
//! - 按字段规则判定记录是否投递 (`filter`)
//! - 将扁平的 `path -> destination` 表编译为 [`TranslationSpec`]
//! - 组合以上步骤：[`RecordTransformer::transform`]
//!
//! 纯同步代码，无 I/O，构建后只读，可被多个分发任务并发使用。
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use translator::{RecordTransformer, TranslationSpec};
//!
//! let spec = TranslationSpec::new([("a", "aa"), ("c.d", "cd")], ".");
//! let transformer = RecordTransformer::new(spec, Default::default());
//!
//! let input = json!({"a": "a", "b": "b", "c": {"d": 1}});
//! let output = transformer.transform(input.as_object().unwrap()).unwrap();
//! assert_eq!(serde_json::Value::Object(output), json!({"aa": "a", "b": "b", "cd": 1}));
//! ```

mod error;
mod filter;
mod path;
mod spec;
mod transformer;

pub use error::{Result, TranslatorError};
pub use filter::{values_equal, Comparand, FilterEngine, FilterRule, ValueKind};
pub use path::{resolve, PathExpression, PathSegment};
pub use spec::{TranslationEntry, TranslationSpec};
pub use transformer::RecordTransformer;
