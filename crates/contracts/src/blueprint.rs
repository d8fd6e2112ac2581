//! StreamerBlueprint - Config Loader 输出
//!
//! 描述完整的运行配置：上游数据源、分发并发度、下游接收端及其转换/过滤规则。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的运行配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamerBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 上游数据源
    pub sources: SourcesConfig,

    /// 分发设置
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// 下游接收端列表
    pub receivers: Vec<ReceiverConfig>,
}

/// 上游数据源配置
///
/// 每个 id 对应一个独立的 source，共享其余选项。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// 数据源标识列表（空字符串会被忽略）
    pub ids: Vec<String>,

    /// JSON Lines 文件所在目录
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    /// 文件扩展名
    #[serde(default = "default_extension")]
    pub extension: String,

    /// 两条记录之间的回放间隔 (毫秒，可选)
    #[serde(default)]
    pub pace_ms: Option<u64>,
}

impl SourcesConfig {
    /// 非空的数据源标识
    pub fn active_ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str).filter(|id| !id.is_empty())
    }
}

fn default_base_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_extension() -> String {
    "jsonl".to_string()
}

/// 分发配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// 并发中的 (record × receiver) 任务上限
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// 取消后等待在途任务的最长时间 (毫秒)
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

impl DispatchConfig {
    /// 取消后的等待时长
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

fn default_max_in_flight() -> usize {
    20
}

fn default_drain_timeout_ms() -> u64 {
    5000
}

/// 接收端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// 接收端名称
    pub name: String,

    /// 接收端类型
    pub receiver_type: ReceiverType,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,

    /// 字段转换与过滤 (可选，缺省时原样投递)
    #[serde(default)]
    pub translation: Option<TranslationConfig>,
}

/// 接收端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverType {
    /// 日志输出
    Log,
    /// 文件输出 (JSON Lines)
    File,
    /// 网络输出 (UDP)
    Network,
}

/// 字段转换配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// 源路径 -> 目标字段名
    #[serde(default)]
    pub paths: BTreeMap<String, String>,

    /// 路径分隔符
    #[serde(default = "default_separator")]
    pub separator: String,

    /// 过滤规则（按声明顺序求值）
    #[serde(default)]
    pub filters: Vec<FilterRuleConfig>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            paths: BTreeMap::new(),
            separator: default_separator(),
            filters: Vec::new(),
        }
    }
}

fn default_separator() -> String {
    ".".to_string()
}

/// 单条过滤规则 (field, op, value)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRuleConfig {
    /// 顶层字段名
    pub field: String,

    /// 运算符
    pub op: FilterOp,

    /// 比较值；type_is / type_is_not 时为类型名
    pub value: serde_json::Value,
}

/// 过滤运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    /// 结构相等
    #[serde(rename = "==")]
    Eq,
    /// 结构不等
    #[serde(rename = "!=")]
    Ne,
    /// 类型匹配
    #[serde(rename = "type_is", alias = "type-is")]
    TypeIs,
    /// 类型不匹配
    #[serde(rename = "type_is_not", alias = "type-is-not")]
    TypeIsNot,
}

impl FilterOp {
    /// 配置中的写法
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::TypeIs => "type_is",
            Self::TypeIsNot => "type_is_not",
        }
    }

    /// 是否比较的是类型而非值
    pub fn is_kind_check(&self) -> bool {
        matches!(self, Self::TypeIs | Self::TypeIsNot)
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            "type_is" | "type-is" => Ok(Self::TypeIs),
            "type_is_not" | "type-is-not" => Ok(Self::TypeIsNot),
            other => Err(format!("unknown filter operator '{other}'")),
        }
    }
}
