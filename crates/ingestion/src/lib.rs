//! # Ingestion
//!
//! 上游记录源。
//!
//! 职责：
//! - 实现 `RecordSource`：可取消的顺序扫描，每条记录回调一次 handler
//! - 实现 `SourceFactory`：由 source id + 共享选项构造数据源
//! - handler 返回错误时中止扫描并原样返回该错误
//!
//! ## 使用示例
//!
//! ```ignore
//! use ingestion::JsonLinesSourceFactory;
//! use contracts::{SourceFactory, RecordSource};
//!
//! let factory = JsonLinesSourceFactory::new("./data", "jsonl");
//! let source = factory.open("orders").await?;
//! source.scan(&cancel, &mut handler).await?;
//! ```

mod error;
mod json_lines;
mod memory;

// Re-exports
pub use error::{IngestionError, Result};
pub use json_lines::{JsonLinesSource, JsonLinesSourceFactory};
pub use memory::{MemorySource, MemorySourceFactory};
