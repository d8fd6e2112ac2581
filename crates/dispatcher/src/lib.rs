//! # Dispatcher
//!
//! 记录分发模块。
//!
//! 负责：
//! - 扫描记录源并将每条记录 fan-out 到所有 receiver
//! - 限制并发分发任务数（背压作用于扫描）
//! - 每个 receiver 由单个 delivery 任务串行写入 sink
//! - 首个错误取消整个流，调用方取消优先

pub mod coordinator;
pub mod error;
pub mod factory;
pub mod metrics;
pub mod multi;
pub mod receiver;
pub mod rendezvous;
mod session;
pub mod sinks;

pub use contracts::{Receiver, RecordSink};
pub use coordinator::StreamCoordinator;
pub use error::DispatcherError;
pub use factory::{ConfiguredReceiver, ReceiverSet};
pub use metrics::{ReceiverMetrics, ReceiverMetricsSnapshot};
pub use multi::MultiStreamCoordinator;
pub use receiver::SinkReceiver;
pub use sinks::{FileSink, FileSinkConfig, LogSink, NetworkSink, NetworkSinkConfig};
