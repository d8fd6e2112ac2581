//! 内存数据源
//!
//! 用于测试和无外部依赖的回放。

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use contracts::{CancellationToken, ContractError, Record, RecordHandler, RecordSource, SourceFactory};
use tracing::{debug, instrument, trace};

use crate::error::IngestionError;

/// 内存数据源
///
/// 按顺序回放预先给定的载荷，序号从 0 开始。
#[derive(Debug, Clone)]
pub struct MemorySource {
    source_id: String,
    records: Vec<Bytes>,
    interval: Option<Duration>,
}

impl MemorySource {
    /// 创建新的内存数据源
    pub fn new<I, B>(source_id: impl Into<String>, records: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            source_id: source_id.into(),
            records: records.into_iter().map(Into::into).collect(),
            interval: None,
        }
    }

    /// 设置两条记录之间的间隔
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// 记录条数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for MemorySource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    #[instrument(name = "memory_source_scan", skip_all, fields(source_id = %self.source_id))]
    async fn scan<H: RecordHandler>(
        &self,
        cancel: &CancellationToken,
        handler: &mut H,
    ) -> Result<(), ContractError> {
        for (seq, payload) in self.records.iter().enumerate() {
            if seq > 0 {
                if let Some(interval) = self.interval {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(interval) => {}
                    }
                }
            }
            if cancel.is_cancelled() {
                debug!(scanned = seq, "scan cancelled");
                return Ok(());
            }

            observability::record_record_scanned(&self.source_id);
            trace!(sequence_number = seq, bytes = payload.len(), "record scanned");
            handler
                .on_record(Record::new(&self.source_id, seq as u64, payload.clone()))
                .await?;
        }

        debug!(scanned = self.records.len(), "scan completed");
        Ok(())
    }
}

/// 内存数据源工厂
///
/// 按 id 注册载荷；打开未注册的 id 会失败。
#[derive(Debug, Clone, Default)]
pub struct MemorySourceFactory {
    sources: HashMap<String, Vec<Bytes>>,
    interval: Option<Duration>,
}

impl MemorySourceFactory {
    /// 创建空工厂
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个数据源
    pub fn with_source<I, B>(mut self, source_id: impl Into<String>, records: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.sources
            .insert(source_id.into(), records.into_iter().map(Into::into).collect());
        self
    }

    /// 所有打开的数据源共享的回放间隔
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }
}

impl SourceFactory for MemorySourceFactory {
    type Source = MemorySource;

    async fn open(&self, source_id: &str) -> Result<MemorySource, ContractError> {
        let records = self
            .sources
            .get(source_id)
            .ok_or_else(|| IngestionError::UnknownSource {
                source_id: source_id.to_string(),
            })?;

        let source = MemorySource {
            source_id: source_id.to_string(),
            records: records.clone(),
            interval: self.interval,
        };
        debug!(source_id, records = source.len(), "memory source opened");
        Ok(source)
    }
}
