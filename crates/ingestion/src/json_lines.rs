//! JSON Lines 文件数据源
//!
//! 每个非空行是一条记录；`<base_path>/<source_id>.<extension>`。
//! 行按字节读取，不要求 UTF-8。

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    CancellationToken, ContractError, Record, RecordHandler, RecordSource, SourceFactory,
    SourcesConfig,
};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, instrument, trace};

use crate::error::IngestionError;

/// 从 JSON Lines 文件回放的数据源
///
/// 行内容不做解析，去掉行尾 `\n` / `\r\n` 后原样作为载荷；
/// 序号为非空行的计数。
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    source_id: String,
    path: PathBuf,
    pace: Option<Duration>,
}

impl JsonLinesSource {
    /// 文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for JsonLinesSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    #[instrument(
        name = "json_lines_scan",
        skip_all,
        fields(source_id = %self.source_id, path = %self.path.display())
    )]
    async fn scan<H: RecordHandler>(
        &self,
        cancel: &CancellationToken,
        handler: &mut H,
    ) -> Result<(), ContractError> {
        let file = File::open(&self.path)
            .await
            .map_err(|source| IngestionError::ReadFailed {
                source_id: self.source_id.clone(),
                records: 0,
                source,
            })?;
        let mut lines = BufReader::new(file).split(b'\n');
        let mut seq: u64 = 0;

        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(scanned = seq, "scan cancelled");
                    return Ok(());
                }
                line = lines.next_segment() => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(source) => {
                    return Err(IngestionError::ReadFailed {
                        source_id: self.source_id.clone(),
                        records: seq,
                        source,
                    }
                    .into())
                }
            };

            let line = line.strip_suffix(b"\r").unwrap_or(&line[..]);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            if seq > 0 {
                if let Some(pace) = self.pace {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            debug!(scanned = seq, "scan cancelled");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(pace) => {}
                    }
                }
            }

            observability::record_record_scanned(&self.source_id);
            trace!(sequence_number = seq, bytes = line.len(), "record scanned");
            let payload = Bytes::copy_from_slice(line);
            handler
                .on_record(Record::new(&self.source_id, seq, payload))
                .await?;
            seq += 1;
        }

        debug!(scanned = seq, "scan completed");
        Ok(())
    }
}

/// JSON Lines 数据源工厂
///
/// 所有数据源共享目录、扩展名与回放间隔。
#[derive(Debug, Clone)]
pub struct JsonLinesSourceFactory {
    base_path: PathBuf,
    extension: String,
    pace: Option<Duration>,
}

impl JsonLinesSourceFactory {
    /// 创建工厂
    pub fn new(base_path: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            extension: extension.into(),
            pace: None,
        }
    }

    /// 从配置创建
    pub fn from_config(config: &SourcesConfig) -> Self {
        let mut factory = Self::new(&config.base_path, &config.extension);
        factory.pace = config
            .pace_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        factory
    }

    /// `source_id` 对应的文件路径
    pub fn path_for(&self, source_id: &str) -> PathBuf {
        self.base_path.join(format!("{source_id}.{}", self.extension))
    }
}

impl SourceFactory for JsonLinesSourceFactory {
    type Source = JsonLinesSource;

    async fn open(&self, source_id: &str) -> Result<JsonLinesSource, ContractError> {
        let path = self.path_for(source_id);
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|source| IngestionError::OpenFailed {
                source_id: source_id.to_string(),
                path: path.clone(),
                source,
            })?;
        if !metadata.is_file() {
            return Err(IngestionError::OpenFailed {
                source_id: source_id.to_string(),
                path,
                source: std::io::Error::other("not a regular file"),
            }
            .into());
        }

        info!(source_id, path = %path.display(), "json lines source opened");
        Ok(JsonLinesSource {
            source_id: source_id.to_string(),
            path,
            pace: self.pace,
        })
    }
}
