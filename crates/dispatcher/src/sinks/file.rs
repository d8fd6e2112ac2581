//! FileSink - appends payloads to a JSON Lines file

use std::collections::HashMap;
use std::path::PathBuf;

use contracts::{ContractError, RecordSink};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file
    pub path: PathBuf,
    /// Keep existing content (otherwise truncate on open)
    pub append: bool,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let path = params
            .get("path")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| "missing 'path' parameter".to_string())?;

        let append = match params.get("append").map(String::as_str) {
            None => true,
            Some(raw) => raw
                .parse()
                .map_err(|_| format!("invalid 'append' value '{raw}', expected true or false"))?,
        };

        Ok(Self { path, append })
    }
}

/// Sink that writes one payload per line
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: Option<BufWriter<fs::File>>,
}

impl FileSink {
    /// Create a new FileSink, creating parent directories as needed
    pub async fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)
            .await?;

        let name = name.into();
        debug!(sink = %name, path = %config.path.display(), append = config.append, "FileSink opened");

        Ok(Self {
            name,
            config,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Create from params map (for factory)
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = FileSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation(format!("receivers.{name}.params"), e))?;
        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::delivery(name, e.to_string()))
    }

    fn writer(&mut self) -> Result<&mut BufWriter<fs::File>, ContractError> {
        let name = &self.name;
        self.writer
            .as_mut()
            .ok_or_else(|| ContractError::delivery(name, "file sink is closed"))
    }

    fn io_error(&self, e: std::io::Error) -> ContractError {
        error!(sink = %self.name, path = %self.config.path.display(), error = %e, "File write failed");
        ContractError::delivery(&self.name, e.to_string())
    }
}

impl RecordSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "file_sink_write", skip(self, payload), fields(sink = %self.name))]
    async fn write(&mut self, payload: &[u8]) -> Result<(), ContractError> {
        let writer = self.writer()?;
        let result = match writer.write_all(payload).await {
            Ok(()) => writer.write_all(b"\n").await,
            Err(e) => Err(e),
        };
        result.map_err(|e| self.io_error(e))
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let result = writer.flush().await;
        result.map_err(|e| self.io_error(e))
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        self.writer = None;
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_config_from_params() {
        let config = FileSinkConfig::from_params(&params(&[("path", "out.jsonl")])).unwrap();
        assert!(config.append);

        let config =
            FileSinkConfig::from_params(&params(&[("path", "out.jsonl"), ("append", "false")]))
                .unwrap();
        assert!(!config.append);

        assert!(FileSinkConfig::from_params(&params(&[])).is_err());
        assert!(FileSinkConfig::from_params(&params(&[("path", "a"), ("append", "yes")])).is_err());
    }

    #[tokio::test]
    async fn test_file_sink_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.jsonl");
        let config = FileSinkConfig {
            path: path.clone(),
            append: true,
        };

        let mut sink = FileSink::new("test_file", config).await.unwrap();
        sink.write(br#"{"a":1}"#).await.unwrap();
        sink.write(br#"{"a":2}"#).await.unwrap();
        sink.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"a\":1}\n{\"a\":2}\n");

        assert!(sink.write(b"{}").await.is_err());
    }

    #[tokio::test]
    async fn test_truncate_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        std::fs::write(&path, "old\n").unwrap();

        let mut sink = FileSink::new(
            "t",
            FileSinkConfig {
                path: path.clone(),
                append: false,
            },
        )
        .await
        .unwrap();
        sink.write(b"new").await.unwrap();
        sink.flush().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
    }
}
