//! LogSink - logs payload summaries via tracing

use contracts::{ContractError, RecordSink};
use tracing::{info, instrument};

const PREVIEW_LEN: usize = 256;

/// Sink that logs payload summaries for debugging
pub struct LogSink {
    name: String,
    written: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            written: 0,
        }
    }

    /// Payloads logged so far
    pub fn written(&self) -> u64 {
        self.written
    }

    fn preview(payload: &[u8]) -> String {
        let end = payload.len().min(PREVIEW_LEN);
        let mut text = String::from_utf8_lossy(&payload[..end]).into_owned();
        if payload.len() > PREVIEW_LEN {
            text.push_str("...");
        }
        text
    }
}

impl RecordSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_sink_write", skip(self, payload), fields(sink = %self.name))]
    async fn write(&mut self, payload: &[u8]) -> Result<(), ContractError> {
        self.written += 1;
        info!(
            sink = %self.name,
            seq = self.written,
            bytes = payload.len(),
            payload = %Self::preview(payload),
            "record delivered"
        );
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, written = self.written, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        sink.write(br#"{"id":1}"#).await.unwrap();
        sink.write(b"").await.unwrap();
        assert_eq!(sink.written(), 2);
        assert_eq!(sink.name(), "test_log");
    }

    #[test]
    fn test_preview_truncates() {
        let long = vec![b'a'; PREVIEW_LEN + 10];
        let preview = LogSink::preview(&long);
        assert_eq!(preview.len(), PREVIEW_LEN + 3);
        assert!(preview.ends_with("..."));
    }
}
