//! SinkReceiver - turns any `RecordSink` into a `Receiver`

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use contracts::{CancellationToken, ContractError, Receiver, RecordSink};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, trace};
use translator::RecordTransformer;

use crate::metrics::ReceiverMetrics;
use crate::rendezvous::{rendezvous, Acceptor, Rendezvous};

/// Delivery-side state, held by whichever task runs `send`
struct Delivery<S> {
    acceptor: Acceptor,
    sink: S,
}

/// Receiver backed by a single sink
///
/// Dispatch tasks hand payloads over through a rendezvous; the task driving
/// [`Receiver::send`] writes them to the sink one at a time and only then
/// releases the producer.
pub struct SinkReceiver<S> {
    name: String,
    transformer: Option<RecordTransformer>,
    rendezvous: Rendezvous,
    delivery: Mutex<Delivery<S>>,
    metrics: Arc<ReceiverMetrics>,
}

impl<S: RecordSink> SinkReceiver<S> {
    /// Wrap `sink`; the receiver is identified by the sink name
    pub fn new(sink: S) -> Self {
        let (rendezvous, acceptor) = rendezvous();
        Self {
            name: sink.name().to_string(),
            transformer: None,
            rendezvous,
            delivery: Mutex::new(Delivery { acceptor, sink }),
            metrics: Arc::new(ReceiverMetrics::new()),
        }
    }

    /// Reshape and filter payloads before delivery
    pub fn with_transformer(mut self, transformer: RecordTransformer) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Shared counters
    pub fn metrics(&self) -> &Arc<ReceiverMetrics> {
        &self.metrics
    }

    /// Close the underlying sink
    ///
    /// Waits for a running delivery loop to stop first.
    #[instrument(name = "sink_receiver_close", skip(self), fields(receiver = %self.name))]
    pub async fn close(&self) -> Result<(), ContractError> {
        let mut delivery = self.delivery.lock().await;
        delivery.sink.close().await?;
        debug!(receiver = %self.name, "receiver closed");
        Ok(())
    }
}

#[async_trait]
impl<S: RecordSink + 'static> Receiver for SinkReceiver<S> {
    fn identifier(&self) -> &str {
        &self.name
    }

    async fn send(&self, stop: &CancellationToken) -> Result<(), ContractError> {
        let mut delivery = self
            .delivery
            .try_lock()
            .map_err(|_| ContractError::ReceiverBusy {
                receiver: self.name.clone(),
            })?;
        let Delivery { acceptor, sink } = &mut *delivery;

        debug!(receiver = %self.name, "delivery loop started");
        loop {
            let handoff = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                handoff = acceptor.accept() => handoff,
            };
            let Some(handoff) = handoff else {
                break;
            };

            let started = Instant::now();
            match sink.write(handoff.payload()).await {
                Ok(()) => {
                    self.metrics.inc_delivered();
                    observability::record_delivery(
                        &self.name,
                        true,
                        started.elapsed().as_secs_f64() * 1000.0,
                    );
                    trace!(receiver = %self.name, bytes = handoff.payload().len(), "delivered");
                    handoff.complete();
                }
                Err(e) => {
                    self.metrics.inc_failed();
                    observability::record_delivery(&self.name, false, 0.0);
                    error!(receiver = %self.name, error = %e, "delivery failed");
                    return Err(e);
                }
            }
        }

        sink.flush().await?;
        info!(
            receiver = %self.name,
            delivered = self.metrics.delivered(),
            "delivery loop stopped"
        );
        Ok(())
    }

    async fn enqueue(&self, payload: Bytes) -> Result<(), ContractError> {
        self.rendezvous
            .hand_off(payload)
            .await
            .map_err(|_| ContractError::receiver_closed(&self.name))
    }

    fn needs_transform(&self) -> bool {
        self.transformer.is_some()
    }

    fn transform(&self, payload: &[u8]) -> Result<Option<Bytes>, ContractError> {
        let Some(transformer) = &self.transformer else {
            return Ok(Some(Bytes::copy_from_slice(payload)));
        };

        match transformer.transform_bytes(payload) {
            Ok(Some(output)) => {
                self.metrics.inc_transformed();
                Ok(Some(output))
            }
            Ok(None) => {
                self.metrics.inc_filtered();
                Ok(None)
            }
            Err(e) => Err(ContractError::transform(&self.name, e.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use contracts::FilterOp;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::time::timeout;
    use translator::{FilterEngine, TranslationSpec};

    /// Sink that records payloads and can fail on demand
    pub(crate) struct MemorySink {
        pub name: String,
        pub written: Arc<StdMutex<Vec<Vec<u8>>>>,
        pub fail_on: Option<usize>,
        pub delay: Option<Duration>,
    }

    impl MemorySink {
        pub(crate) fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                written: Arc::default(),
                fail_on: None,
                delay: None,
            }
        }
    }

    impl RecordSink for MemorySink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, payload: &[u8]) -> Result<(), ContractError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let mut written = self.written.lock().unwrap();
            if self.fail_on == Some(written.len()) {
                return Err(ContractError::delivery(&self.name, "mock failure"));
            }
            written.push(payload.to_vec());
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_enqueue_delivers_through_send() {
        let sink = MemorySink::new("mem");
        let written = Arc::clone(&sink.written);
        let receiver = Arc::new(SinkReceiver::new(sink));
        let stop = CancellationToken::new();

        let loop_receiver = Arc::clone(&receiver);
        let loop_stop = stop.clone();
        let delivery = tokio::spawn(async move { loop_receiver.send(&loop_stop).await });

        receiver.enqueue(Bytes::from_static(b"a")).await.unwrap();
        receiver.enqueue(Bytes::from_static(b"b")).await.unwrap();
        // Acknowledged means written.
        assert_eq!(written.lock().unwrap().len(), 2);

        stop.cancel();
        delivery.await.unwrap().unwrap();
        assert_eq!(receiver.metrics().delivered(), 2);
    }

    #[tokio::test]
    async fn test_second_send_is_busy() {
        let receiver = Arc::new(SinkReceiver::new(MemorySink::new("mem")));
        let stop = CancellationToken::new();

        let first = Arc::clone(&receiver);
        let first_stop = stop.clone();
        let running = tokio::spawn(async move { first.send(&first_stop).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = receiver.send(&stop).await.unwrap_err();
        assert!(matches!(err, ContractError::ReceiverBusy { .. }));

        stop.cancel();
        running.await.unwrap().unwrap();

        // Free again once the first loop stopped.
        let stop = CancellationToken::new();
        stop.cancel();
        receiver.send(&stop).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_failure_ends_send_and_rejects_producer() {
        let mut sink = MemorySink::new("mem");
        sink.fail_on = Some(0);
        let receiver = Arc::new(SinkReceiver::new(sink));
        let stop = CancellationToken::new();

        let loop_receiver = Arc::clone(&receiver);
        let delivery = tokio::spawn(async move { loop_receiver.send(&stop).await });

        let err = receiver
            .enqueue(Bytes::from_static(b"a"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::ReceiverClosed { .. }));

        let err = delivery.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "receiver service mem error: mock failure");
        assert_eq!(receiver.metrics().failed(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_blocks_without_delivery_loop() {
        let receiver = SinkReceiver::new(MemorySink::new("mem"));
        let pending = timeout(
            Duration::from_millis(50),
            receiver.enqueue(Bytes::from_static(b"a")),
        )
        .await;
        assert!(pending.is_err(), "enqueue returned without a delivery task");
    }

    #[test]
    fn test_transform_and_filter() {
        let mut filters = FilterEngine::new();
        filters.add_rule("operation", FilterOp::Eq, serde_json::json!("INSERT"));
        let receiver = SinkReceiver::new(MemorySink::new("mem")).with_transformer(
            RecordTransformer::new(TranslationSpec::new([("operation", "op")], "."), filters),
        );
        assert!(receiver.needs_transform());

        let out = receiver
            .transform(br#"{"operation":"INSERT"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(&out[..], br#"{"op":"INSERT"}"#);

        assert!(receiver
            .transform(br#"{"operation":"UPDATE"}"#)
            .unwrap()
            .is_none());

        let err = receiver.transform(b"[]").unwrap_err();
        assert!(matches!(err, ContractError::Transform { ref receiver, .. } if receiver == "mem"));

        let snapshot = receiver.metrics().snapshot();
        assert_eq!(snapshot.transformed, 1);
        assert_eq!(snapshot.filtered, 1);
    }

    #[test]
    fn test_no_transformer_passes_bytes() {
        let receiver = SinkReceiver::new(MemorySink::new("mem"));
        assert!(!receiver.needs_transform());
        assert_eq!(
            receiver.transform(b"raw").unwrap(),
            Some(Bytes::from_static(b"raw"))
        );
    }
}
