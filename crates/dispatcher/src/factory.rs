//! Builds receivers from blueprint configuration

use std::sync::Arc;

use contracts::{ContractError, Receiver, ReceiverConfig, ReceiverType};
use tracing::{info, instrument, warn};
use translator::RecordTransformer;

use crate::error::DispatcherError;
use crate::metrics::{ReceiverMetrics, ReceiverMetricsSnapshot};
use crate::receiver::SinkReceiver;
use crate::sinks::{FileSink, LogSink, NetworkSink};

/// A receiver built from configuration, keeping its concrete sink type
pub enum ConfiguredReceiver {
    Log(Arc<SinkReceiver<LogSink>>),
    File(Arc<SinkReceiver<FileSink>>),
    Network(Arc<SinkReceiver<NetworkSink>>),
}

impl ConfiguredReceiver {
    /// Receiver name
    pub fn name(&self) -> &str {
        match self {
            Self::Log(r) => r.identifier(),
            Self::File(r) => r.identifier(),
            Self::Network(r) => r.identifier(),
        }
    }

    /// Type-erased handle for the coordinators
    pub fn as_receiver(&self) -> Arc<dyn Receiver> {
        match self {
            Self::Log(r) => Arc::clone(r) as Arc<dyn Receiver>,
            Self::File(r) => Arc::clone(r) as Arc<dyn Receiver>,
            Self::Network(r) => Arc::clone(r) as Arc<dyn Receiver>,
        }
    }

    /// Shared counters
    pub fn metrics(&self) -> &Arc<ReceiverMetrics> {
        match self {
            Self::Log(r) => r.metrics(),
            Self::File(r) => r.metrics(),
            Self::Network(r) => r.metrics(),
        }
    }

    /// Close the underlying sink
    pub async fn close(&self) -> Result<(), ContractError> {
        match self {
            Self::Log(r) => r.close().await,
            Self::File(r) => r.close().await,
            Self::Network(r) => r.close().await,
        }
    }
}

/// Every receiver of a blueprint
pub struct ReceiverSet {
    receivers: Vec<ConfiguredReceiver>,
}

impl ReceiverSet {
    /// Build one receiver per config, in order
    ///
    /// # Errors
    /// [`DispatcherError::SinkCreation`] naming the first receiver that
    /// could not be built.
    #[instrument(
        name = "receiver_set_build",
        skip(configs),
        fields(receiver_count = configs.len())
    )]
    pub async fn from_configs(configs: &[ReceiverConfig]) -> Result<Self, DispatcherError> {
        let mut receivers = Vec::with_capacity(configs.len());
        for config in configs {
            receivers.push(create_receiver(config).await?);
        }
        info!(receivers = receivers.len(), "receivers created");
        Ok(Self { receivers })
    }

    /// Type-erased receivers, in configuration order
    pub fn receivers(&self) -> Vec<Arc<dyn Receiver>> {
        self.receivers.iter().map(ConfiguredReceiver::as_receiver).collect()
    }

    /// Counter snapshot per receiver
    pub fn snapshots(&self) -> Vec<(String, ReceiverMetricsSnapshot)> {
        self.receivers
            .iter()
            .map(|r| (r.name().to_string(), r.metrics().snapshot()))
            .collect()
    }

    /// Close every sink; failures are logged and the first one returned
    pub async fn close_all(&self) -> Result<(), ContractError> {
        let mut first = None;
        for receiver in &self.receivers {
            if let Err(e) = receiver.close().await {
                warn!(receiver = %receiver.name(), error = %e, "receiver close failed");
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }
}

#[instrument(
    name = "create_receiver",
    skip(config),
    fields(receiver = %config.name, receiver_type = ?config.receiver_type)
)]
async fn create_receiver(config: &ReceiverConfig) -> Result<ConfiguredReceiver, DispatcherError> {
    let transformer = config
        .translation
        .as_ref()
        .map(RecordTransformer::from_config)
        .transpose()
        .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;

    let receiver = match config.receiver_type {
        ReceiverType::Log => {
            ConfiguredReceiver::Log(Arc::new(wrap(LogSink::new(&config.name), transformer)))
        }
        ReceiverType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            ConfiguredReceiver::File(Arc::new(wrap(sink, transformer)))
        }
        ReceiverType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            ConfiguredReceiver::Network(Arc::new(wrap(sink, transformer)))
        }
    };
    Ok(receiver)
}

fn wrap<S: contracts::RecordSink>(sink: S, transformer: Option<RecordTransformer>) -> SinkReceiver<S> {
    let receiver = SinkReceiver::new(sink);
    match transformer {
        Some(t) => receiver.with_transformer(t),
        None => receiver,
    }
}
