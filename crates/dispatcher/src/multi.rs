//! MultiStreamCoordinator - one coordinator per named source, run as a group

use std::sync::Arc;
use std::time::Duration;

use contracts::{CancellationToken, ContractError, DispatchConfig, Receiver, RecordSource, SourceFactory};
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, instrument, Instrument};

use crate::coordinator::StreamCoordinator;
use crate::session::{DeliveryGroup, StreamScope};

/// Group of coordinators sharing one receiver set
pub struct MultiStreamCoordinator<S> {
    coordinators: Vec<Arc<StreamCoordinator<S>>>,
    drain_timeout: Duration,
}

impl<S> MultiStreamCoordinator<S>
where
    S: RecordSource + Send + Sync + 'static,
{
    /// Open every source concurrently and wrap each in a coordinator
    ///
    /// Empty ids are skipped. Coordinators keep the order of `source_ids`.
    ///
    /// # Errors
    /// The first construction error, reported once every open has finished;
    /// [`ContractError::Cancelled`] when `ctx` fires first.
    #[instrument(name = "multi_stream_build", skip_all)]
    pub async fn build<F, I>(
        ctx: &CancellationToken,
        factory: Arc<F>,
        source_ids: I,
        config: &DispatchConfig,
    ) -> Result<Self, ContractError>
    where
        F: SourceFactory<Source = S> + Sync + 'static,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let ids: Vec<String> = source_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        let mut opens = JoinSet::new();
        for (idx, id) in ids.iter().enumerate() {
            let factory = Arc::clone(&factory);
            let id = id.clone();
            let span = info_span!("open_source", source_id = %id);
            opens.spawn(async move { (idx, factory.open(&id).await) }.instrument(span));
        }

        let mut opened: Vec<Option<S>> = ids.iter().map(|_| None).collect();
        let mut first_error: Option<ContractError> = None;

        loop {
            let joined = tokio::select! {
                biased;
                _ = ctx.cancelled() => {
                    opens.abort_all();
                    debug!("build cancelled");
                    return Err(ContractError::Cancelled);
                }
                joined = opens.join_next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((idx, Ok(source))) => opened[idx] = Some(source),
                Ok((idx, Err(err))) => {
                    error!(source_id = %ids[idx], error = %err, "source construction failed");
                    first_error.get_or_insert(err);
                }
                Err(join_err) => {
                    first_error.get_or_insert(ContractError::Other(format!(
                        "source construction task failed: {join_err}"
                    )));
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        let coordinators: Vec<_> = opened
            .into_iter()
            .flatten()
            .map(|source| Arc::new(StreamCoordinator::new(source, config)))
            .collect();

        info!(sources = coordinators.len(), "stream group ready");
        Ok(Self {
            coordinators,
            drain_timeout: config.drain_timeout(),
        })
    }

    /// Wrap already-built coordinators
    pub fn from_coordinators(
        coordinators: impl IntoIterator<Item = StreamCoordinator<S>>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            coordinators: coordinators.into_iter().map(Arc::new).collect(),
            drain_timeout: config.drain_timeout(),
        }
    }

    /// Source ids in group order
    pub fn source_ids(&self) -> Vec<&str> {
        self.coordinators.iter().map(|c| c.source_id()).collect()
    }

    /// Number of coordinators
    pub fn len(&self) -> usize {
        self.coordinators.len()
    }

    /// Whether the group is empty
    pub fn is_empty(&self) -> bool {
        self.coordinators.is_empty()
    }

    /// Stream every source concurrently into the same receivers
    ///
    /// Delivery tasks are started once for the whole group, so each receiver
    /// keeps a single consumer while all scans dispatch into it.
    ///
    /// # Errors
    /// The first error raised by any scan, transform or delivery.
    #[instrument(
        name = "stream_all",
        skip_all,
        fields(sources = self.coordinators.len(), receivers = receivers.len())
    )]
    pub async fn stream_all(
        &self,
        ctx: &CancellationToken,
        receivers: &[Arc<dyn Receiver>],
    ) -> Result<(), ContractError> {
        if ctx.is_cancelled() {
            debug!("cancelled before scan");
            return Ok(());
        }

        let scope = StreamScope::new(ctx);
        let receivers: Arc<[Arc<dyn Receiver>]> = receivers.into();
        let deliveries = DeliveryGroup::start(&scope, &receivers);

        let mut streams = JoinSet::new();
        for coordinator in &self.coordinators {
            let coordinator = Arc::clone(coordinator);
            let scope = Arc::clone(&scope);
            let receivers = Arc::clone(&receivers);
            streams.spawn(async move { coordinator.dispatch(&scope, &receivers).await });
        }

        while let Some(joined) = streams.join_next().await {
            if let Err(err) = joined {
                scope.task_failed("stream", err);
            }
        }

        scope.finish(deliveries, self.drain_timeout).await
    }
}
