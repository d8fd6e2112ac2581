//! StreamCoordinator - drives one source scan and fans records out to receivers

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    CancellationToken, ContractError, DispatchConfig, Receiver, Record, RecordHandler,
    RecordSource,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, debug_span, info, instrument, trace, Instrument};

use crate::session::{settle, DeliveryGroup, StreamScope};

/// Coordinates one record source against a set of receivers
///
/// Every record becomes one dispatch task per receiver. At most
/// `max_in_flight` dispatch tasks run at once; the scan waits for a free
/// slot before spawning the next one.
#[derive(Debug)]
pub struct StreamCoordinator<S> {
    source: S,
    max_in_flight: usize,
    drain_timeout: Duration,
}

impl<S> StreamCoordinator<S>
where
    S: RecordSource + Send + Sync + 'static,
{
    /// Create a coordinator over `source`
    pub fn new(source: S, config: &DispatchConfig) -> Self {
        Self {
            source,
            max_in_flight: config.max_in_flight.clamp(1, Semaphore::MAX_PERMITS),
            drain_timeout: config.drain_timeout(),
        }
    }

    /// Identifier of the wrapped source
    pub fn source_id(&self) -> &str {
        self.source.source_id()
    }

    /// Concurrency cap for dispatch tasks
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Scan the source and deliver every record to every receiver
    ///
    /// Starts one delivery task per receiver for the duration of the call.
    /// Returns `Ok(())` when the source is exhausted and everything was
    /// delivered, or when `ctx` is cancelled.
    ///
    /// # Errors
    /// The first scan, transform or delivery error.
    #[instrument(
        name = "stream",
        skip(self, ctx, receivers),
        fields(source_id = %self.source.source_id(), receivers = receivers.len())
    )]
    pub async fn stream(
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

        self.dispatch(&scope, &receivers).await;

        scope.finish(deliveries, self.drain_timeout).await
    }

    /// Run the scan inside an existing scope
    ///
    /// Failures are recorded in the scope; returns once every dispatch task
    /// spawned by this scan has settled.
    pub(crate) async fn dispatch(
        &self,
        scope: &Arc<StreamScope>,
        receivers: &Arc<[Arc<dyn Receiver>]>,
    ) {
        let mut handler = DispatchHandler {
            scope,
            receivers,
            limiter: Arc::new(Semaphore::new(self.max_in_flight)),
            max_in_flight: self.max_in_flight,
            tasks: JoinSet::new(),
            scanned: 0,
        };

        info!(source_id = %self.source.source_id(), "scan started");
        if let Err(err) = self.source.scan(scope.run_token(), &mut handler).await {
            scope.fail(err);
        }

        let scanned = handler.scanned;
        settle(&mut handler.tasks, scope, self.drain_timeout).await;
        observability::record_dispatch_in_flight(0);
        info!(source_id = %self.source.source_id(), scanned, "scan finished");
    }
}

/// Per-record callback handed to the source
struct DispatchHandler<'a> {
    scope: &'a Arc<StreamScope>,
    receivers: &'a Arc<[Arc<dyn Receiver>]>,
    limiter: Arc<Semaphore>,
    max_in_flight: usize,
    tasks: JoinSet<()>,
    scanned: u64,
}

impl DispatchHandler<'_> {
    fn reap_finished(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(err) = joined {
                self.scope.task_failed("dispatch", err);
            }
        }
    }
}

impl RecordHandler for DispatchHandler<'_> {
    async fn on_record(&mut self, record: Record) -> Result<(), ContractError> {
        self.scanned += 1;
        self.reap_finished();

        let receivers = self.receivers;
        for receiver in receivers.iter() {
            let acquired = tokio::select! {
                biased;
                _ = self.scope.run_token().cancelled() => return Ok(()),
                acquired = Arc::clone(&self.limiter).acquire_owned() => acquired,
            };
            let permit = acquired
                .map_err(|_| ContractError::Other("dispatch limiter closed".to_string()))?;
            observability::record_dispatch_in_flight(
                self.max_in_flight - self.limiter.available_permits(),
            );

            let receiver = Arc::clone(receiver);
            let scope = Arc::clone(self.scope);
            let payload = record.payload.clone();
            let span = debug_span!(
                "dispatch",
                receiver = %receiver.identifier(),
                source_id = %record.source_id,
                sequence_number = record.sequence_number
            );

            self.tasks.spawn(
                async move {
                    let _permit = permit;
                    if let Err(err) = deliver(receiver.as_ref(), payload, scope.run_token()).await {
                        scope.fail(err);
                    }
                }
                .instrument(span),
            );
        }
        Ok(())
    }
}

/// One (record, receiver) unit of work
async fn deliver(
    receiver: &dyn Receiver,
    payload: Bytes,
    run: &CancellationToken,
) -> Result<(), ContractError> {
    observability::record_record_dispatched(receiver.identifier());

    let payload = if receiver.needs_transform() {
        match receiver.transform(&payload)? {
            Some(transformed) => transformed,
            None => {
                observability::record_record_filtered(receiver.identifier());
                trace!("record filtered out");
                return Ok(());
            }
        }
    } else {
        payload
    };

    tokio::select! {
        biased;
        _ = run.cancelled() => Ok(()),
        handed_off = receiver.enqueue(payload) => handed_off,
    }
}
