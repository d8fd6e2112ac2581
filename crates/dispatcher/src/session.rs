//! Shared state of one stream call: failure slot, tokens, delivery tasks

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use contracts::{CancellationToken, ContractError, Receiver};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, info_span, warn, Instrument};

/// First-error-wins slot
///
/// Recording an error cancels the run. A consequential error (a producer
/// that lost its receiver) is replaced by the error that caused it.
#[derive(Debug, Default)]
pub(crate) struct FailureSlot {
    first: Mutex<Option<ContractError>>,
}

impl FailureSlot {
    fn is_consequence(err: &ContractError) -> bool {
        matches!(
            err,
            ContractError::ReceiverClosed { .. } | ContractError::Cancelled
        )
    }

    /// Store `err` unless a root error is already present
    pub(crate) fn record(&self, err: ContractError) {
        let mut first = self.first.lock().unwrap_or_else(PoisonError::into_inner);
        match first.as_ref() {
            None => *first = Some(err),
            Some(existing) if Self::is_consequence(existing) && !Self::is_consequence(&err) => {
                debug!(replaced = %existing, error = %err, "root error supersedes consequence");
                *first = Some(err);
            }
            Some(_) => debug!(error = %err, "later error ignored"),
        }
    }

    /// Whether any error was recorded
    pub(crate) fn is_set(&self) -> bool {
        self.first
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn take(&self) -> Option<ContractError> {
        self.first
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Scope shared by every task of one `stream` / `stream_all` call
#[derive(Debug)]
pub(crate) struct StreamScope {
    /// Caller's token
    caller: CancellationToken,
    /// Cancelled by the caller or by the first failure
    run: CancellationToken,
    failure: FailureSlot,
}

impl StreamScope {
    pub(crate) fn new(caller: &CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            caller: caller.clone(),
            run: caller.child_token(),
            failure: FailureSlot::default(),
        })
    }

    pub(crate) fn run_token(&self) -> &CancellationToken {
        &self.run
    }

    /// Record a failure and cancel the run
    pub(crate) fn fail(&self, err: ContractError) {
        self.failure.record(err);
        self.run.cancel();
    }

    /// Record a panicked or otherwise failed task join
    pub(crate) fn task_failed(&self, what: &str, err: JoinError) {
        if err.is_panic() {
            self.fail(ContractError::Other(format!("{what} task panicked")));
        }
    }

    /// Stop deliveries and resolve the call's result
    ///
    /// Caller cancellation wins over any recorded error.
    pub(crate) async fn finish(
        &self,
        deliveries: DeliveryGroup,
        drain_timeout: Duration,
    ) -> Result<(), ContractError> {
        deliveries.stop(self, drain_timeout).await;

        if self.caller.is_cancelled() {
            info!("stream cancelled by caller");
            return Ok(());
        }
        match self.failure.take() {
            Some(err) => {
                observability::record_stream_error(&err);
                Err(err)
            }
            None => Ok(()),
        }
    }
}

/// One long-lived delivery task per receiver
pub(crate) struct DeliveryGroup {
    stop: CancellationToken,
    tasks: JoinSet<()>,
}

impl DeliveryGroup {
    /// Spawn `send` once for every distinct receiver
    ///
    /// A receiver listed more than once still gets a single delivery loop;
    /// dispatch fans out per list entry and both hand-offs land in that loop.
    pub(crate) fn start(scope: &Arc<StreamScope>, receivers: &[Arc<dyn Receiver>]) -> Self {
        let stop = scope.run.child_token();
        let mut tasks = JoinSet::new();

        let mut distinct: Vec<&Arc<dyn Receiver>> = Vec::with_capacity(receivers.len());
        for receiver in receivers {
            if !distinct.iter().any(|seen| Arc::ptr_eq(*seen, receiver)) {
                distinct.push(receiver);
            }
        }

        for receiver in distinct {
            let receiver = Arc::clone(receiver);
            let scope = Arc::clone(scope);
            let stop = stop.clone();
            let span = info_span!("delivery", receiver = %receiver.identifier());

            tasks.spawn(
                async move {
                    match receiver.send(&stop).await {
                        Err(err) => scope.fail(err),
                        Ok(()) if !stop.is_cancelled() => scope.fail(ContractError::delivery(
                            receiver.identifier(),
                            "delivery loop exited before the stream finished",
                        )),
                        Ok(()) => {}
                    }
                }
                .instrument(span),
            );
        }

        debug!(receivers = tasks.len(), "delivery tasks started");
        Self { stop, tasks }
    }

    /// Signal every delivery loop to stop and wait for them
    async fn stop(mut self, scope: &StreamScope, drain_timeout: Duration) {
        self.stop.cancel();

        let tasks = &mut self.tasks;
        let drained = tokio::time::timeout(drain_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(err) = joined {
                    scope.task_failed("delivery", err);
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = self.tasks.len(),
                timeout_ms = drain_timeout.as_millis() as u64,
                "delivery tasks did not stop in time, aborting"
            );
            self.tasks.abort_all();
            if !scope.run.is_cancelled() {
                scope.fail(ContractError::Other(format!(
                    "delivery tasks did not stop within {}ms",
                    drain_timeout.as_millis()
                )));
            }
        }
    }
}

/// Wait for dispatch tasks
///
/// Waits for all of them while the run is live; once it is cancelled the
/// remaining wait is bounded by `drain_timeout`, after which the rest are
/// aborted.
pub(crate) async fn settle(tasks: &mut JoinSet<()>, scope: &StreamScope, drain_timeout: Duration) {
    loop {
        tokio::select! {
            biased;
            _ = scope.run.cancelled() => break,
            joined = tasks.join_next() => match joined {
                None => return,
                Some(Err(err)) => scope.task_failed("dispatch", err),
                Some(Ok(())) => {}
            },
        }
    }

    let drained = tokio::time::timeout(drain_timeout, async {
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                scope.task_failed("dispatch", err);
            }
        }
    })
    .await;

    if drained.is_err() {
        warn!(
            remaining = tasks.len(),
            "dispatch tasks still running after drain timeout, aborting"
        );
        tasks.abort_all();
    }
}
