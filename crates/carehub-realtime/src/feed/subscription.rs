//! Scoped ownership of a live feed.
//!
//! A [`FeedSubscription`] is created by [`SyncEngine::subscribe`] and owns
//! the consumer task for one UI context. Teardown (explicit or on drop)
//! closes the dispatch gate before anything else, so once it returns no
//! alert is raised and no pull is scheduled by this subscription.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::alert::{Alert, AlertSink};
use crate::metrics::SyncMetrics;
use crate::sync::engine::SyncEngine;

use super::{FeedEvent, FeedStream};

/// Tuning for a feed subscription.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionOptions {
    /// Raise a "missed updates" alert when events were dropped due to lag.
    pub alert_on_lagged: bool,
}

/// Open/closed switch checked under a lock around every dispatch.
#[derive(Debug)]
struct DispatchGate {
    open: Mutex<bool>,
}

impl DispatchGate {
    fn new() -> Self {
        Self {
            open: Mutex::new(true),
        }
    }

    /// Run `f` if the gate is open. Returns `false` once closed.
    fn dispatch(&self, f: impl FnOnce()) -> bool {
        let open = self.open.lock().unwrap_or_else(|e| e.into_inner());
        if *open {
            f();
        }
        *open
    }

    /// Close the gate, waiting for any dispatch in progress.
    fn close(&self) {
        *self.open.lock().unwrap_or_else(|e| e.into_inner()) = false;
    }

    fn is_open(&self) -> bool {
        *self.open.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Owned handle to one live feed subscription.
///
/// Dropping the handle tears the subscription down.
#[derive(Debug)]
pub struct FeedSubscription {
    /// Subscribed table.
    table: String,
    /// Guards alert and pull dispatch.
    gate: Arc<DispatchGate>,
    /// Stops the consumer task and releases the upstream feed.
    cancel: CancellationToken,
    /// Set when the upstream feed closed on its own.
    feed_closed: Arc<AtomicBool>,
    /// Consumer task.
    task: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    /// Start consuming `stream`: every insert visible to the engine's table
    /// raises an alert and schedules a pull.
    pub(crate) fn spawn(
        table: &str,
        stream: FeedStream,
        engine: Arc<SyncEngine>,
        alerts: Arc<dyn AlertSink>,
        options: SubscriptionOptions,
    ) -> Self {
        let gate = Arc::new(DispatchGate::new());
        let cancel = stream.release.clone();
        let feed_closed = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(consume(
            stream,
            Arc::clone(&gate),
            Arc::clone(&feed_closed),
            engine,
            alerts,
            options,
        ));

        info!(table, "Live feed subscribed");

        Self {
            table: table.to_string(),
            gate,
            cancel,
            feed_closed,
            task: Some(task),
        }
    }

    /// Subscribed table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Whether the subscription is still delivering events.
    pub fn is_active(&self) -> bool {
        self.gate.is_open() && !self.feed_closed.load(Ordering::SeqCst)
    }

    /// Whether the upstream feed closed by itself (it is not reconnected).
    pub fn feed_closed(&self) -> bool {
        self.feed_closed.load(Ordering::SeqCst)
    }

    /// Tear the subscription down now.
    pub fn unsubscribe(mut self) {
        self.teardown();
    }

    /// Tear down and wait for the consumer task to finish.
    pub async fn shutdown(mut self) {
        self.teardown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn teardown(&mut self) {
        if !self.gate.is_open() {
            return;
        }
        self.gate.close();
        self.cancel.cancel();
        if let Some(task) = &self.task {
            task.abort();
        }
        info!(table = %self.table, "Live feed unsubscribed");
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn consume(
    mut stream: FeedStream,
    gate: Arc<DispatchGate>,
    feed_closed: Arc<AtomicBool>,
    engine: Arc<SyncEngine>,
    alerts: Arc<dyn AlertSink>,
    options: SubscriptionOptions,
) {
    let metrics = Arc::clone(engine.metrics());
    let recipient = engine.table().recipient();

    loop {
        let received = tokio::select! {
            _ = stream.release.cancelled() => break,
            received = stream.events.recv() => received,
        };

        let dispatched = match received {
            Ok(FeedEvent::Inserted { table, record }) => {
                SyncMetrics::inc(&metrics.events_received);
                if !record.is_visible_to(recipient) {
                    debug!(notification_id = %record.id, "Live insert for another user ignored");
                    continue;
                }
                debug!(table = %table, notification_id = %record.id, "Live insert received");
                let alert = Alert::from_notification(&record);
                gate.dispatch(|| {
                    alerts.alert(alert);
                    SyncMetrics::inc(&metrics.alerts_raised);
                    engine.request_pull();
                })
            }
            Err(RecvError::Lagged(missed)) => {
                metrics.events_lagged.fetch_add(missed, Ordering::Relaxed);
                warn!(missed, "Live feed lagged; scheduling a pull to catch up");
                gate.dispatch(|| {
                    if options.alert_on_lagged {
                        alerts.alert(Alert::missed(missed));
                        SyncMetrics::inc(&metrics.alerts_raised);
                    }
                    engine.request_pull();
                })
            }
            Err(RecvError::Closed) => {
                feed_closed.store(true, Ordering::SeqCst);
                warn!("Live feed closed upstream; not reconnecting");
                break;
            }
        };

        if !dispatched {
            break;
        }
    }

    debug!("Live feed consumer stopped");
}
