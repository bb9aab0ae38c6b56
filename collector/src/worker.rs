//! The per-client consumer loops, one task per (client, feed).

use std::time::Duration;

use log::{debug, info, warn};
use serde_json::Value;
use tokio::{sync::mpsc::UnboundedReceiver, time::timeout};

use crate::{
    record::{self, RECORD_SCHEMA, SensorType},
    registry::{ClientId, FeedEntries},
    sink::SinkSet,
};

/// Lifecycle of one feed worker. Terminal once `Terminated`; a client that
/// comes back gets a brand-new worker, never this one again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Active,
    Draining,
    Terminated,
}

/// Consumer loop bound to one (client, training) pair.
///
/// Owns its sink pair exclusively, so the validate-route-write sequence is
/// serialized by ownership alone.
pub struct TrainingWorker {
    client: ClientId,
    sinks: Option<SinkSet>,
    entries: FeedEntries,
    idle_timeout: Duration,
    state: WorkerState,
}

impl TrainingWorker {
    pub(crate) fn new(
        client: ClientId,
        sinks: SinkSet,
        entries: FeedEntries,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            client,
            sinks: Some(sinks),
            entries,
            idle_timeout,
            state: WorkerState::Active,
        }
    }

    /// Dequeues records until the idle timeout fires or a terminate
    /// sentinel arrives, then tears down. Records from one client are
    /// processed strictly in arrival order.
    pub(crate) async fn run(mut self, mut queue: UnboundedReceiver<Value>) {
        while self.state == WorkerState::Active {
            match timeout(self.idle_timeout, queue.recv()).await {
                Ok(Some(record)) => self.process(record),
                // Timed out with nothing queued: the client is assumed
                // gone. The designed teardown path, not an error.
                Err(_) => {
                    debug!("idle timeout for {} (training)", self.client);
                    self.state = WorkerState::Draining;
                }
                // Queue closed; nothing more can arrive.
                Ok(None) => self.state = WorkerState::Draining,
            }
        }

        self.teardown();
    }

    fn process(&mut self, record: Value) {
        if !record::validate(&record, RECORD_SCHEMA) {
            debug!("dropping record with missing fields from {}", self.client);
            return;
        }

        match SensorType::of(&record) {
            SensorType::Terminate => {
                debug!("terminate sentinel from {}", self.client);
                self.state = WorkerState::Draining;
            }
            sensor @ (SensorType::Accelerometer | SensorType::Gyroscope) => {
                let Some(sinks) = self.sinks.as_mut() else {
                    return;
                };

                if let Err(e) = sinks.append(sensor, &record::csv_row(&record)) {
                    warn!("failed to append row for {}: {e}", self.client);
                }
            }
            SensorType::Unknown => {
                debug!("ignoring unknown sensor type from {}", self.client);
            }
        }
    }

    /// Draining → Terminated. Sinks close before the registry entry goes
    /// away, so no reader can observe an entry whose sinks are closed.
    fn teardown(&mut self) {
        if let Some(sinks) = self.sinks.take() {
            if let Err(e) = sinks.close() {
                warn!("failed to close sinks for {}: {e}", self.client);
            }
        }

        self.entries.lock().remove(&self.client);
        self.state = WorkerState::Terminated;
        info!("client disconnected: {} feed=training", self.client);
    }
}

/// Consumer loop bound to one (client, inference) pair.
///
/// Evaluation is not implemented: records are dequeued and dropped. The
/// idle timeout is the only teardown trigger on this path; terminate
/// sentinels are treated as data and ignored.
pub struct InferenceWorker {
    client: ClientId,
    entries: FeedEntries,
    idle_timeout: Duration,
    state: WorkerState,
}

impl InferenceWorker {
    pub(crate) fn new(client: ClientId, entries: FeedEntries, idle_timeout: Duration) -> Self {
        Self {
            client,
            entries,
            idle_timeout,
            state: WorkerState::Active,
        }
    }

    pub(crate) async fn run(mut self, mut queue: UnboundedReceiver<Value>) {
        while self.state == WorkerState::Active {
            match timeout(self.idle_timeout, queue.recv()).await {
                Ok(Some(_record)) => {
                    // TODO: feed the record to the model once an inference
                    // backend exists.
                    debug!("inference record from {} dropped", self.client);
                }
                Err(_) | Ok(None) => self.state = WorkerState::Draining,
            }
        }

        self.entries.lock().remove(&self.client);
        self.state = WorkerState::Terminated;
        info!("client disconnected: {} feed=inference", self.client);
    }
}
