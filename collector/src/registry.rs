use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use log::info;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::{
    error::Result,
    sink::SinkManager,
    worker::{InferenceWorker, TrainingWorker},
};

/// Key a client is tracked under: its peer address. Equality by value,
/// stable for the life of one connection session.
pub type ClientId = SocketAddr;

/// What the registry keeps per worker: the queue's sending end, used for
/// routing only. The worker task owns everything else.
pub(crate) struct WorkerEntry {
    pub(crate) queue: UnboundedSender<Value>,
}

/// One feed's entry map. Each worker holds a handle to its own feed's map
/// so it can erase its entry on teardown.
pub(crate) type FeedEntries = Arc<Mutex<HashMap<ClientId, WorkerEntry>>>;

/// Tracks the active worker per (client, feed), one map per feed kind.
///
/// Constructed once at startup and shared via `Arc`. The maps are touched
/// by exactly two parties: producers insert-if-absent, each worker removes
/// its own entry on teardown.
pub struct Registry {
    idle_timeout: Duration,
    sinks: SinkManager,
    training: FeedEntries,
    inference: FeedEntries,
}

impl Registry {
    /// Creates an empty registry.
    ///
    /// # Arguments
    /// * `idle_timeout` - How long a worker waits on its queue before it
    ///   assumes its client is gone.
    /// * `sinks` - Opens the per-client training sinks.
    pub fn new(idle_timeout: Duration, sinks: SinkManager) -> Self {
        Self {
            idle_timeout,
            sinks,
            training: FeedEntries::default(),
            inference: FeedEntries::default(),
        }
    }

    /// Returns the training queue for `client`, registering it first when
    /// absent: opens the sink pair, spawns the worker task and inserts the
    /// entry, all under the map lock so racing calls for one identity
    /// create exactly one worker.
    ///
    /// # Errors
    /// Fails if the sinks cannot be opened. No entry is left behind and a
    /// later attempt may succeed; other clients are unaffected.
    pub fn ensure_training(&self, client: ClientId) -> Result<UnboundedSender<Value>> {
        let mut map = self.training.lock();

        if let Some(entry) = map.get(&client) {
            return Ok(entry.queue.clone());
        }

        let sinks = self.sinks.open(client)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = TrainingWorker::new(
            client,
            sinks,
            Arc::clone(&self.training),
            self.idle_timeout,
        );
        tokio::spawn(worker.run(rx));

        map.insert(client, WorkerEntry { queue: tx.clone() });
        info!(feed = "training"; "client registered: {client}");

        Ok(tx)
    }

    /// Returns the inference queue for `client`, registering it first when
    /// absent. No sinks on this path.
    pub fn ensure_inference(&self, client: ClientId) -> UnboundedSender<Value> {
        let mut map = self.inference.lock();

        if let Some(entry) = map.get(&client) {
            return entry.queue.clone();
        }

        let (tx, rx) = mpsc::unbounded_channel();

        let worker = InferenceWorker::new(client, Arc::clone(&self.inference), self.idle_timeout);
        tokio::spawn(worker.run(rx));

        map.insert(client, WorkerEntry { queue: tx.clone() });
        info!(feed = "inference"; "client registered: {client}");

        tx
    }

    /// Pure read: the training queue for `client`, if registered.
    pub fn lookup_training(&self, client: &ClientId) -> Option<UnboundedSender<Value>> {
        self.training.lock().get(client).map(|e| e.queue.clone())
    }

    /// Pure read: the inference queue for `client`, if registered.
    pub fn lookup_inference(&self, client: &ClientId) -> Option<UnboundedSender<Value>> {
        self.inference.lock().get(client).map(|e| e.queue.clone())
    }

    /// Erases `client`'s training entry. Workers do this themselves once
    /// their sinks are closed; a no-op when the entry is already gone.
    pub fn remove_training(&self, client: &ClientId) {
        self.training.lock().remove(client);
    }

    /// Erases `client`'s inference entry. Worker-teardown counterpart of
    /// [`Registry::remove_training`].
    pub fn remove_inference(&self, client: &ClientId) {
        self.inference.lock().remove(client);
    }

    /// Number of registered training workers.
    pub fn training_len(&self) -> usize {
        self.training.lock().len()
    }

    /// Number of registered inference workers.
    pub fn inference_len(&self) -> usize {
        self.inference.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const IDLE: Duration = Duration::from_secs(5);

    fn client(port: u16) -> ClientId {
        ClientId::from(([127, 0, 0, 1], port))
    }

    fn registry(dir: &TempDir) -> Registry {
        Registry::new(IDLE, SinkManager::new(dir.path()))
    }

    #[tokio::test]
    async fn test_ensure_training_reuses_existing_entry() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        registry.ensure_training(client(1)).unwrap();
        registry.ensure_training(client(1)).unwrap();

        assert_eq!(registry.training_len(), 1);
        // One sink pair, not two.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_feeds_are_independent() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        registry.ensure_training(client(1)).unwrap();
        registry.ensure_inference(client(1));

        assert_eq!(registry.training_len(), 1);
        assert_eq!(registry.inference_len(), 1);

        // Inference registration opens no sinks.
        registry.ensure_inference(client(2));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_remove_is_noop_for_absent_entry() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        registry.remove_training(&client(9));
        registry.remove_inference(&client(9));

        assert_eq!(registry.training_len(), 0);
        assert_eq!(registry.inference_len(), 0);
    }

    #[tokio::test]
    async fn test_sink_failure_aborts_registration_only() {
        let dir = TempDir::new().unwrap();
        let blocked = dir.path().join("taken");
        fs::write(&blocked, b"").unwrap();

        let registry = Registry::new(IDLE, SinkManager::new(&blocked));

        assert!(registry.ensure_training(client(1)).is_err());
        assert_eq!(registry.training_len(), 0);

        // The inference path has no sinks and keeps working.
        registry.ensure_inference(client(1));
        assert_eq!(registry.inference_len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_racing_registrations_create_one_worker() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(registry(&dir));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(
                async move { registry.ensure_training(client(1)) },
            ));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(registry.training_len(), 1);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
