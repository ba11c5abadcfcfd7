//! Background persistence of the edited DAG
//!
//! Structural edits hand a snapshot of the DAG to a [`SaveQueue`] and carry
//! on. A single worker task drains the queue in order, so a later snapshot
//! never lands before an earlier one, and reports every outcome through
//! the event sink.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::backend::DagBackend;
use crate::dag::DagSpec;
use crate::events::{EditorEvent, EventSink};

enum SaveJob {
    Save { dag_name: String, dag: DagSpec },
    Flush(oneshot::Sender<()>),
}

/// Ordered queue of DAG saves served by one worker task
///
/// The worker is spawned on the current tokio runtime when the queue is
/// created and stops once the queue is dropped and drained.
pub struct SaveQueue {
    tx: mpsc::UnboundedSender<SaveJob>,
}

impl SaveQueue {
    /// Start a worker saving through `backend`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(backend: Arc<dyn DagBackend>, events: Arc<dyn EventSink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run(rx, backend, events));
        Self { tx }
    }

    /// Queue a snapshot of `dag` for saving under `dag_name`
    pub fn enqueue(&self, dag_name: &str, dag: &DagSpec) {
        let job = SaveJob::Save {
            dag_name: dag_name.to_string(),
            dag: dag.clone(),
        };
        if self.tx.send(job).is_err() {
            log::warn!("Save worker stopped, dropping save of '{}'", dag_name);
        }
    }

    /// Resolves once every save queued so far has been attempted
    pub fn flushed(&self) -> oneshot::Receiver<()> {
        let (ack, done) = oneshot::channel();
        if self.tx.send(SaveJob::Flush(ack)).is_err() {
            log::warn!("Save worker stopped before flush");
        }
        done
    }

    async fn run(
        mut rx: mpsc::UnboundedReceiver<SaveJob>,
        backend: Arc<dyn DagBackend>,
        events: Arc<dyn EventSink>,
    ) {
        while let Some(job) = rx.recv().await {
            match job {
                SaveJob::Save { dag_name, dag } => {
                    let event = match backend.save_dag(&dag_name, &dag).await {
                        Ok(()) => {
                            log::info!("Saved DAG '{}'", dag_name);
                            EditorEvent::DagSaved { dag_name }
                        }
                        Err(e) => {
                            log::warn!("Failed to save DAG '{}': {}", dag_name, e);
                            EditorEvent::PersistFailed {
                                dag_name,
                                error: e.to_string(),
                            }
                        }
                    };
                    if let Err(e) = events.send(event) {
                        log::warn!("Dropped editor event: {}", e);
                    }
                }
                SaveJob::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
        log::debug!("Save worker finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::builder::{DagBuilder, ModuleSpecBuilder};
    use crate::events::VecEventSink;

    #[tokio::test]
    async fn test_saves_land_in_order() {
        let backend = Arc::new(MemoryBackend::new());
        let events = Arc::new(VecEventSink::new());
        let queue = SaveQueue::spawn(backend.clone(), events.clone());

        let last = DagBuilder::new("d")
            .add_module(ModuleSpecBuilder::new("m").build())
            .build();
        queue.enqueue("d", &DagSpec::empty());
        queue.enqueue("d", &last);
        queue.flushed().await.unwrap();

        assert_eq!(backend.stored("d"), Some(last));
        assert_eq!(backend.save_count(), 2);
        assert_eq!(events.events().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_save_is_reported() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_fail_saves(true);
        let events = Arc::new(VecEventSink::new());
        let queue = SaveQueue::spawn(backend.clone(), events.clone());

        queue.enqueue("d", &DagSpec::empty());
        queue.flushed().await.unwrap();

        assert!(backend.stored("d").is_none());
        assert!(matches!(
            events.events().as_slice(),
            [EditorEvent::PersistFailed { dag_name, .. }] if dag_name == "d"
        ));
    }
}
