//! Events emitted by the editor store
//!
//! The store reports every load, edit, save and run through an
//! [`EventSink`] so a host (UI bridge, logger, test) can follow along
//! without polling the store.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::dag::{DataId, ModuleId};
use crate::layout::LayoutDirection;

/// Trait for receiving editor events
///
/// This abstracts over the transport (UI channel, mpsc, ...).
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g., channel closed)
    fn send(&self, event: EditorEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

/// Events emitted by the editor store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    /// A DAG was fetched from the backend and rendered
    #[serde(rename_all = "camelCase")]
    DagLoaded {
        dag_name: String,
        modules: usize,
        data: usize,
    },

    /// A new, empty DAG was created in the backend
    #[serde(rename_all = "camelCase")]
    DagCreated { dag_name: String },

    /// A module was added with fresh data nodes
    #[serde(rename_all = "camelCase")]
    ModuleAdded {
        module_id: ModuleId,
        name: String,
    },

    /// Modules were deleted, along with the data nodes only they used
    #[serde(rename_all = "camelCase")]
    ModulesDeleted {
        module_ids: Vec<ModuleId>,
        data_ids: Vec<DataId>,
    },

    /// A dragged data node was folded into a compatible one
    #[serde(rename_all = "camelCase")]
    DataNodesMerged { dragged: DataId, target: DataId },

    /// The projection was laid out
    #[serde(rename_all = "camelCase")]
    LayoutApplied { direction: LayoutDirection },

    /// The DAG was persisted
    #[serde(rename_all = "camelCase")]
    DagSaved { dag_name: String },

    /// Persisting the DAG failed; the in-memory state stands
    #[serde(rename_all = "camelCase")]
    PersistFailed { dag_name: String, error: String },

    /// A run finished and its result was projected
    #[serde(rename_all = "camelCase")]
    RunCompleted {
        process_uuid: String,
        latency: f64,
    },

    /// The last run result was cleared
    ResultCleared,
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: EditorEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: Mutex<Vec<EditorEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<EditorEvent> {
        self.events.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: EditorEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_vec_sink_collects() {
        let sink = VecEventSink::new();
        sink.send(EditorEvent::ResultCleared).unwrap();
        sink.send(EditorEvent::LayoutApplied {
            direction: LayoutDirection::LeftToRight,
        })
        .unwrap();
        assert_eq!(sink.events().len(), 2);

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_event_serialization() {
        let (dragged, target) = (Uuid::new_v4(), Uuid::new_v4());
        let json = serde_json::to_value(EditorEvent::DataNodesMerged { dragged, target }).unwrap();
        assert_eq!(json["type"], "dataNodesMerged");
        assert_eq!(json["dragged"], dragged.to_string());

        let json = serde_json::to_value(EditorEvent::PersistFailed {
            dag_name: "d".to_string(),
            error: "down".to_string(),
        })
        .unwrap();
        assert_eq!(json["dagName"], "d");
    }
}
