//! Graph mutation events
//!
//! Every store mutation emits a one-way notification for external observers
//! (audit log, UI). Events carry the affected id and the relevant old/new
//! edge sets. Emission is fire-and-forget over a broadcast channel: if no
//! observer is subscribed the event is dropped, and observers that fall
//! behind lose the oldest events. Nothing feeds back into graph state.

use tokio::sync::broadcast;
use tracing::trace;

/// Default buffered capacity per subscriber.
const EVENT_CAPACITY: usize = 256;

/// A structural change to the dependency graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// A node was admitted to the graph.
    IndicatorAdded {
        id: String,
        dependencies: Vec<String>,
    },

    /// A node was removed and detached from all neighbors.
    IndicatorRemoved {
        id: String,
        dependencies: Vec<String>,
        dependents: Vec<String>,
    },

    /// A node's dependency set was replaced.
    DependenciesUpdated {
        id: String,
        old_dependencies: Vec<String>,
        new_dependencies: Vec<String>,
    },
}

/// Broadcast fan-out for [`GraphEvent`]s.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<GraphEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Subscribe to future mutation events.
    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all current subscribers.
    pub(crate) fn emit(&self, event: GraphEvent) {
        trace!(?event, "graph event");
        // send() errors only when there are no receivers; that is fine here.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_receives_emitted_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(GraphEvent::IndicatorAdded {
            id: "rsi".to_string(),
            dependencies: vec!["close".to_string()],
        });

        let event = rx.try_recv().unwrap();
        assert_eq!(
            event,
            GraphEvent::IndicatorAdded {
                id: "rsi".to_string(),
                dependencies: vec!["close".to_string()],
            }
        );
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        let bus = EventBus::new();

        // Must not panic or block.
        bus.emit(GraphEvent::IndicatorRemoved {
            id: "rsi".to_string(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
        });
    }
}
