// File: src/events.rs
//
// Interpreter event stream.
//
// Every run publishes an ordered sequence of events: Started, any number of
// Output/Error events, then exactly one terminal event (Completed or
// Cancelled). Each subscriber gets its own unbounded queue, so a slow
// consumer never loses events. The bus also keeps a bounded replay buffer,
// so a subscriber that attaches late still sees the recent history in order.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "message", rename_all = "snake_case")]
pub enum InterpreterEvent {
    Started,
    Output(String),
    Error(String),
    Completed,
    Cancelled,
}

impl InterpreterEvent {
    /// Completed and Cancelled end a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, InterpreterEvent::Completed | InterpreterEvent::Cancelled)
    }
}

impl fmt::Display for InterpreterEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InterpreterEvent::Started => write!(f, "started"),
            InterpreterEvent::Output(message) => write!(f, "output: {}", message),
            InterpreterEvent::Error(message) => write!(f, "error: {}", message),
            InterpreterEvent::Completed => write!(f, "completed"),
            InterpreterEvent::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Live events preceded by the replayed history
pub type EventStream = Pin<Box<dyn Stream<Item = InterpreterEvent> + Send>>;

struct State {
    history: VecDeque<InterpreterEvent>,
    subscribers: Vec<mpsc::UnboundedSender<InterpreterEvent>>,
}

struct Inner {
    state: Mutex<State>,
    capacity: usize,
}

/// Append-only, multi-consumer event broadcast. Clones share the same bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// `capacity` bounds the replay buffer; subscriber queues are unbounded
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        EventBus {
            inner: Arc::new(Inner {
                state: Mutex::new(State { history: VecDeque::with_capacity(capacity), subscribers: Vec::new() }),
                capacity,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish an event. Synchronous, so it cannot be interrupted halfway.
    pub fn emit(&self, event: InterpreterEvent) {
        // History and subscriber queues are updated under one lock so
        // subscribe() never sees an event twice or misses one.
        let mut state = self.lock();
        if state.history.len() == self.inner.capacity {
            state.history.pop_front();
        }
        state.history.push_back(event.clone());
        // Dropped streams are pruned here
        state.subscribers.retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    /// Snapshot of the replay buffer, oldest first
    pub fn history(&self) -> Vec<InterpreterEvent> {
        self.lock().history.iter().cloned().collect()
    }

    /// Number of open subscriber streams
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.lock();
        state.subscribers.retain(|subscriber| !subscriber.is_closed());
        state.subscribers.len()
    }

    /// Subscribe to the bus: buffered history first, then every live event
    pub fn subscribe(&self) -> EventStream {
        let mut state = self.lock();
        let replay: Vec<InterpreterEvent> = state.history.iter().cloned().collect();
        let live = Self::attach(&mut state);
        drop(state);

        Box::pin(tokio_stream::iter(replay).chain(live))
    }

    /// Subscribe to every event published from now on, without the replay
    pub fn subscribe_live(&self) -> EventStream {
        let live = Self::attach(&mut self.lock());
        Box::pin(live)
    }

    fn attach(state: &mut State) -> UnboundedReceiverStream<InterpreterEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        state.subscribers.push(sender);
        UnboundedReceiverStream::new(receiver)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new(crate::config::DEFAULT_EVENT_REPLAY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::AsyncRuntime;

    #[test]
    fn test_history_is_bounded() {
        let bus = EventBus::new(2);
        bus.emit(InterpreterEvent::Started);
        bus.emit(InterpreterEvent::Output("1".into()));
        bus.emit(InterpreterEvent::Completed);

        assert_eq!(
            bus.history(),
            vec![InterpreterEvent::Output("1".into()), InterpreterEvent::Completed]
        );
    }

    #[test]
    fn test_late_subscriber_gets_replay_then_live() {
        let bus = EventBus::new(16);
        bus.emit(InterpreterEvent::Started);
        bus.emit(InterpreterEvent::Output("a".into()));

        let mut stream = bus.subscribe();
        bus.emit(InterpreterEvent::Completed);

        let events = AsyncRuntime::block_on(async {
            let mut events = Vec::new();
            while let Some(event) = stream.next().await {
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    break;
                }
            }
            events
        });

        assert_eq!(
            events,
            vec![
                InterpreterEvent::Started,
                InterpreterEvent::Output("a".into()),
                InterpreterEvent::Completed,
            ]
        );
    }

    #[test]
    fn test_live_subscriber_skips_history() {
        let bus = EventBus::new(16);
        bus.emit(InterpreterEvent::Started);
        bus.emit(InterpreterEvent::Completed);

        let mut stream = bus.subscribe_live();
        bus.emit(InterpreterEvent::Started);
        bus.emit(InterpreterEvent::Cancelled);

        let first = AsyncRuntime::block_on(async { (stream.next().await, stream.next().await) });
        assert_eq!(first, (Some(InterpreterEvent::Started), Some(InterpreterEvent::Cancelled)));
    }

    #[test]
    fn test_slow_subscriber_receives_every_event() {
        let bus = EventBus::new(4);
        let mut live = bus.subscribe_live();
        let mut replayed = bus.subscribe();

        for i in 0..1000 {
            bus.emit(InterpreterEvent::Output(i.to_string()));
        }
        bus.emit(InterpreterEvent::Completed);

        let (live, replayed) = AsyncRuntime::block_on(async {
            let mut live_events = Vec::new();
            while let Some(event) = live.next().await {
                let terminal = event.is_terminal();
                live_events.push(event);
                if terminal {
                    break;
                }
            }
            let mut replayed_events = Vec::new();
            while let Some(event) = replayed.next().await {
                let terminal = event.is_terminal();
                replayed_events.push(event);
                if terminal {
                    break;
                }
            }
            (live_events, replayed_events)
        });

        assert_eq!(live.len(), 1001);
        assert_eq!(live[999], InterpreterEvent::Output("999".into()));
        assert_eq!(live, replayed);
        assert_eq!(bus.history().len(), 4);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new(4);
        let kept = bus.subscribe_live();
        let dropped = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(dropped);
        bus.emit(InterpreterEvent::Started);
        assert_eq!(bus.subscriber_count(), 1);

        drop(kept);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_clones_share_the_bus() {
        let bus = EventBus::new(4);
        let other = bus.clone();
        other.emit(InterpreterEvent::Cancelled);
        assert_eq!(bus.history(), vec![InterpreterEvent::Cancelled]);
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&InterpreterEvent::Output("19".into())).unwrap();
        assert_eq!(json, r#"{"event":"output","message":"19"}"#);

        let json = serde_json::to_string(&InterpreterEvent::Completed).unwrap();
        assert_eq!(json, r#"{"event":"completed"}"#);
    }

    #[test]
    fn test_terminal_events() {
        assert!(InterpreterEvent::Completed.is_terminal());
        assert!(InterpreterEvent::Cancelled.is_terminal());
        assert!(!InterpreterEvent::Error("x".into()).is_terminal());
    }
}
