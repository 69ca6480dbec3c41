//! Event stream synchronizer
//!
//! An [`EventSubscription`] keeps at most one open channel for its current
//! `(agent_id, enabled, event types)` key and feeds every parsed event,
//! in arrival order, to a single callback. It also exposes connection health
//! and the most recent event. Nothing else is buffered.
//!
//! Lifecycle:
//!
//! ```text
//! update(opts) ──key changed──▶ close old channel ──active?──▶ spawn reader
//! reader: connect ─ok─▶ connected=true ─▶ frames… ─error/end─▶ connected=false
//!            ▲                                                   │
//!            └──────────────── reconnect delay ◀─────────────────┘
//! close() ─▶ cancel reader, connected=false (idempotent)
//! ```

use crate::stream::EventConnector;
use futures::StreamExt;
use hive_core::{AgentEvent, ErrorKind, EventFilter};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Receives each event synchronously; the next frame is not read until it returns.
pub type EventCallback = Arc<dyn Fn(&AgentEvent) + Send + Sync>;

const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// What to subscribe to. Two options are equal when agent, enabled flag and
/// the *set* of event types match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionOptions {
    pub agent_id: Option<String>,
    pub event_types: EventFilter,
    pub enabled: bool,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            agent_id: None,
            event_types: EventFilter::all(),
            enabled: true,
        }
    }
}

impl SubscriptionOptions {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            ..Default::default()
        }
    }

    pub fn with_types(mut self, event_types: EventFilter) -> Self {
        self.event_types = event_types;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// A channel is only opened while enabled and addressed to an agent.
    pub fn is_active(&self) -> bool {
        self.enabled
            && self
                .agent_id
                .as_deref()
                .is_some_and(|id| !id.trim().is_empty())
    }
}

#[derive(Default)]
struct ChannelState {
    /// Bumped on every close; a reader whose generation is stale must not touch state.
    generation: u64,
    connected: bool,
    last_event: Option<AgentEvent>,
}

struct Shared {
    state: Mutex<ChannelState>,
    callback: RwLock<EventCallback>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_connected(&self, generation: u64, connected: bool) -> bool {
        let mut state = self.state();
        if state.generation != generation {
            return false;
        }
        state.connected = connected;
        true
    }

    fn deliver(&self, generation: u64, event: AgentEvent) -> bool {
        {
            let mut state = self.state();
            if state.generation != generation {
                return false;
            }
            state.last_event = Some(event.clone());
        }
        let callback = self
            .callback
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        callback(&event);
        true
    }
}

struct ChannelHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the single live channel of one logical subscription.
pub struct EventSubscription {
    connector: Arc<dyn EventConnector>,
    shared: Arc<Shared>,
    options: Option<SubscriptionOptions>,
    channel: Option<ChannelHandle>,
    reconnect_delay: Duration,
}

impl EventSubscription {
    pub fn new(connector: Arc<dyn EventConnector>, callback: EventCallback) -> Self {
        Self {
            connector,
            shared: Arc::new(Shared {
                state: Mutex::new(ChannelState::default()),
                callback: RwLock::new(callback),
            }),
            options: None,
            channel: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Apply new options. Re-opens the channel only when the subscription key
    /// changed; returns whether it did. Must be called inside a Tokio runtime.
    pub fn update(&mut self, options: SubscriptionOptions) -> bool {
        if self.options.as_ref() == Some(&options) {
            return false;
        }
        self.close_channel();
        if options.is_active() {
            self.open(&options);
        }
        self.options = Some(options);
        true
    }

    /// Release the channel. Safe to call any number of times.
    pub fn close(&mut self) {
        self.close_channel();
    }

    /// Swap the callback without touching the channel.
    pub fn set_callback(&self, callback: EventCallback) {
        *self
            .shared
            .callback
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = callback;
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state().connected
    }

    pub fn last_event(&self) -> Option<AgentEvent> {
        self.shared.state().last_event.clone()
    }

    pub fn options(&self) -> Option<&SubscriptionOptions> {
        self.options.as_ref()
    }

    /// Whether a reader task currently owns a channel (connected or retrying).
    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    fn open(&mut self, options: &SubscriptionOptions) {
        let Some(agent_id) = options.agent_id.clone() else {
            return;
        };
        let generation = self.shared.state().generation;
        let cancel = CancellationToken::new();
        let reader = Reader {
            connector: self.connector.clone(),
            shared: self.shared.clone(),
            agent_id,
            filter: options.event_types.clone(),
            generation,
            cancel: cancel.clone(),
            reconnect_delay: self.reconnect_delay,
        };
        let task = tokio::spawn(reader.run());
        self.channel = Some(ChannelHandle { cancel, task });
    }

    fn close_channel(&mut self) {
        {
            let mut state = self.shared.state();
            state.generation += 1;
            state.connected = false;
        }
        if let Some(handle) = self.channel.take() {
            handle.cancel.cancel();
            handle.task.abort();
            if let Some(agent_id) = self.options.as_ref().and_then(|o| o.agent_id.as_deref()) {
                info!("Closed event stream for agent {}", agent_id);
            }
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.close_channel();
    }
}

struct Reader {
    connector: Arc<dyn EventConnector>,
    shared: Arc<Shared>,
    agent_id: String,
    filter: EventFilter,
    generation: u64,
    cancel: CancellationToken,
    reconnect_delay: Duration,
}

impl Reader {
    async fn run(self) {
        loop {
            let connected = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = self.connector.connect(&self.agent_id, &self.filter) => result,
            };

            match connected {
                Ok(mut frames) => {
                    if !self.shared.set_connected(self.generation, true) {
                        return;
                    }
                    info!("Event stream connected for agent {}", self.agent_id);

                    loop {
                        let next = tokio::select! {
                            _ = self.cancel.cancelled() => return,
                            next = frames.next() => next,
                        };
                        match next {
                            Some(Ok(frame)) => match AgentEvent::parse(&frame) {
                                Ok(event) => {
                                    if !self.shared.deliver(self.generation, event) {
                                        return;
                                    }
                                }
                                Err(e) => debug!("Discarding stream frame: {}", e),
                            },
                            Some(Err(e)) => {
                                warn!("Event stream error for agent {}: {}", self.agent_id, e);
                                break;
                            }
                            None => {
                                debug!("Event stream ended for agent {}", self.agent_id);
                                break;
                            }
                        }
                    }

                    if !self.shared.set_connected(self.generation, false) {
                        return;
                    }
                }
                Err(e) => {
                    if !self.shared.set_connected(self.generation, false) {
                        return;
                    }
                    if e.kind() != ErrorKind::Transport {
                        // Rejected by the server: retrying would be rejected again.
                        warn!("Event stream refused for agent {}: {}", self.agent_id, e);
                        return;
                    }
                    warn!("Event stream connect failed for agent {}: {}", self.agent_id, e);
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }
}

/// A callback that forwards every event into an unbounded channel, for
/// consumers that prefer to `await` events instead of handling them inline.
pub fn channel_callback() -> (EventCallback, mpsc::UnboundedReceiver<AgentEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback: EventCallback = Arc::new(move |event: &AgentEvent| {
        let _ = tx.send(event.clone());
    });
    (callback, rx)
}
