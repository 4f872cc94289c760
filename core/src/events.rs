//! Lifecycle events reported by the native side
//!
//! The native executor reports add confirmations, triggers, taps and
//! dismissals. Any number of listeners may subscribe, optionally filtered
//! by event kind.

use crate::notification::NotificationId;
use crate::{BridgeError, MaybeSendSync};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// EVENT TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A notification was scheduled.
    Add,
    /// A batch was scheduled; the event id is unset.
    AddMulti,
    /// A notification fired.
    Trigger,
    /// The user tapped a notification.
    Click,
    /// A notification was cancelled or dismissed.
    Cancel,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Add,
        EventKind::AddMulti,
        EventKind::Trigger,
        EventKind::Click,
        EventKind::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::AddMulti => "addmulti",
            Self::Trigger => "trigger",
            Self::Click => "click",
            Self::Cancel => "cancel",
        }
    }

    /// Name of the page-side hook (`onclick`, ...).
    pub fn hook_name(&self) -> &'static str {
        match self {
            Self::Add => "onadd",
            Self::AddMulti => "onaddmulti",
            Self::Trigger => "ontrigger",
            Self::Click => "onclick",
            Self::Cancel => "oncancel",
        }
    }
}

impl FromStr for EventKind {
    type Err = BridgeError;

    /// Accepts both `click` and `onclick`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let name = lower.strip_prefix("on").unwrap_or(&lower);
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| BridgeError::UnknownEvent(s.to_string()))
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the app was in front when the event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Foreground,
    Background,
}

impl AppState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Foreground => "foreground",
            Self::Background => "background",
        }
    }
}

impl FromStr for AppState {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "foreground" => Ok(Self::Foreground),
            "background" => Ok(Self::Background),
            other => Err(BridgeError::UnknownAppState(other.to_string())),
        }
    }
}

impl std::fmt::Display for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    #[serde(rename = "event")]
    pub kind: EventKind,
    pub id: NotificationId,
    pub state: AppState,
    /// The descriptor's opaque `json` payload.
    #[serde(default)]
    pub json: String,
}

impl LifecycleEvent {
    pub fn new(
        kind: EventKind,
        id: impl Into<NotificationId>,
        state: AppState,
        json: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            id: id.into(),
            state,
            json: json.into(),
        }
    }

    /// Build from the raw strings a native hook call carries.
    pub fn from_hook(hook: &str, id: &str, state: &str, json: &str) -> Result<Self, BridgeError> {
        Ok(Self {
            kind: hook.parse()?,
            id: NotificationId::new(id),
            state: state.parse()?,
            json: json.to_string(),
        })
    }
}

// ============================================================================
// LISTENERS
// ============================================================================

pub trait NotificationListener: MaybeSendSync {
    fn on_event(&self, event: &LifecycleEvent);
}

impl<F> NotificationListener for F
where
    F: Fn(&LifecycleEvent) + MaybeSendSync,
{
    fn on_event(&self, event: &LifecycleEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn from_u64(raw: u64) -> Self {
        Self(raw)
    }
}

#[derive(Clone)]
struct Registration {
    id: ListenerId,
    kind: Option<EventKind>,
    listener: Arc<dyn NotificationListener>,
}

/// Listener registry.
///
/// `emit` snapshots matching listeners before calling them, so a listener
/// may subscribe, unsubscribe or call back into the facade.
#[derive(Default)]
pub struct EventListeners {
    next_id: AtomicU64,
    registrations: RwLock<Vec<Registration>>,
}

impl EventListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register for `kind`, or for every event when `kind` is `None`.
    pub fn subscribe(
        &self,
        kind: Option<EventKind>,
        listener: Arc<dyn NotificationListener>,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registrations.write().push(Registration { id, kind, listener });
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut registrations = self.registrations.write();
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }

    pub fn clear(&self) {
        self.registrations.write().clear();
    }

    pub fn len(&self) -> usize {
        self.registrations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.read().is_empty()
    }

    /// Deliver `event`; returns how many listeners saw it.
    pub fn emit(&self, event: &LifecycleEvent) -> usize {
        let matching: Vec<Arc<dyn NotificationListener>> = self
            .registrations
            .read()
            .iter()
            .filter(|r| r.kind.map_or(true, |kind| kind == event.kind))
            .map(|r| Arc::clone(&r.listener))
            .collect();

        tracing::debug!(
            event = %event.kind,
            id = %event.id,
            listeners = matching.len(),
            "delivering lifecycle event"
        );

        for listener in &matching {
            listener.on_event(event);
        }
        matching.len()
    }
}

impl std::fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListeners")
            .field("listeners", &self.len())
            .finish()
    }
}
