// LocalNotify Core: notification bridge facade
//
// Normalizes notification descriptors, hands commands to the native
// executor and fans native lifecycle events out to listeners.

pub mod config;
pub mod defaults;
pub mod events;
pub mod executor;
pub mod facade;
pub mod notification;
pub mod platform;

use thiserror::Error;

pub use config::BridgeConfig;
pub use defaults::{DefaultsBuilder, NotificationDefaults};
pub use events::{AppState, EventKind, EventListeners, LifecycleEvent, ListenerId, NotificationListener};
pub use executor::{ChannelExecutor, Command, Dispatch, NativeExecutor, NativeReply, ReplyHandler, SERVICE_NAME};
pub use facade::LocalNotification;
pub use notification::{
    BatchRequest, NormalizedNotification, Notification, NotificationBatch, NotificationId,
    ScheduleTime,
};
pub use platform::Platform;

// ============================================================================
// THREADING MARKERS
// ============================================================================

/// `Send` on native targets. On wasm32 the collaborators hold JS values that
/// never leave the page thread, so no bound applies.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSend: Send {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + ?Sized> MaybeSend for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSend {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSend for T {}

/// `Send + Sync` on native targets, nothing on wasm32.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSendSync for T {}

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Invalid notification id: {0}")]
    InvalidId(String),
    #[error("Invalid notification date: {0}")]
    InvalidDate(String),
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("Unknown lifecycle event: {0}")]
    UnknownEvent(String),
    #[error("Unknown application state: {0}")]
    UnknownAppState(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
