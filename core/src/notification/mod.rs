//! Notification descriptors and their normalized wire form
//!
//! - `NotificationId`: text id, the only id shape that reaches the executor
//! - `ScheduleTime`: tagged point-in-time resolved to epoch seconds
//! - `Notification` / `NotificationBatch`: caller-side descriptors
//! - `NormalizedNotification` / `BatchRequest`: what `add` / `addMulti` dispatch

pub mod descriptor;
pub mod id;
pub mod schedule;

pub use descriptor::{BatchRequest, NormalizedNotification, Notification, NotificationBatch};
pub use id::NotificationId;
pub use schedule::{now_epoch_seconds, ScheduleTime};

/// Descriptor keys with special handling during normalization.
pub const ID_KEY: &str = "id";
pub const DATE_KEY: &str = "date";
