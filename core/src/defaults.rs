//! Default notification settings
//!
//! An immutable value produced by `DefaultsBuilder`. The facade keeps the
//! current snapshot and swaps in a new one on `set_defaults` or when the
//! platform becomes known.
//!
//! Schema rule: overrides only touch keys that already exist. Platform
//! augmentation is the only way the key set grows, and it always runs after
//! the overrides collected so far.

use crate::notification::{Notification, NotificationId, ID_KEY};
use crate::platform::Platform;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NotificationDefaults {
    values: Map<String, Value>,
}

impl NotificationDefaults {
    pub fn builder() -> DefaultsBuilder {
        DefaultsBuilder::new()
    }

    fn base() -> Map<String, Value> {
        let mut values = Map::new();
        values.insert("message".to_string(), Value::from(""));
        values.insert("title".to_string(), Value::from(""));
        values.insert("autoCancel".to_string(), Value::Bool(false));
        values.insert("badge".to_string(), Value::from(0));
        values.insert(ID_KEY.to_string(), Value::from(NotificationId::FALLBACK));
        values.insert("json".to_string(), Value::from(""));
        values.insert("repeat".to_string(), Value::from(""));
        values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Default id, if the current default is representable as one.
    pub fn id(&self) -> Option<NotificationId> {
        self.values
            .get(ID_KEY)
            .and_then(|raw| NotificationId::from_value(raw).ok().flatten())
    }

    /// Copy with `overrides` applied to keys already in the schema.
    pub fn with_overrides(&self, overrides: &Map<String, Value>) -> Self {
        let mut values = self.values.clone();
        for (key, slot) in values.iter_mut() {
            if let Some(value) = overrides.get(key) {
                *slot = value.clone();
            }
        }
        for key in overrides.keys().filter(|k| !self.values.contains_key(*k)) {
            tracing::debug!(key = %key, "ignoring override for unknown default");
        }
        Self { values }
    }

    /// Copy extended with the platform's extra fields.
    pub fn with_platform(&self, platform: &Platform) -> Self {
        let mut values = self.values.clone();
        for (key, value) in platform.default_fields() {
            values.insert(key.to_string(), value);
        }
        Self { values }
    }

    /// Fill every default key the notification lacks. Caller values win and
    /// keys outside the schema are left alone.
    pub fn merge(&self, mut notification: Notification) -> Notification {
        for (key, value) in &self.values {
            notification.fill(key, value);
        }
        notification
    }
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            values: Self::base(),
        }
    }
}

// ============================================================================
// BUILDER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct DefaultsBuilder {
    overrides: Map<String, Value>,
    platform: Option<Platform>,
}

impl DefaultsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    pub fn overrides(mut self, overrides: &Map<String, Value>) -> Self {
        for (key, value) in overrides {
            self.overrides.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn build(self) -> NotificationDefaults {
        let defaults = NotificationDefaults::default().with_overrides(&self.overrides);
        match self.platform {
            Some(platform) => defaults.with_platform(&platform),
            None => defaults,
        }
    }
}
