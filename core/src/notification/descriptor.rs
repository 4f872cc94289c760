use super::{now_epoch_seconds, NotificationId, ScheduleTime, DATE_KEY, ID_KEY};
use crate::defaults::NotificationDefaults;
use crate::BridgeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// CALLER-SIDE DESCRIPTOR
// ============================================================================

/// A notification as supplied by the caller, before defaults are merged.
///
/// Keys are kept as raw JSON so platform-specific and unknown fields pass
/// through untouched. `date` is kept apart in its resolved form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Notification {
    fields: Map<String, Value>,
    date: Option<ScheduleTime>,
}

impl Notification {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object received at a host boundary.
    pub fn from_json(value: Value) -> Result<Self, BridgeError> {
        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(BridgeError::InvalidDescriptor(format!(
                "expected an object, got {}",
                other
            ))),
        }
    }

    pub fn from_map(mut fields: Map<String, Value>) -> Result<Self, BridgeError> {
        let date = match fields.remove(DATE_KEY) {
            Some(raw) => ScheduleTime::from_value(&raw)?,
            None => None,
        };
        if let Some(raw) = fields.get(ID_KEY) {
            NotificationId::from_value(raw)?;
        }
        Ok(Self { fields, date })
    }

    pub fn id(mut self, id: impl Into<NotificationId>) -> Self {
        let id: NotificationId = id.into();
        self.fields.insert(ID_KEY.to_string(), Value::from(id));
        self
    }

    pub fn message(self, message: impl Into<String>) -> Self {
        self.field("message", message.into())
    }

    pub fn title(self, title: impl Into<String>) -> Self {
        self.field("title", title.into())
    }

    pub fn badge(self, badge: i64) -> Self {
        self.field("badge", badge)
    }

    pub fn auto_cancel(self, auto_cancel: bool) -> Self {
        self.field("autoCancel", auto_cancel)
    }

    /// Opaque payload handed back in lifecycle events.
    pub fn json(self, json: impl Into<String>) -> Self {
        self.field("json", json.into())
    }

    pub fn repeat(self, repeat: impl Into<String>) -> Self {
        self.field("repeat", repeat.into())
    }

    pub fn sound(self, sound: impl Into<String>) -> Self {
        self.field("sound", sound.into())
    }

    pub fn date(mut self, date: impl Into<ScheduleTime>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Set any other field, e.g. `icon` or `wideImage`.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn scheduled_at(&self) -> Option<ScheduleTime> {
        self.date
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Fill a missing key. Returns `false` if the caller already set it.
    pub(crate) fn fill(&mut self, key: &str, value: &Value) -> bool {
        if self.fields.contains_key(key) {
            return false;
        }
        self.fields.insert(key.to_string(), value.clone());
        true
    }

    /// Merge with `defaults`, then pin `id` to text and `date` to epoch
    /// seconds (now when absent).
    pub fn normalize(
        self,
        defaults: &NotificationDefaults,
    ) -> Result<NormalizedNotification, BridgeError> {
        let Notification { mut fields, date } = defaults.merge(self);

        let id = match fields.remove(ID_KEY) {
            Some(raw) => NotificationId::from_value(&raw)?,
            None => None,
        }
        .or_else(|| defaults.id())
        .unwrap_or_else(NotificationId::fallback);

        // A raw `date` can only get here through `field()`.
        let date = match (date, fields.remove(DATE_KEY)) {
            (Some(date), _) => Some(date),
            (None, Some(raw)) => ScheduleTime::from_value(&raw)?,
            (None, None) => None,
        };
        let date = date
            .map(|d| d.epoch_seconds())
            .unwrap_or_else(now_epoch_seconds);

        Ok(NormalizedNotification { id, date, fields })
    }
}

// ============================================================================
// WIRE FORM
// ============================================================================

/// Descriptor as dispatched to the native executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedNotification {
    pub id: NotificationId,
    /// Epoch seconds.
    pub date: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl NormalizedNotification {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

// ============================================================================
// BATCHES
// ============================================================================

/// Caller-side `addMulti` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationBatch {
    pub notifications: Option<Vec<Notification>>,
    pub cancel_all: Option<bool>,
    /// Other batch-level options, forwarded untouched.
    pub extra: Map<String, Value>,
}

impl NotificationBatch {
    pub fn new(notifications: Vec<Notification>) -> Self {
        Self {
            notifications: Some(notifications),
            cancel_all: None,
            extra: Map::new(),
        }
    }

    pub fn cancel_all(mut self, cancel_all: bool) -> Self {
        self.cancel_all = Some(cancel_all);
        self
    }

    pub fn from_json(value: Value) -> Result<Self, BridgeError> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(BridgeError::InvalidDescriptor(format!(
                    "expected a batch object, got {}",
                    other
                )))
            }
        };

        let notifications = match map.remove("notifications") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(
                items
                    .into_iter()
                    .map(Notification::from_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(other) => {
                return Err(BridgeError::InvalidDescriptor(format!(
                    "notifications must be an array, got {}",
                    other
                )))
            }
        };

        let cancel_all = match map.remove("cancelAll") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(b)) => Some(b),
            Some(other) => {
                return Err(BridgeError::InvalidDescriptor(format!(
                    "cancelAll must be a boolean, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            notifications,
            cancel_all,
            extra: map,
        })
    }

    /// Normalize every element in order. `cancelAll` is only defaulted when
    /// notifications are present; an empty request is forwarded as is.
    pub fn normalize(self, defaults: &NotificationDefaults) -> Result<BatchRequest, BridgeError> {
        match self.notifications {
            Some(items) => {
                let notifications = items
                    .into_iter()
                    .map(|n| n.normalize(defaults))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(BatchRequest {
                    notifications: Some(notifications),
                    cancel_all: Some(self.cancel_all.unwrap_or(false)),
                    extra: self.extra,
                })
            }
            None => Ok(BatchRequest {
                notifications: None,
                cancel_all: self.cancel_all,
                extra: self.extra,
            }),
        }
    }
}

/// `addMulti` request as dispatched to the native executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<NormalizedNotification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_all: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
