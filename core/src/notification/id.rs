use crate::BridgeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Id of a pending notification, always carried as text.
///
/// Numbers and booleans coming from a JSON boundary are stringified the
/// way a JS `toString()` would render an integer; structured values are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Id used when neither the descriptor nor the defaults carry one.
    pub const FALLBACK: &'static str = "0";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn fallback() -> Self {
        Self(Self::FALLBACK.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Normalize a raw JSON id. `null` means "not supplied".
    pub fn from_value(value: &Value) -> Result<Option<Self>, BridgeError> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(Self(s.clone()))),
            Value::Number(n) => Ok(Some(Self(render_number(n)))),
            Value::Bool(b) => Ok(Some(Self(b.to_string()))),
            other => Err(BridgeError::InvalidId(other.to_string())),
        }
    }
}

/// Render a JSON number the way JS `Number.prototype.toString` does for the
/// ids hosts send: whole floats below 1e21 print without a fraction.
fn render_number(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{}", f),
        _ => n.to_string(),
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NotificationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for NotificationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<&NotificationId> for NotificationId {
    fn from(id: &NotificationId) -> Self {
        id.clone()
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for NotificationId {
                fn from(id: $ty) -> Self {
                    Self(id.to_string())
                }
            }
        )*
    };
}

impl_from_integer!(i32, i64, u32, u64, usize);

impl From<NotificationId> for Value {
    fn from(id: NotificationId) -> Self {
        Value::String(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_ids_are_stringified() {
        assert_eq!(NotificationId::from(42u32).as_str(), "42");
        assert_eq!(NotificationId::from(-3i64).as_str(), "-3");
        assert_eq!(
            NotificationId::from_value(&json!(7)).unwrap(),
            Some(NotificationId::new("7"))
        );
    }

    #[test]
    fn test_zero_is_still_an_id() {
        assert_eq!(
            NotificationId::from_value(&json!(0)).unwrap(),
            Some(NotificationId::new("0"))
        );
    }

    #[test]
    fn test_whole_float_ids_render_like_integers() {
        let id = |v: Value| NotificationId::from_value(&v).unwrap().unwrap().into_string();
        assert_eq!(id(json!(42.0)), "42");
        assert_eq!(id(json!(-7.0)), "-7");
        assert_eq!(id(json!(-0.0)), "0");
        assert_eq!(id(json!(1e20)), "100000000000000000000");
        assert_eq!(id(json!(1.5)), "1.5");
        assert_eq!(id(json!(1e21)), "1e+21");
    }

    #[test]
    fn test_null_means_absent() {
        assert_eq!(NotificationId::from_value(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_structured_ids_rejected() {
        assert!(matches!(
            NotificationId::from_value(&json!({"a": 1})),
            Err(BridgeError::InvalidId(_))
        ));
        assert!(NotificationId::from_value(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let encoded = serde_json::to_string(&NotificationId::new("abc")).unwrap();
        assert_eq!(encoded, "\"abc\"");
    }
}
