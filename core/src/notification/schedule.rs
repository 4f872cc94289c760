use crate::BridgeError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use web_time::SystemTime;

/// When a notification should fire.
///
/// Resolved to integer epoch seconds before dispatch. Structured values are
/// rounded to the nearest second (half up).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleTime {
    /// Already an epoch-seconds timestamp; passed through as is.
    EpochSeconds(i64),
    /// A structured point in time.
    At(DateTime<Utc>),
}

impl ScheduleTime {
    pub fn now() -> Self {
        Self::EpochSeconds(now_epoch_seconds())
    }

    pub fn epoch_seconds(&self) -> i64 {
        match self {
            Self::EpochSeconds(secs) => *secs,
            Self::At(at) => round_millis(at.timestamp_millis()),
        }
    }

    /// Resolve a JSON boundary value.
    ///
    /// Accepts `null` (not supplied), an integral number of epoch seconds,
    /// or an RFC 3339 string. Everything else is rejected.
    pub fn from_value(value: &Value) -> Result<Option<Self>, BridgeError> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => {
                if let Some(secs) = n.as_i64() {
                    return Ok(Some(Self::EpochSeconds(secs)));
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(Some(Self::EpochSeconds(f as i64)))
                    }
                    _ => Err(BridgeError::InvalidDate(format!(
                        "{} is not a whole number of seconds",
                        n
                    ))),
                }
            }
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|at| Some(Self::At(at.with_timezone(&Utc))))
                .map_err(|e| BridgeError::InvalidDate(format!("{:?}: {}", s, e))),
            other => Err(BridgeError::InvalidDate(format!(
                "unsupported date shape: {}",
                other
            ))),
        }
    }
}

impl From<i64> for ScheduleTime {
    fn from(secs: i64) -> Self {
        Self::EpochSeconds(secs)
    }
}

impl From<DateTime<Utc>> for ScheduleTime {
    fn from(at: DateTime<Utc>) -> Self {
        Self::At(at)
    }
}

/// Current time in epoch seconds. Uses `web_time` so it also works on wasm32.
pub fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| round_millis(d.as_millis() as i64))
        .unwrap_or(0)
}

fn round_millis(millis: i64) -> i64 {
    millis.saturating_add(500).div_euclid(1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_structured_time_to_epoch_seconds() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(ScheduleTime::At(at).epoch_seconds(), 1_704_067_200);
    }

    #[test]
    fn test_rounds_half_up() {
        let at = Utc.timestamp_millis_opt(1_704_067_200_500).unwrap();
        assert_eq!(ScheduleTime::At(at).epoch_seconds(), 1_704_067_201);

        let at = Utc.timestamp_millis_opt(1_704_067_200_499).unwrap();
        assert_eq!(ScheduleTime::At(at).epoch_seconds(), 1_704_067_200);

        // JS Math.round(-1.5) === -1
        let at = Utc.timestamp_millis_opt(-1_500).unwrap();
        assert_eq!(ScheduleTime::At(at).epoch_seconds(), -1);
    }

    #[test]
    fn test_boundary_shapes() {
        assert_eq!(ScheduleTime::from_value(&Value::Null).unwrap(), None);
        assert_eq!(
            ScheduleTime::from_value(&json!(1_704_067_200)).unwrap(),
            Some(ScheduleTime::EpochSeconds(1_704_067_200))
        );
        assert_eq!(
            ScheduleTime::from_value(&json!(1_704_067_200.0)).unwrap(),
            Some(ScheduleTime::EpochSeconds(1_704_067_200))
        );

        let parsed = ScheduleTime::from_value(&json!("2024-01-01T00:00:00Z"))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.epoch_seconds(), 1_704_067_200);
    }

    #[test]
    fn test_rejects_other_shapes() {
        for bad in [json!(1.5), json!(true), json!([1]), json!({"time": 1}), json!("tomorrow")] {
            assert!(
                matches!(ScheduleTime::from_value(&bad), Err(BridgeError::InvalidDate(_))),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn test_now_is_close_to_system_clock() {
        let expected = Utc::now().timestamp();
        assert!((now_epoch_seconds() - expected).abs() <= 1);
    }
}
