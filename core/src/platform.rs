//! Host platform detection
//!
//! The host reports a platform identifier (`device.platform` on Cordova-style
//! shells) once it is ready. The identifier decides which extra default
//! fields exist and whether `add` expects a structured reply.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Android,
    Ios,
    /// Windows Phone 7
    WinCe,
    /// Windows Phone 8
    Win32Nt,
    /// Anything else; gets no platform defaults.
    Other(String),
}

impl Platform {
    pub fn from_identifier(identifier: &str) -> Self {
        match identifier {
            "Android" => Self::Android,
            "iOS" => Self::Ios,
            "WinCE" => Self::WinCe,
            "Win32NT" => Self::Win32Nt,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            Self::Android => "Android",
            Self::Ios => "iOS",
            Self::WinCe => "WinCE",
            Self::Win32Nt => "Win32NT",
            Self::Other(id) => id,
        }
    }

    /// Default fields this platform adds on top of the base set.
    pub fn default_fields(&self) -> Vec<(&'static str, Value)> {
        match self {
            Self::Android => vec![
                ("icon", Value::from("icon")),
                ("smallIcon", Value::Null),
                ("ongoing", Value::Bool(false)),
                ("sound", Value::from("TYPE_NOTIFICATION")),
            ],
            Self::Ios => vec![("sound", Value::from(""))],
            Self::WinCe | Self::Win32Nt => vec![
                ("smallImage", Value::Null),
                ("image", Value::Null),
                ("wideImage", Value::Null),
            ],
            Self::Other(_) => Vec::new(),
        }
    }

    /// Windows Phone shells cannot call back into the page directly, so
    /// their `add` reply carries the lifecycle event to deliver.
    pub fn uses_structured_add_reply(&self) -> bool {
        matches!(self, Self::WinCe | Self::Win32Nt)
    }
}

impl FromStr for Platform {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_identifier(s))
    }
}

impl From<String> for Platform {
    fn from(identifier: String) -> Self {
        Self::from_identifier(&identifier)
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        platform.identifier().to_string()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_round_trip() {
        for id in ["Android", "iOS", "WinCE", "Win32NT", "browser"] {
            assert_eq!(Platform::from_identifier(id).identifier(), id);
        }
        assert_eq!(Platform::from_identifier("iOS"), Platform::Ios);
        assert_eq!(
            "windows".parse::<Platform>().unwrap(),
            Platform::Other("windows".to_string())
        );
    }

    #[test]
    fn test_android_fields() {
        let fields = Platform::Android.default_fields();
        let keys: Vec<_> = fields.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["icon", "smallIcon", "ongoing", "sound"]);
        assert_eq!(fields[3].1, Value::from("TYPE_NOTIFICATION"));
    }

    #[test]
    fn test_unknown_platform_adds_nothing() {
        assert!(Platform::Other("blackberry10".into()).default_fields().is_empty());
    }

    #[test]
    fn test_structured_reply_only_on_windows_phone() {
        assert!(Platform::WinCe.uses_structured_add_reply());
        assert!(Platform::Win32Nt.uses_structured_add_reply());
        assert!(!Platform::Android.uses_structured_add_reply());
        assert!(!Platform::Ios.uses_structured_add_reply());
        assert!(!Platform::Other("browser".into()).uses_structured_add_reply());
    }

    #[test]
    fn test_serde_uses_identifier() {
        let encoded = serde_json::to_string(&Platform::Win32Nt).unwrap();
        assert_eq!(encoded, "\"Win32NT\"");
        let decoded: Platform = serde_json::from_str("\"iOS\"").unwrap();
        assert_eq!(decoded, Platform::Ios);
    }
}
