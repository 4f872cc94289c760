//! Bridge configuration
//!
//! Serialized as JSON:
//!
//! ```json
//! { "service": "LocalNotification", "platform": "Android", "defaults": { "title": "Reminders" } }
//! ```

use crate::executor::SERVICE_NAME;
use crate::platform::Platform;
use crate::BridgeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Service name executors address commands to.
    pub service: String,

    /// Known platform; when set the facade is ready as soon as it is built.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    /// Default overrides, applied before platform augmentation.
    pub defaults: Map<String, Value>,

    /// Whether the native side implements `isScheduled` / `getScheduledIds`.
    #[serde(rename = "queryCommands")]
    pub query_commands: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            platform: None,
            defaults: Map::new(),
            query_commands: false,
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.service.trim().is_empty() {
            return Err(BridgeError::Config("service name must not be empty".into()));
        }
        if self.defaults.contains_key("date") {
            return Err(BridgeError::Config(
                "date cannot have a default; it is resolved per notification".into(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, BridgeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn save(&self, path: &Path) -> Result<(), BridgeError> {
        self.validate()?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config = BridgeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.service, "LocalNotification");
    }

    #[test]
    fn test_parse_full() {
        let config = BridgeConfig::from_json_str(
            r#"{"service": "Notifier", "platform": "iOS", "defaults": {"badge": 1}}"#,
        )
        .unwrap();
        assert_eq!(config.service, "Notifier");
        assert_eq!(config.platform, Some(Platform::Ios));
        assert_eq!(config.defaults.get("badge"), Some(&Value::from(1)));
        assert!(!config.query_commands);

        let config = BridgeConfig::from_json_str(r#"{"queryCommands": true}"#).unwrap();
        assert!(config.query_commands);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            BridgeConfig::from_json_str(r#"{"service": " "}"#),
            Err(BridgeError::Config(_))
        ));
        assert!(BridgeConfig::from_json_str(r#"{"defaults": {"date": 0}}"#).is_err());
        assert!(matches!(
            BridgeConfig::from_json_str("not json"),
            Err(BridgeError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let missing = Path::new("/nonexistent/localnotify/config.json");
        assert!(matches!(BridgeConfig::load(missing), Err(BridgeError::Io(_))));
    }
}
