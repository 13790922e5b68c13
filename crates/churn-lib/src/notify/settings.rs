//! Per-user notification preferences

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default probability at or above which an alert is raised
pub const DEFAULT_ALERT_THRESHOLD: f64 = 0.7;

fn default_threshold() -> f64 {
    DEFAULT_ALERT_THRESHOLD
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("threshold must be between 0 and 1, got {0}")]
    InvalidThreshold(f64),

    #[error("{0} is enabled but no destination was given")]
    MissingDestination(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default)]
    pub email_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default)]
    pub sms_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_ALERT_THRESHOLD)
    }
}

impl NotificationSettings {
    /// Both channels disabled
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            email_enabled: false,
            email_address: None,
            sms_enabled: false,
            phone_number: None,
            threshold,
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(SettingsError::InvalidThreshold(self.threshold));
        }
        if self.email_enabled && blank(&self.email_address) {
            return Err(SettingsError::MissingDestination("email"));
        }
        if self.sms_enabled && blank(&self.phone_number) {
            return Err(SettingsError::MissingDestination("sms"));
        }
        Ok(())
    }

    pub fn email_destination(&self) -> Option<&str> {
        destination(self.email_enabled, &self.email_address)
    }

    pub fn sms_destination(&self) -> Option<&str> {
        destination(self.sms_enabled, &self.phone_number)
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

fn destination(enabled: bool, value: &Option<String>) -> Option<&str> {
    if enabled && !blank(value) {
        value.as_deref().map(str::trim)
    } else {
        None
    }
}

/// Settings keyed by user id
#[derive(Debug)]
pub struct NotificationRegistry {
    settings: DashMap<String, NotificationSettings>,
    default_threshold: f64,
}

impl Default for NotificationRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_THRESHOLD)
    }
}

impl NotificationRegistry {
    pub fn new(default_threshold: f64) -> Self {
        Self {
            settings: DashMap::new(),
            default_threshold,
        }
    }

    /// Stored settings, or disabled channels at the default threshold
    pub fn get(&self, user_id: &str) -> NotificationSettings {
        self.settings
            .get(user_id)
            .map(|s| s.value().clone())
            .unwrap_or_else(|| NotificationSettings::with_threshold(self.default_threshold))
    }

    pub fn set(&self, user_id: &str, settings: NotificationSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.settings.insert(user_id.to_string(), settings);
        Ok(())
    }

    pub fn remove(&self, user_id: &str) -> Option<NotificationSettings> {
        self.settings.remove(user_id).map(|(_, s)| s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_defaults() {
        let settings: NotificationSettings = serde_json::from_value(json!({
            "emailEnabled": true,
            "emailAddress": "ops@example.com"
        }))
        .unwrap();
        assert_eq!(settings.threshold, DEFAULT_ALERT_THRESHOLD);
        assert!(!settings.sms_enabled);
        assert_eq!(settings.email_destination(), Some("ops@example.com"));
        assert_eq!(settings.sms_destination(), None);
    }

    #[test]
    fn test_validation() {
        let mut settings = NotificationSettings::default();
        settings.threshold = 1.5;
        assert_eq!(settings.validate(), Err(SettingsError::InvalidThreshold(1.5)));

        let mut settings = NotificationSettings::default();
        settings.sms_enabled = true;
        settings.phone_number = Some("  ".to_string());
        assert_eq!(settings.validate(), Err(SettingsError::MissingDestination("sms")));
    }

    #[test]
    fn test_registry_falls_back_to_default() {
        let registry = NotificationRegistry::new(0.9);
        assert_eq!(registry.get("nobody").threshold, 0.9);

        let settings = NotificationSettings {
            sms_enabled: true,
            phone_number: Some("+15550100".to_string()),
            ..Default::default()
        };
        registry.set("alice", settings.clone()).unwrap();
        assert_eq!(registry.get("alice"), settings);
        assert!(registry.remove("alice").is_some());
        assert_eq!(registry.get("alice").threshold, 0.9);
    }
}
