//! Session context
//!
//! Load-at-init / save-on-change wrapper over the local store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::store::{keys, LocalStore, StoreResult};
use crate::api::{ApiError, DetectionResult};

/// Color theme preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    /// Anything other than an explicit `"light"` reads as dark
    fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("light") => Theme::Light,
            _ => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("Unknown theme: {} (expected dark or light)", other)),
        }
    }
}

/// Who is signed in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user_email: Option<String>,
    pub theme: Theme,
}

/// Alerting preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preferences {
    /// Ask the server to email on high-probability detections
    pub email_alerts: bool,
    /// Show notices for detection outcomes
    pub notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            email_alerts: true,
            notifications: false,
        }
    }
}

/// Session state bound to its backing store
#[derive(Debug)]
pub struct SessionContext {
    store: LocalStore,
    session: Session,
    preferences: Preferences,
}

impl SessionContext {
    /// Read session and preferences from the store
    pub fn load(store: LocalStore) -> Self {
        let non_empty = |key: &str| {
            store
                .get(key)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let session = Session {
            token: non_empty(keys::TOKEN),
            user_email: non_empty(keys::USER_EMAIL),
            theme: Theme::from_stored(store.get(keys::THEME)),
        };

        let preferences = Preferences {
            email_alerts: store
                .get(keys::EMAIL_ALERTS)
                .filter(|v| !v.is_empty())
                .map(|v| v == "true")
                .unwrap_or(true),
            notifications: store.get(keys::NOTIFICATIONS) == Some("true"),
        };

        tracing::debug!(
            signed_in = session.token.is_some(),
            theme = %session.theme,
            "Session loaded"
        );

        Self {
            store,
            session,
            preferences,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences
    }

    pub fn token(&self) -> Option<&str> {
        self.session.token.as_deref()
    }

    /// Token, or [`ApiError::MissingToken`] when signed out
    pub fn require_token(&self) -> Result<&str, ApiError> {
        self.token().ok_or(ApiError::MissingToken)
    }

    pub fn user_email(&self) -> Option<&str> {
        self.session.user_email.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.token.is_some()
    }

    pub fn theme(&self) -> Theme {
        self.session.theme
    }

    /// Record a successful login
    pub fn sign_in(&mut self, email: &str, token: &str) -> StoreResult<()> {
        self.store.apply([
            (keys::TOKEN, Some(token.to_string())),
            (keys::USER_EMAIL, Some(email.to_string())),
        ])?;
        self.session.token = Some(token.to_string());
        self.session.user_email = Some(email.to_string());

        tracing::info!(email = %email, "Signed in");
        Ok(())
    }

    /// Drop token and email. Theme, preferences and the last result stay.
    pub fn sign_out(&mut self) -> StoreResult<()> {
        self.store
            .apply([(keys::TOKEN, None), (keys::USER_EMAIL, None)])?;
        self.session.token = None;
        self.session.user_email = None;

        tracing::info!("Signed out");
        Ok(())
    }

    pub fn set_theme(&mut self, theme: Theme) -> StoreResult<()> {
        self.store.set(keys::THEME, theme.as_str())?;
        self.session.theme = theme;
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> StoreResult<Theme> {
        let theme = self.session.theme.toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }

    pub fn set_email_alerts(&mut self, enabled: bool) -> StoreResult<()> {
        self.store.set(keys::EMAIL_ALERTS, enabled.to_string())?;
        self.preferences.email_alerts = enabled;
        Ok(())
    }

    pub fn set_notifications(&mut self, enabled: bool) -> StoreResult<()> {
        self.store.set(keys::NOTIFICATIONS, enabled.to_string())?;
        self.preferences.notifications = enabled;
        Ok(())
    }

    /// Replace the stored result with `result`
    pub fn record_detection(&mut self, result: &DetectionResult) -> StoreResult<()> {
        let json = serde_json::to_string(result)?;
        self.store.apply([
            (keys::LAST_DETECTION, Some(json.clone())),
            (keys::LAST_DETECTION_RESULTS, Some(json)),
        ])
    }

    /// Most recent batch result; an unreadable entry counts as none
    pub fn last_detection(&self) -> Option<DetectionResult> {
        let raw = self
            .store
            .get(keys::LAST_DETECTION)
            .or_else(|| self.store.get(keys::LAST_DETECTION_RESULTS))?;

        let parsed = serde_json::from_str(raw).and_then(DetectionResult::from_value);
        match parsed {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable stored detection result");
                None
            }
        }
    }
}
