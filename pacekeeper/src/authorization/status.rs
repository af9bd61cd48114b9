//! Authorization status and request mode.

use serde::{Deserialize, Serialize};

/// Location permission status as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    #[default]
    NotDetermined,
    /// Updates allowed at any time, including in the background.
    AuthorizedAlways,
    /// Updates allowed while the application is in use.
    AuthorizedWhenInUse,
    /// The user refused location access.
    Denied,
    /// Location access is blocked by policy (parental controls, MDM).
    Restricted,
}

impl AuthorizationStatus {
    /// Whether updates may be generated.
    pub fn is_authorized(&self) -> bool {
        matches!(
            self,
            AuthorizationStatus::AuthorizedAlways | AuthorizationStatus::AuthorizedWhenInUse
        )
    }

    /// Short machine-friendly name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationStatus::NotDetermined => "not_determined",
            AuthorizationStatus::AuthorizedAlways => "authorized_always",
            AuthorizationStatus::AuthorizedWhenInUse => "authorized_when_in_use",
            AuthorizationStatus::Denied => "denied",
            AuthorizationStatus::Restricted => "restricted",
        }
    }
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which permission to ask the platform for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationMode {
    /// Foreground-only access.
    #[default]
    WhenInUse,
    /// Foreground and background access.
    Always,
}

impl AuthorizationMode {
    /// Whether `status` already satisfies this mode.
    pub fn is_satisfied_by(&self, status: AuthorizationStatus) -> bool {
        match self {
            AuthorizationMode::WhenInUse => status.is_authorized(),
            AuthorizationMode::Always => status == AuthorizationStatus::AuthorizedAlways,
        }
    }
}

impl std::fmt::Display for AuthorizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorizationMode::WhenInUse => write!(f, "when_in_use"),
            AuthorizationMode::Always => write!(f, "always"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_authorized() {
        assert!(AuthorizationStatus::AuthorizedAlways.is_authorized());
        assert!(AuthorizationStatus::AuthorizedWhenInUse.is_authorized());
        assert!(!AuthorizationStatus::NotDetermined.is_authorized());
        assert!(!AuthorizationStatus::Denied.is_authorized());
        assert!(!AuthorizationStatus::Restricted.is_authorized());
    }

    #[test]
    fn test_mode_satisfaction() {
        assert!(AuthorizationMode::WhenInUse.is_satisfied_by(AuthorizationStatus::AuthorizedAlways));
        assert!(!AuthorizationMode::Always.is_satisfied_by(AuthorizationStatus::AuthorizedWhenInUse));
        assert!(AuthorizationMode::Always.is_satisfied_by(AuthorizationStatus::AuthorizedAlways));
    }

    #[test]
    fn test_status_serde_names_match_display() {
        let json = serde_json::to_string(&AuthorizationStatus::AuthorizedWhenInUse).unwrap();
        assert_eq!(json, "\"authorized_when_in_use\"");
        let parsed: AuthorizationStatus = serde_json::from_str("\"denied\"").unwrap();
        assert_eq!(parsed, AuthorizationStatus::Denied);
    }
}
