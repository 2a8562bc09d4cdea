//! Structured email address records.

use serde::{Deserialize, Serialize};

/// One parsed address.
///
/// Which fields are present depends on the grammar that matched:
/// - `"user@domain.com"` → `email`
/// - `"Juan García <juan@ejemplo.com>"` → `full_name`, `email`
/// - `"\"Doe, John\" <john@doe.com>"` → `last_name`, `first_name`, `full_name`, `email`
/// - `"Undisclosed recipients"` → `full_name` only
///
/// A record without `email` is valid (suppressed recipients, name-only entries).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl AddressRecord {
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn with_name(full_name: impl Into<String>) -> Self {
        Self {
            full_name: Some(full_name.into()),
            ..Self::default()
        }
    }

    /// `true` when no field is populated.
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.full_name.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
    }

    /// Look up a sub-value by its field-map key (`"email"`, `"full name"`, …).
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "email" => self.email.as_deref(),
            "full name" => self.full_name.as_deref(),
            "first name" => self.first_name.as_deref(),
            "last name" => self.last_name.as_deref(),
            _ => None,
        }
    }

    /// Populated `(key, value)` pairs in a fixed order.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("first name", self.first_name.as_deref()),
            ("last name", self.last_name.as_deref()),
            ("full name", self.full_name.as_deref()),
            ("email", self.email.as_deref()),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect()
    }

    /// Format for display: `"Full Name <email>"`, or whichever part exists.
    pub fn display(&self) -> String {
        match (&self.full_name, &self.email) {
            (Some(name), Some(email)) => format!("{name} <{email}>"),
            (None, Some(email)) => email.clone(),
            (Some(name), None) => name.clone(),
            (None, None) => String::new(),
        }
    }
}

impl std::fmt::Display for AddressRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_name() {
        let addr = AddressRecord {
            email: Some("alice@example.com".to_string()),
            full_name: Some("Alice".to_string()),
            ..Default::default()
        };
        assert_eq!(addr.display(), "Alice <alice@example.com>");
    }

    #[test]
    fn test_display_without_name() {
        assert_eq!(
            AddressRecord::with_email("alice@example.com").display(),
            "alice@example.com"
        );
        assert_eq!(AddressRecord::with_name("Nobody").display(), "Nobody");
    }

    #[test]
    fn test_get_and_entries() {
        let addr = AddressRecord {
            email: Some("john.doe@foo.com".to_string()),
            full_name: Some("John Doe".to_string()),
            first_name: Some("John".to_string()),
            last_name: Some("Doe".to_string()),
        };
        assert_eq!(addr.get("first name"), Some("John"));
        assert_eq!(addr.get("nickname"), None);
        let keys: Vec<_> = addr.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["first name", "last name", "full name", "email"]);
    }

    #[test]
    fn test_empty() {
        assert!(AddressRecord::default().is_empty());
        assert!(!AddressRecord::with_name("x").is_empty());
    }
}
