//! User domain entity

use chrono::{DateTime, Utc};

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Admin,
    Operator,
    Driver,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Operator => "OPERATOR",
            Self::Driver => "DRIVER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Self::Admin),
            "OPERATOR" => Some(Self::Operator),
            "DRIVER" => Some(Self::Driver),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dispatch user: operator, admin or driver.
///
/// `email` is stored lowercased and unique. A user with `is_active=false`
/// cannot authenticate.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub phone: Option<String>,
    pub push_token: Option<String>,
    /// Opaque per-user preference blob, owned by the UI.
    pub preferences: serde_json::Value,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_driver(&self) -> bool {
        self.role == UserRole::Driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_wire_form() {
        for role in [UserRole::Admin, UserRole::Operator, UserRole::Driver] {
            assert_eq!(UserRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_str("driver"), None);
    }
}
