// Authenticated user records

use super::wire;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl User {
    /// Admin when flagged as such or holding the `admin` role
    pub fn admin(&self) -> bool {
        self.is_admin
            || self
                .role
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case("admin"))
    }

    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Reply of `POST /auth/login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub user: Option<User>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_admin_is_derived_from_flag_or_role() {
        let mut user: User =
            serde_json::from_value(json!({"id": 1, "username": "demo"})).unwrap();
        assert!(!user.admin());

        user.role = Some("Admin".into());
        assert!(user.admin());

        user.role = Some("viewer".into());
        user.is_admin = true;
        assert!(user.admin());
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let user: User = serde_json::from_value(
            json!({"id": "u1", "username": "demo", "full_name": " "}),
        )
        .unwrap();
        assert_eq!(user.display_name(), "demo");
    }

    #[test]
    fn test_login_response_defaults() {
        let reply: LoginResponse =
            serde_json::from_value(json!({"access_token": "abc"})).unwrap();
        assert_eq!(reply.token_type, "bearer");
        assert!(reply.user.is_none());
    }
}
