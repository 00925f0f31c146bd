use serde::{Deserialize, Serialize};

use crate::domain::deletion::PartnerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    Partner,
    Admin,
}

impl std::str::FromStr for SessionRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "partner" => Ok(Self::Partner),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unsupported session role `{other}` (expected partner|admin)")),
        }
    }
}

/// Identity of the actor driving the workflow, passed into every operation
/// instead of being read from a global auth store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub display_name: Option<String>,
    pub role: SessionRole,
    pub partner_id: Option<PartnerId>,
}

impl SessionContext {
    pub fn partner(user_id: impl Into<String>, partner_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            role: SessionRole::Partner,
            partner_id: Some(PartnerId(partner_id.into())),
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            role: SessionRole::Admin,
            partner_id: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == SessionRole::Admin
    }
}
