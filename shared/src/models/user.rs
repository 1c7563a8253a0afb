//! User Model

use serde::{Deserialize, Serialize};

/// Marketplace role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Buyer,
    Farmer,
    Admin,
}

impl UserRole {
    /// Parse from database string value (lowercase)
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "buyer" => Some(Self::Buyer),
            "farmer" => Some(Self::Farmer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Database string representation (lowercase)
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Farmer => "farmer",
            Self::Admin => "admin",
        }
    }
}

/// User entity (password hash never leaves the store)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: UserRole,
    /// Farmers need admin approval before they can act on orders
    pub is_approved: bool,
    pub location: Option<String>,
}

/// Create user payload
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub password_hash: String,
    pub role: UserRole,
    pub is_approved: bool,
    pub location: Option<String>,
}
