//! Role Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marketplace user role carried in the JWT `role` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Seller,
    Shipper,
    Admin,
    /// Regional manager (finance approvals, order oversight)
    #[serde(alias = "regional_manager")]
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Seller => "seller",
            Self::Shipper => "shipper",
            Self::Admin => "admin",
            Self::Manager => "manager",
        }
    }

    /// Admins and regional managers
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "customer" => Some(Self::Customer),
            "seller" => Some(Self::Seller),
            "shipper" => Some(Self::Shipper),
            "admin" => Some(Self::Admin),
            "manager" | "regional_manager" => Some(Self::Manager),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roles() {
        assert_eq!(Role::parse("Seller"), Some(Role::Seller));
        assert_eq!(Role::parse("regional_manager"), Some(Role::Manager));
        assert_eq!(Role::parse("system"), None);
    }

    #[test]
    fn test_staff() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Manager.is_staff());
        assert!(!Role::Shipper.is_staff());
    }
}
