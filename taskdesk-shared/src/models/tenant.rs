//! Tenant model
//!
//! A tenant is the organization that owns users and tasks. The client only
//! reads tenants; non-superusers see exactly one (their own).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Tenant identifier
pub type TenantId = i64;

/// Organization as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,

    pub name: String,

    /// Database schema backing the tenant
    #[serde(default)]
    pub schema_name: String,

    /// Last day covered by the subscription
    #[serde(default)]
    pub paid_until: Option<NaiveDate>,

    #[serde(default)]
    pub on_trial: bool,

    #[serde(default)]
    pub created_on: Option<NaiveDate>,
}

impl Tenant {
    /// Checks if the tenant is on trial or paid through `today`
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.on_trial || self.paid_until.map(|until| until >= today).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(paid_until: Option<&str>, on_trial: bool) -> Tenant {
        Tenant {
            id: 1,
            name: "Acme Corporation".to_string(),
            schema_name: "acme".to_string(),
            paid_until: paid_until.map(|d| d.parse().unwrap()),
            on_trial,
            created_on: None,
        }
    }

    #[test]
    fn test_tenant_deserializes() {
        let tenant: Tenant = serde_json::from_str(
            r#"{"id": 1, "name": "Acme Corporation", "schema_name": "acme",
                "paid_until": "2024-12-31", "on_trial": false, "created_on": "2024-01-01"}"#,
        )
        .unwrap();

        assert_eq!(tenant.schema_name, "acme");
        assert_eq!(tenant.paid_until, NaiveDate::from_ymd_opt(2024, 12, 31));
    }

    #[test]
    fn test_is_active() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        assert!(tenant(Some("2024-12-31"), false).is_active(today));
        assert!(!tenant(Some("2024-01-31"), false).is_active(today));
        assert!(tenant(None, true).is_active(today));
        assert!(!tenant(None, false).is_active(today));
    }
}
