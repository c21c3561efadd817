use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three user roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Pharmacy,
    Admin,
}

impl Role {
    /// Database string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Pharmacy => "pharmacy",
            Self::Admin => "admin",
        }
    }

    /// Parse from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "patient" => Some(Self::Patient),
            "pharmacy" => Some(Self::Pharmacy),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Order lifecycle status. Transitions are linear guards checked in the
/// order service; `rejected`, `cancelled` and `paid` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Paid,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Patient {
    pub account_id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub address: String,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Pharmacy {
    pub account_id: Uuid,
    pub name: String,
    pub phone: String,
    pub address: String,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Drug {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// A pharmacy's priced stock listing for a drug.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct PharmacyProduct {
    pub pharmacy_id: Uuid,
    pub drug_id: Uuid,
    pub price_cents: i64,
    pub quantity_available: i32,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct CartItem {
    pub patient_id: Uuid,
    pub drug_id: Uuid,
    pub pharmacy_id: Uuid,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub pharmacy_id: Uuid,
    pub status: String,
    pub total_cents: i64,
    pub stripe_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct OrderDetail {
    pub order_id: Uuid,
    pub drug_id: Uuid,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

// Joined projections returned by list/detail queries.

/// A cart row joined with its listing and display names.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct CartLine {
    pub drug_id: Uuid,
    pub pharmacy_id: Uuid,
    pub drug_name: String,
    pub pharmacy_name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub quantity_available: i32,
}

/// A stock listing joined with the drug name.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct StockLine {
    pub drug_id: Uuid,
    pub drug_name: String,
    pub price_cents: i64,
    pub quantity_available: i32,
}

/// One pharmacy's offer for a drug, shown to patients comparing prices.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct DrugOffer {
    pub pharmacy_id: Uuid,
    pub pharmacy_name: String,
    pub price_cents: i64,
    pub quantity_available: i32,
}

/// An order line joined with the drug name.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct OrderLine {
    pub drug_id: Uuid,
    pub drug_name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_db_strings() {
        for role in [Role::Patient, Role::Pharmacy, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn order_status_round_trips_through_db_strings() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Approved,
            OrderStatus::Rejected,
            OrderStatus::Cancelled,
            OrderStatus::Paid,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("shipped"), None);
    }
}
