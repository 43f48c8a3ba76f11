use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Returned when a stored or submitted string does not name a known variant.
#[derive(Debug, Clone, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed set of string-tagged values shared by the API (serde)
/// and the database (`as_str` / `FromStr`).
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum! {
    /// Kind of account, used as the leaderboard filter.
    UserCategory {
        Individual => "individual",
        Organization => "organization",
        Company => "company",
        Government => "government",
    }
}

impl Default for UserCategory {
    fn default() -> Self {
        UserCategory::Individual
    }
}

text_enum! {
    RequestCategory {
        Food => "food",
        Water => "water",
        Shelter => "shelter",
        Clothing => "clothing",
        Medical => "medical",
        Money => "money",
        Other => "other",
    }
}

text_enum! {
    RequestStatus {
        Pending => "pending",
        InProgress => "in-progress",
        Fulfilled => "fulfilled",
        Cancelled => "cancelled",
    }
}

text_enum! {
    Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

text_enum! {
    PaymentMethod {
        Gcash => "gcash",
        Stripe => "stripe",
        InKind => "in-kind",
    }
}

impl PaymentMethod {
    /// Money-moving methods. In-kind donations never touch the aggregates.
    pub fn is_ledger(&self) -> bool {
        !matches!(self, PaymentMethod::InKind)
    }
}

text_enum! {
    PaymentStatus {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
        Refunded => "refunded",
    }
}

text_enum! {
    /// Badge identity. One badge per tier per user.
    BadgeTier {
        Bronze => "bronze",
        Silver => "silver",
        Gold => "gold",
        Platinum => "platinum",
        Helper => "helper",
        Champion => "champion",
        Hero => "hero",
        Legend => "legend",
    }
}

impl BadgeTier {
    pub fn display_name(&self) -> &'static str {
        match self {
            BadgeTier::Bronze => "Bronze Supporter",
            BadgeTier::Silver => "Silver Supporter",
            BadgeTier::Gold => "Gold Supporter",
            BadgeTier::Platinum => "Platinum Supporter",
            BadgeTier::Helper => "Helper",
            BadgeTier::Champion => "Champion",
            BadgeTier::Hero => "Hero",
            BadgeTier::Legend => "Legend",
        }
    }
}

text_enum! {
    /// Leaderboard band, derived from rank position on every read.
    RankTier {
        Platinum => "platinum",
        Gold => "gold",
        Silver => "silver",
        Bronze => "bronze",
    }
}

/// Resolved caller identity, passed explicitly into every core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl Identity {
    /// Owner-or-admin check. Requests filed anonymously are admin-managed.
    pub fn can_manage(&self, owner: Option<Uuid>) -> bool {
        self.is_admin || owner == Some(self.user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub tier: BadgeTier,
    pub name: String,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub category: UserCategory,
    pub is_admin: bool,
    pub is_active: bool,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub total_donations: i64,
    pub total_donation_amount: Decimal,
    pub help_count: i64,
    pub badges: Vec<Badge>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn has_badge(&self, tier: BadgeTier) -> bool {
        self.badges.iter().any(|b| b.tier == tier)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Great-circle distance in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlng = (other.lng - self.lng).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Helper {
    pub user_id: Uuid,
    pub helped_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// A relief appeal pinned on the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliefRequest {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub category: RequestCategory,
    pub description: String,
    pub location: GeoPoint,
    pub address: Option<String>,
    pub status: RequestStatus,
    pub priority: Priority,
    pub is_verified: bool,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub wallet_number: Option<String>,
    pub bank_account: Option<String>,
    pub funding_goal: Option<Decimal>,
    pub total_received: Decimal,
    pub helpers: Vec<Helper>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub reason: String,
    pub refunded_at: DateTime<Utc>,
    pub refunded_by: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub request_id: Option<Uuid>,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub method_reference: Option<String>,
    pub processing_fee: Decimal,
    pub platform_fee: Decimal,
    pub net_amount: Decimal,
    pub is_recurring: bool,
    pub notes: Option<String>,
    pub refund: Option<RefundRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn enums_roundtrip_through_text() {
        for status in RequestStatus::ALL {
            assert_eq!(RequestStatus::from_str(status.as_str()).unwrap(), *status);
        }
        assert_eq!(PaymentMethod::from_str("in-kind").unwrap(), PaymentMethod::InKind);
        assert!(BadgeTier::from_str("diamond").is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&RequestStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        let method: PaymentMethod = serde_json::from_str("\"gcash\"").unwrap();
        assert_eq!(method, PaymentMethod::Gcash);
    }

    #[test]
    fn anonymous_requests_are_admin_managed() {
        let user = Identity { user_id: Uuid::new_v4(), is_admin: false };
        let admin = Identity { user_id: Uuid::new_v4(), is_admin: true };
        assert!(!user.can_manage(None));
        assert!(user.can_manage(Some(user.user_id)));
        assert!(!user.can_manage(Some(admin.user_id)));
        assert!(admin.can_manage(None));
    }

    #[test]
    fn coordinates_and_distance() {
        let manila = GeoPoint { lat: 14.5995, lng: 120.9842 };
        let cebu = GeoPoint { lat: 10.3157, lng: 123.8854 };
        assert!(manila.is_valid());
        assert!(!GeoPoint { lat: 91.0, lng: 0.0 }.is_valid());
        let d = manila.distance_km(&cebu);
        assert!((560.0..590.0).contains(&d), "got {d}");
    }
}
