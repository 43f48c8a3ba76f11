/// Database row types — these map directly to SQLite rows.
/// Distinct from relief-types models to keep the DB layer independent;
/// the `into_*` conversions parse ids, enums and centavo columns.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use relief_types::models::{
    Badge, Donation, GeoPoint, Helper, RefundRecord, ReliefRequest, User,
};
use relief_types::money::{from_cents, to_cents};
use rust_decimal::Decimal;
use uuid::Uuid;

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    pub category: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub total_donations: i64,
    pub total_donation_cents: i64,
    pub help_count: i64,
    pub created_at: String,
}

pub struct BadgeRow {
    pub user_id: String,
    pub tier: String,
    pub name: String,
    pub earned_at: String,
}

pub struct RequestRow {
    pub id: String,
    pub owner_id: Option<String>,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub category: String,
    pub description: String,
    pub lat: f64,
    pub lng: f64,
    pub address: Option<String>,
    pub status: String,
    pub priority: String,
    pub is_verified: bool,
    pub verified_by: Option<String>,
    pub verified_at: Option<String>,
    pub is_active: bool,
    pub wallet_number: Option<String>,
    pub bank_account: Option<String>,
    pub funding_goal_cents: Option<i64>,
    pub total_received_cents: i64,
    pub created_at: String,
}

pub struct HelperRow {
    pub request_id: String,
    pub user_id: String,
    pub helped_at: String,
    pub notes: Option<String>,
}

pub struct DonationRow {
    pub id: String,
    pub donor_id: String,
    pub request_id: Option<String>,
    pub amount_cents: i64,
    pub method: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub method_reference: Option<String>,
    pub processing_fee_cents: i64,
    pub platform_fee_cents: i64,
    pub net_cents: i64,
    pub is_recurring: bool,
    pub notes: Option<String>,
    pub refund_reason: Option<String>,
    pub refunded_at: Option<String>,
    pub refunded_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Parses both RFC 3339 (what this crate writes) and SQLite's
/// `YYYY-MM-DD HH:MM:SS` (what `datetime('now')` writes).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("Corrupt timestamp '{}'", raw))
}

/// Centavo column value for an amount, refusing amounts that would not
/// survive the round trip.
pub fn cents(amount: Decimal) -> Result<i64> {
    to_cents(amount).with_context(|| format!("Amount {} is out of storage range", amount))
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("Corrupt id '{}'", raw))
}

fn parse_opt_id(raw: Option<&str>) -> Result<Option<Uuid>> {
    raw.map(parse_id).transpose()
}

impl UserRow {
    pub fn into_user(self, badges: Vec<Badge>) -> Result<User> {
        Ok(User {
            id: parse_id(&self.id)?,
            email: self.email,
            name: self.name,
            phone: self.phone,
            category: self.category.parse()?,
            is_admin: self.is_admin,
            is_active: self.is_active,
            email_verified: self.email_verified,
            phone_verified: self.phone_verified,
            total_donations: self.total_donations,
            total_donation_amount: from_cents(self.total_donation_cents),
            help_count: self.help_count,
            badges,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl BadgeRow {
    pub fn into_badge(self) -> Result<Badge> {
        Ok(Badge {
            tier: self.tier.parse()?,
            name: self.name,
            earned_at: parse_timestamp(&self.earned_at)?,
        })
    }
}

impl HelperRow {
    pub fn into_helper(self) -> Result<Helper> {
        Ok(Helper {
            user_id: parse_id(&self.user_id)?,
            helped_at: parse_timestamp(&self.helped_at)?,
            notes: self.notes,
        })
    }
}

impl RequestRow {
    pub fn into_request(self, helpers: Vec<Helper>) -> Result<ReliefRequest> {
        Ok(ReliefRequest {
            id: parse_id(&self.id)?,
            owner_id: parse_opt_id(self.owner_id.as_deref())?,
            name: self.name,
            phone: self.phone,
            email: self.email,
            category: self.category.parse()?,
            description: self.description,
            location: GeoPoint {
                lat: self.lat,
                lng: self.lng,
            },
            address: self.address,
            status: self.status.parse()?,
            priority: self.priority.parse()?,
            is_verified: self.is_verified,
            verified_by: parse_opt_id(self.verified_by.as_deref())?,
            verified_at: self.verified_at.as_deref().map(parse_timestamp).transpose()?,
            is_active: self.is_active,
            wallet_number: self.wallet_number,
            bank_account: self.bank_account,
            funding_goal: self.funding_goal_cents.map(from_cents),
            total_received: from_cents(self.total_received_cents),
            helpers,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl DonationRow {
    pub fn into_donation(self) -> Result<Donation> {
        let refund = match (self.refund_reason, self.refunded_at, self.refunded_by) {
            (Some(reason), Some(at), Some(by)) => Some(RefundRecord {
                reason,
                refunded_at: parse_timestamp(&at)?,
                refunded_by: parse_id(&by)?,
            }),
            _ => None,
        };

        Ok(Donation {
            id: parse_id(&self.id)?,
            donor_id: parse_id(&self.donor_id)?,
            request_id: parse_opt_id(self.request_id.as_deref())?,
            amount: from_cents(self.amount_cents),
            method: self.method.parse()?,
            status: self.status.parse()?,
            transaction_id: self.transaction_id,
            method_reference: self.method_reference,
            processing_fee: from_cents(self.processing_fee_cents),
            platform_fee: from_cents(self.platform_fee_cents),
            net_amount: from_cents(self.net_cents),
            is_recurring: self.is_recurring,
            notes: self.notes,
            refund,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}
