use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Badge, BadgeTier, Donation, PaymentMethod, PaymentStatus, Priority, RankTier, ReliefRequest,
    RequestCategory, RequestStatus, UnknownVariant, User, UserCategory,
};

// -- JWT Claims --

/// JWT claims issued at login and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub category: Option<UserCategory>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

// -- Requests --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReliefRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub category: RequestCategory,
    pub description: String,
    pub lat: f64,
    pub lng: f64,
    pub address: Option<String>,
    pub priority: Option<Priority>,
    pub wallet_number: Option<String>,
    pub bank_account: Option<String>,
    pub funding_goal: Option<Decimal>,
}

/// Partial update of a request's descriptive fields. Totals, helpers and
/// verification are never writable through this body.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateReliefRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub priority: Option<Priority>,
    pub wallet_number: Option<String>,
    pub bank_account: Option<String>,
    pub funding_goal: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: RequestStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkHelpedRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestQuery {
    pub category: Option<RequestCategory>,
    pub status: Option<RequestStatus>,
    pub search: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
}

// -- Donations --

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub processing_fee: Decimal,
    pub platform_fee: Decimal,
    pub total_fees: Decimal,
    pub net_amount: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardDonationRequest {
    pub request_id: Option<Uuid>,
    pub amount: Decimal,
    pub payment_method_id: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalletDonationRequest {
    pub request_id: Uuid,
    pub amount: Decimal,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InKindDonationRequest {
    pub request_id: Option<Uuid>,
    pub amount: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfirmDonationRequest {
    pub reference_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefundRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayOutcomeRequest {
    pub succeeded: bool,
}

#[derive(Debug, Deserialize)]
pub struct FeeQuery {
    pub amount: Decimal,
}

/// A donation plus its fee breakdown. `warning` is set when the donation
/// transition committed but the aggregate counters could not be patched.
#[derive(Debug, Serialize)]
pub struct DonationResponse {
    pub donation: Donation,
    pub fees: FeeBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WalletInstructions {
    pub donation_id: Uuid,
    pub wallet_number: String,
    pub amount: Decimal,
    pub fees: FeeBreakdown,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RequestDonations {
    pub count: usize,
    pub total: Decimal,
    pub donations: Vec<Donation>,
}

// -- Admin --

#[derive(Debug, Default, Deserialize)]
pub struct AdminDonationQuery {
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DonationTotals {
    pub total_amount: Decimal,
    pub total_fees: Decimal,
    pub total_net: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DonationPage {
    pub count: usize,
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u32,
    pub totals: DonationTotals,
    pub donations: Vec<Donation>,
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub active_users: u64,
    pub total_requests: u64,
    pub pending_requests: u64,
    pub completed_donations: u64,
    pub donations: DonationTotals,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminUserUpdate {
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
    pub category: Option<UserCategory>,
    pub email_verified: Option<bool>,
    pub phone_verified: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminUserQuery {
    pub category: Option<UserCategory>,
    pub is_active: Option<bool>,
    /// Case-insensitive substring of name, email or phone.
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub count: usize,
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u32,
    pub users: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct AdminUserStats {
    pub total_requests: usize,
    pub total_donations: usize,
    pub total_amount: Decimal,
}

/// One account with everything it filed and gave.
#[derive(Debug, Serialize)]
pub struct AdminUserDetail {
    pub user: User,
    pub requests: Vec<ReliefRequest>,
    pub donations: Vec<Donation>,
    pub stats: AdminUserStats,
}

/// Admin request listing. Unlike the public listing, inactive requests
/// are included.
#[derive(Debug, Default, Deserialize)]
pub struct AdminRequestQuery {
    pub category: Option<RequestCategory>,
    pub status: Option<RequestStatus>,
    pub is_verified: Option<bool>,
    pub priority: Option<Priority>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RequestPage {
    pub count: usize,
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u32,
    pub requests: Vec<ReliefRequest>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ReportPeriod {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CategoryCount {
    pub category: UserCategory,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RequestBreakdown {
    pub category: RequestCategory,
    pub status: RequestStatus,
    pub count: u64,
}

/// Completed donations inside the report period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DonationSummary {
    pub count: u64,
    pub total_amount: Decimal,
    pub total_processing_fees: Decimal,
    pub total_platform_fees: Decimal,
    pub total_net: Decimal,
    pub average_donation: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PlatformReport {
    pub period: ReportPeriod,
    pub generated_at: DateTime<Utc>,
    pub users_by_category: Vec<CategoryCount>,
    pub requests_by_category_status: Vec<RequestBreakdown>,
    pub donations: DonationSummary,
}

/// Admin bulk operations, named by the `{action}` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BulkAction {
    #[serde(rename = "verify-requests")]
    VerifyRequests,
    #[serde(rename = "activate-users")]
    ActivateUsers,
    #[serde(rename = "deactivate-users")]
    DeactivateUsers,
}

impl std::str::FromStr for BulkAction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verify-requests" => Ok(BulkAction::VerifyRequests),
            "activate-users" => Ok(BulkAction::ActivateUsers),
            "deactivate-users" => Ok(BulkAction::DeactivateUsers),
            other => Err(UnknownVariant {
                kind: "BulkAction",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BulkResult {
    pub action: BulkAction,
    pub matched: usize,
    pub modified: usize,
}

// -- Leaderboard --

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub category: Option<UserCategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: Uuid,
    pub name: String,
    pub category: UserCategory,
    pub total_amount: Decimal,
    pub total_donations: i64,
    pub badges: Vec<Badge>,
    pub rank: usize,
    pub tier: RankTier,
    pub percentile: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MyRank {
    pub rank: usize,
    pub total_users: usize,
    pub total_amount: Decimal,
    pub total_donations: i64,
    pub percentile: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeKind {
    Donation,
    Help,
}

/// A badge that can be earned and what it takes: a lifetime donated amount
/// for donation badges, a help count for help badges.
#[derive(Debug, Clone, Serialize)]
pub struct BadgeInfo {
    pub tier: BadgeTier,
    pub name: &'static str,
    pub kind: BadgeKind,
    pub threshold: Decimal,
}

// -- Health --

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: bool,
    pub timestamp: DateTime<Utc>,
}
