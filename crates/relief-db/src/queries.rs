use crate::Database;
use crate::models::{BadgeRow, HelperRow, RequestRow, UserRow, cents, now_timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use relief_types::api::{AdminUserUpdate, UpdateReliefRequest};
use relief_types::models::{
    BadgeTier, Priority, RequestCategory, RequestStatus, ReliefRequest, User, UserCategory,
};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password, name, phone, category, is_admin, is_active, \
     email_verified, phone_verified, total_donations, total_donation_cents, help_count, created_at";

const REQUEST_COLUMNS: &str = "id, owner_id, name, phone, email, category, description, lat, lng, \
     address, status, priority, is_verified, verified_by, verified_at, is_active, wallet_number, \
     bank_account, funding_goal_cents, total_received_cents, created_at";

/// SQL-side filter for request listings. Geographic radius filtering is
/// narrowed here to a bounding box; exact distance is checked by the caller.
#[derive(Debug, Default)]
pub struct RequestFilter {
    pub category: Option<RequestCategory>,
    pub status: Option<RequestStatus>,
    pub search: Option<String>,
    /// (min_lat, max_lat, min_lng, max_lng)
    pub bounds: Option<(f64, f64, f64, f64)>,
    pub limit: u32,
}

const USER_SEARCH: &str = "(?1 IS NULL OR category = ?1)
     AND (?2 IS NULL OR is_active = ?2)
     AND (?3 IS NULL OR name LIKE ?3 OR email LIKE ?3 OR phone LIKE ?3)";

const ADMIN_REQUEST_SEARCH: &str = "(?1 IS NULL OR category = ?1)
     AND (?2 IS NULL OR status = ?2)
     AND (?3 IS NULL OR is_verified = ?3)
     AND (?4 IS NULL OR priority = ?4)";

/// Inclusive creation-time window. Stored timestamps carry varying
/// fractional digits, so comparisons go through `julianday`.
const IN_RANGE: &str = "(?1 IS NULL OR julianday(created_at) >= julianday(?1))
     AND (?2 IS NULL OR julianday(created_at) <= julianday(?2))";

#[derive(Debug, Default)]
pub struct UserFilter {
    pub category: Option<UserCategory>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

/// Admin request filter. Matches inactive rows too.
#[derive(Debug, Default)]
pub struct AdminRequestFilter {
    pub category: Option<RequestCategory>,
    pub status: Option<RequestStatus>,
    pub is_verified: Option<bool>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub(crate) fn bounds(&self) -> (Option<String>, Option<String>) {
        (self.start.map(|t| t.to_rfc3339()), self.end.map(|t| t.to_rfc3339()))
    }
}

/// Result of a multi-row admin update: ids that exist, and rows whose
/// value actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkUpdate {
    pub matched: usize,
    pub modified: usize,
}

/// Outcome of recording a helper against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpRecord {
    Added,
    AlreadyHelped,
    MissingRequest,
}

impl Database {
    // -- Users --

    /// Insert a new account. Returns false when the email is already taken.
    pub fn create_user(&self, user: &User, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users (id, email, password, name, phone, category, is_admin, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user.id.to_string(),
                    user.email,
                    password_hash,
                    user.name,
                    user.phone,
                    user.category.as_str(),
                    user.is_admin,
                    user.created_at.to_rfc3339(),
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
            conn.query_row(&sql, [email], user_from_row).optional()
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Load a user with their badges attached.
    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let Some(row) = query_user_by_id(conn, &id.to_string())? else {
                return Ok(None);
            };
            let badges = query_badges(conn, &row.id)?;
            Ok(Some(row.into_user(badges)?))
        })
    }

    /// All users in registration order, optionally restricted to one category.
    pub fn list_users(&self, category: Option<UserCategory>) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE (?1 IS NULL OR category = ?1) ORDER BY rowid",
                USER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([category.map(|c| c.as_str())], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut badges_by_user = query_all_badges(conn)?;
            rows.into_iter()
                .map(|row| {
                    let badges = badges_by_user.remove(&row.id).unwrap_or_default();
                    row.into_user(badges)
                })
                .collect()
        })
    }

    pub fn update_profile(&self, id: Uuid, name: Option<&str>, phone: Option<&str>) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE users SET name = COALESCE(?2, name), phone = COALESCE(?3, phone) WHERE id = ?1",
                params![id.to_string(), name, phone],
            )?)
        })
    }

    pub fn admin_update_user(&self, id: Uuid, update: &AdminUserUpdate) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE users SET
                    is_admin = COALESCE(?2, is_admin),
                    is_active = COALESCE(?3, is_active),
                    category = COALESCE(?4, category),
                    email_verified = COALESCE(?5, email_verified),
                    phone_verified = COALESCE(?6, phone_verified)
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    update.is_admin,
                    update.is_active,
                    update.category.map(|c| c.as_str()),
                    update.email_verified,
                    update.phone_verified,
                ],
            )?)
        })
    }

    /// Atomically bump a user's help count. Returns the new count, or None
    /// when the user row is gone.
    pub fn increment_help_count(&self, user_id: Uuid) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE users SET help_count = help_count + 1 WHERE id = ?1 RETURNING help_count",
                [user_id.to_string()],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn count_users(&self, active_only: bool) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE (?1 = 0 OR is_active = 1)",
                [active_only],
                |r| r.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// One page of users matching `filter`, newest first.
    pub fn search_users(&self, filter: &UserFilter, limit: u32, offset: u64) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE {} ORDER BY created_at DESC, rowid DESC LIMIT ?4 OFFSET ?5",
                USER_COLUMNS, USER_SEARCH
            );
            let pattern = like_pattern(filter.search.as_deref());
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![
                        filter.category.map(|c| c.as_str()),
                        filter.is_active,
                        pattern,
                        limit,
                        offset as i64,
                    ],
                    user_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|row| {
                    let badges = query_badges(conn, &row.id)?;
                    row.into_user(badges)
                })
                .collect()
        })
    }

    pub fn count_matching_users(&self, filter: &UserFilter) -> Result<u64> {
        self.with_conn(|conn| {
            let sql = format!("SELECT COUNT(*) FROM users WHERE {}", USER_SEARCH);
            let count: i64 = conn.query_row(
                &sql,
                params![
                    filter.category.map(|c| c.as_str()),
                    filter.is_active,
                    like_pattern(filter.search.as_deref()),
                ],
                |r| r.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Accounts registered inside `range`, counted per category.
    pub fn users_by_category(&self, range: &DateRange) -> Result<Vec<(UserCategory, u64)>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT category, COUNT(*) FROM users WHERE {} GROUP BY category ORDER BY category",
                IN_RANGE
            );
            let (start, end) = range.bounds();
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![start, end], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(|(category, count)| -> Result<(UserCategory, u64)> { Ok((category.parse()?, count as u64)) })
                .collect()
        })
    }

    /// Set `is_active` on every listed user in one transaction.
    pub fn set_users_active(&self, ids: &[Uuid], active: bool) -> Result<BulkUpdate> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut result = BulkUpdate::default();
            for id in ids {
                let id = id.to_string();
                let exists: Option<i64> = tx
                    .query_row("SELECT 1 FROM users WHERE id = ?1", [&id], |r| r.get(0))
                    .optional()?;
                if exists.is_none() {
                    continue;
                }
                result.matched += 1;
                result.modified += tx.execute(
                    "UPDATE users SET is_active = ?2 WHERE id = ?1 AND is_active != ?2",
                    params![id, active],
                )?;
            }
            tx.commit()?;
            Ok(result)
        })
    }

    // -- Badges --

    /// Grant a badge unless the user already holds that tier.
    /// Returns true when a new row was written.
    pub fn grant_badge(&self, user_id: Uuid, tier: BadgeTier) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO user_badges (user_id, tier, name, earned_at) VALUES (?1, ?2, ?3, ?4)",
                params![user_id.to_string(), tier.as_str(), tier.display_name(), now_timestamp()],
            )?;
            Ok(inserted == 1)
        })
    }

    // -- Requests --

    pub fn insert_request(&self, request: &ReliefRequest) -> Result<()> {
        let goal_cents = request.funding_goal.map(cents).transpose()?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO requests (id, owner_id, name, phone, email, category, description, lat, lng,
                    address, status, priority, wallet_number, bank_account, funding_goal_cents,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
                params![
                    request.id.to_string(),
                    request.owner_id.map(|id| id.to_string()),
                    request.name,
                    request.phone,
                    request.email,
                    request.category.as_str(),
                    request.description,
                    request.location.lat,
                    request.location.lng,
                    request.address,
                    request.status.as_str(),
                    request.priority.as_str(),
                    request.wallet_number,
                    request.bank_account,
                    goal_cents,
                    request.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    /// Load a request with its helpers, regardless of the active flag.
    pub fn get_request(&self, id: Uuid) -> Result<Option<ReliefRequest>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM requests WHERE id = ?1", REQUEST_COLUMNS);
            let Some(row) = conn.query_row(&sql, [id.to_string()], request_from_row).optional()? else {
                return Ok(None);
            };
            let helpers = query_helpers(conn, &row.id)?
                .into_iter()
                .map(HelperRow::into_helper)
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(row.into_request(helpers)?))
        })
    }

    /// Active requests, newest first. Helpers are not loaded for listings.
    pub fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<ReliefRequest>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM requests
                 WHERE is_active = 1
                   AND (?1 IS NULL OR category = ?1)
                   AND (?2 IS NULL OR status = ?2)
                   AND (?3 IS NULL OR name LIKE ?3 OR description LIKE ?3)
                   AND (?4 IS NULL OR (lat BETWEEN ?4 AND ?5 AND lng BETWEEN ?6 AND ?7))
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?8",
                REQUEST_COLUMNS
            );
            let pattern = filter.search.as_ref().map(|s| format!("%{}%", s));
            let (min_lat, max_lat, min_lng, max_lng) = match filter.bounds {
                Some((a, b, c, d)) => (Some(a), Some(b), Some(c), Some(d)),
                None => (None, None, None, None),
            };

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![
                        filter.category.map(|c| c.as_str()),
                        filter.status.map(|s| s.as_str()),
                        pattern,
                        min_lat,
                        max_lat,
                        min_lng,
                        max_lng,
                        filter.limit,
                    ],
                    request_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(|row| row.into_request(Vec::new())).collect()
        })
    }

    pub fn update_request(&self, id: Uuid, update: &UpdateReliefRequest) -> Result<usize> {
        let goal_cents = update.funding_goal.map(cents).transpose()?;
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE requests SET
                    name = COALESCE(?2, name),
                    phone = COALESCE(?3, phone),
                    email = COALESCE(?4, email),
                    description = COALESCE(?5, description),
                    address = COALESCE(?6, address),
                    priority = COALESCE(?7, priority),
                    wallet_number = COALESCE(?8, wallet_number),
                    bank_account = COALESCE(?9, bank_account),
                    funding_goal_cents = COALESCE(?10, funding_goal_cents),
                    updated_at = ?11
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    update.name,
                    update.phone,
                    update.email,
                    update.description,
                    update.address,
                    update.priority.map(|p| p.as_str()),
                    update.wallet_number,
                    update.bank_account,
                    goal_cents,
                    now_timestamp(),
                ],
            )?)
        })
    }

    pub fn set_request_status(&self, id: Uuid, status: RequestStatus) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE requests SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.to_string(), status.as_str(), now_timestamp()],
            )?)
        })
    }

    pub fn deactivate_request(&self, id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE requests SET is_active = 0, updated_at = ?2 WHERE id = ?1",
                params![id.to_string(), now_timestamp()],
            )?)
        })
    }

    pub fn verify_request(&self, id: Uuid, admin_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            let now = now_timestamp();
            Ok(conn.execute(
                "UPDATE requests SET is_verified = 1, verified_by = ?2, verified_at = ?3, updated_at = ?3
                 WHERE id = ?1",
                params![id.to_string(), admin_id.to_string(), now],
            )?)
        })
    }

    /// One page of requests for administrators, inactive ones included,
    /// newest first. Helpers are not loaded.
    pub fn admin_list_requests(&self, filter: &AdminRequestFilter, limit: u32, offset: u64) -> Result<Vec<ReliefRequest>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM requests WHERE {} ORDER BY created_at DESC, rowid DESC LIMIT ?5 OFFSET ?6",
                REQUEST_COLUMNS, ADMIN_REQUEST_SEARCH
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![
                        filter.category.map(|c| c.as_str()),
                        filter.status.map(|s| s.as_str()),
                        filter.is_verified,
                        filter.priority.map(|p| p.as_str()),
                        limit,
                        offset as i64,
                    ],
                    request_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(|row| row.into_request(Vec::new())).collect()
        })
    }

    pub fn count_admin_requests(&self, filter: &AdminRequestFilter) -> Result<u64> {
        self.with_conn(|conn| {
            let sql = format!("SELECT COUNT(*) FROM requests WHERE {}", ADMIN_REQUEST_SEARCH);
            let count: i64 = conn.query_row(
                &sql,
                params![
                    filter.category.map(|c| c.as_str()),
                    filter.status.map(|s| s.as_str()),
                    filter.is_verified,
                    filter.priority.map(|p| p.as_str()),
                ],
                |r| r.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Every request filed by `owner_id`, inactive ones included, newest first.
    pub fn list_requests_by_owner(&self, owner_id: Uuid) -> Result<Vec<ReliefRequest>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM requests WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
                REQUEST_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id.to_string()], request_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(|row| row.into_request(Vec::new())).collect()
        })
    }

    /// Requests filed inside `range`, counted per (category, status).
    pub fn requests_by_category_status(
        &self,
        range: &DateRange,
    ) -> Result<Vec<(RequestCategory, RequestStatus, u64)>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT category, status, COUNT(*) FROM requests WHERE {}
                 GROUP BY category, status ORDER BY category, status",
                IN_RANGE
            );
            let (start, end) = range.bounds();
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![start, end], |r| {
                    Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, i64>(2)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(|(category, status, count)| -> Result<(RequestCategory, RequestStatus, u64)> {
                    Ok((category.parse()?, status.parse()?, count as u64))
                })
                .collect()
        })
    }

    /// Mark every listed, not yet verified request as verified by `admin_id`.
    /// Requests verified earlier keep their original verifier.
    pub fn verify_requests(&self, ids: &[Uuid], admin_id: Uuid) -> Result<BulkUpdate> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let now = now_timestamp();
            let mut result = BulkUpdate::default();
            for id in ids {
                let id = id.to_string();
                let exists: Option<i64> = tx
                    .query_row("SELECT 1 FROM requests WHERE id = ?1", [&id], |r| r.get(0))
                    .optional()?;
                if exists.is_none() {
                    continue;
                }
                result.matched += 1;
                result.modified += tx.execute(
                    "UPDATE requests SET is_verified = 1, verified_by = ?2, verified_at = ?3, updated_at = ?3
                     WHERE id = ?1 AND is_verified = 0",
                    params![id, admin_id.to_string(), now],
                )?;
            }
            tx.commit()?;
            Ok(result)
        })
    }

    pub fn count_requests(&self, status: Option<RequestStatus>) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM requests WHERE (?1 IS NULL OR status = ?1)",
                [status.map(|s| s.as_str())],
                |r| r.get(0),
            )?;
            Ok(count as u64)
        })
    }

    // -- Helpers --

    /// Record that `user_id` helped with a request. The (request, user)
    /// primary key makes the duplicate check and the insert one statement.
    /// A pending request moves to in-progress in the same transaction.
    pub fn add_helper(&self, request_id: Uuid, user_id: Uuid, notes: Option<&str>) -> Result<HelpRecord> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let rid = request_id.to_string();

            let exists: Option<i64> = tx
                .query_row("SELECT 1 FROM requests WHERE id = ?1 AND is_active = 1", [&rid], |r| r.get(0))
                .optional()?;
            if exists.is_none() {
                return Ok(HelpRecord::MissingRequest);
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO request_helpers (request_id, user_id, helped_at, notes)
                 VALUES (?1, ?2, ?3, ?4)",
                params![rid, user_id.to_string(), now_timestamp(), notes],
            )?;
            if inserted == 0 {
                return Ok(HelpRecord::AlreadyHelped);
            }

            tx.execute(
                "UPDATE requests SET status = 'in-progress', updated_at = ?2
                 WHERE id = ?1 AND status = 'pending'",
                params![rid, now_timestamp()],
            )?;
            tx.commit()?;
            Ok(HelpRecord::Added)
        })
    }
}

fn like_pattern(search: Option<&str>) -> Option<String> {
    search.map(str::trim).filter(|s| !s.is_empty()).map(|s| format!("%{}%", s))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        name: row.get(3)?,
        phone: row.get(4)?,
        category: row.get(5)?,
        is_admin: row.get(6)?,
        is_active: row.get(7)?,
        email_verified: row.get(8)?,
        phone_verified: row.get(9)?,
        total_donations: row.get(10)?,
        total_donation_cents: row.get(11)?,
        help_count: row.get(12)?,
        created_at: row.get(13)?,
    })
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<RequestRow> {
    Ok(RequestRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        category: row.get(5)?,
        description: row.get(6)?,
        lat: row.get(7)?,
        lng: row.get(8)?,
        address: row.get(9)?,
        status: row.get(10)?,
        priority: row.get(11)?,
        is_verified: row.get(12)?,
        verified_by: row.get(13)?,
        verified_at: row.get(14)?,
        is_active: row.get(15)?,
        wallet_number: row.get(16)?,
        bank_account: row.get(17)?,
        funding_goal_cents: row.get(18)?,
        total_received_cents: row.get(19)?,
        created_at: row.get(20)?,
    })
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    conn.query_row(&sql, [id], user_from_row).optional()
}

fn query_badges(conn: &Connection, user_id: &str) -> Result<Vec<relief_types::models::Badge>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, tier, name, earned_at FROM user_badges WHERE user_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([user_id], badge_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(BadgeRow::into_badge).collect()
}

fn query_all_badges(
    conn: &Connection,
) -> Result<std::collections::HashMap<String, Vec<relief_types::models::Badge>>> {
    let mut stmt = conn.prepare("SELECT user_id, tier, name, earned_at FROM user_badges ORDER BY rowid")?;
    let rows = stmt
        .query_map([], badge_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut grouped: std::collections::HashMap<String, Vec<_>> = std::collections::HashMap::new();
    for row in rows {
        let user_id = row.user_id.clone();
        grouped.entry(user_id).or_default().push(row.into_badge()?);
    }
    Ok(grouped)
}

fn badge_from_row(row: &Row<'_>) -> rusqlite::Result<BadgeRow> {
    Ok(BadgeRow {
        user_id: row.get(0)?,
        tier: row.get(1)?,
        name: row.get(2)?,
        earned_at: row.get(3)?,
    })
}

fn query_helpers(conn: &Connection, request_id: &str) -> Result<Vec<HelperRow>> {
    let mut stmt = conn.prepare(
        "SELECT request_id, user_id, helped_at, notes FROM request_helpers
         WHERE request_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([request_id], |row| {
            Ok(HelperRow {
                request_id: row.get(0)?,
                user_id: row.get(1)?,
                helped_at: row.get(2)?,
                notes: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
