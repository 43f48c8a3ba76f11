use crate::Database;
use crate::models::{DonationRow, cents, now_timestamp};
use crate::queries::{DateRange, OptionalExt};
use anyhow::Result;
use relief_types::models::{Donation, PaymentMethod, PaymentStatus};
use rusqlite::{Row, params};
use uuid::Uuid;

const DONATION_COLUMNS: &str = "id, donor_id, request_id, amount_cents, method, status, \
     transaction_id, method_reference, processing_fee_cents, platform_fee_cents, net_cents, \
     is_recurring, notes, refund_reason, refunded_at, refunded_by, created_at, updated_at";

/// Fields written alongside a status change. `None` leaves the column as is.
#[derive(Debug, Default)]
pub struct TransitionPatch {
    pub transaction_id: Option<String>,
    pub method_reference: Option<String>,
    pub refund_reason: Option<String>,
    pub refunded_by: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied { previous: PaymentStatus },
    Rejected { current: PaymentStatus },
    Missing,
}

/// Rows touched by a totals adjustment. Zero means the target row is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalsPatched {
    pub request_rows: usize,
    pub user_rows: usize,
}

/// Sums in centavos over a set of donations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CentTotals {
    pub count: u64,
    pub amount_cents: i64,
    pub fee_cents: i64,
    pub net_cents: i64,
}

/// Completed money donations inside a report window, fees split out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportTotals {
    pub count: u64,
    pub amount_cents: i64,
    pub processing_fee_cents: i64,
    pub platform_fee_cents: i64,
    pub net_cents: i64,
}

#[derive(Debug, Default)]
pub struct DonationFilter {
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
}

impl Database {
    pub fn insert_donation(&self, donation: &Donation) -> Result<()> {
        let amount = cents(donation.amount)?;
        let processing_fee = cents(donation.processing_fee)?;
        let platform_fee = cents(donation.platform_fee)?;
        let net = cents(donation.net_amount)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO donations (id, donor_id, request_id, amount_cents, method, status,
                    transaction_id, method_reference, processing_fee_cents, platform_fee_cents,
                    net_cents, is_recurring, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    donation.id.to_string(),
                    donation.donor_id.to_string(),
                    donation.request_id.map(|id| id.to_string()),
                    amount,
                    donation.method.as_str(),
                    donation.status.as_str(),
                    donation.transaction_id,
                    donation.method_reference,
                    processing_fee,
                    platform_fee,
                    net,
                    donation.is_recurring,
                    donation.notes,
                    donation.created_at.to_rfc3339(),
                    donation.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_donation(&self, id: Uuid) -> Result<Option<Donation>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM donations WHERE id = ?1", DONATION_COLUMNS);
            conn.query_row(&sql, [id.to_string()], donation_from_row)
                .optional()?
                .map(DonationRow::into_donation)
                .transpose()
        })
    }

    /// Every donation made by one donor, newest first.
    pub fn list_donations_by_donor(&self, donor_id: Uuid) -> Result<Vec<Donation>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM donations WHERE donor_id = ?1 ORDER BY created_at DESC, rowid DESC",
                DONATION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([donor_id.to_string()], donation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(DonationRow::into_donation).collect()
        })
    }

    /// Completed donations against one request, newest first.
    pub fn list_completed_for_request(&self, request_id: Uuid) -> Result<Vec<Donation>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM donations WHERE request_id = ?1 AND status = 'completed'
                 ORDER BY created_at DESC, rowid DESC",
                DONATION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([request_id.to_string()], donation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(DonationRow::into_donation).collect()
        })
    }

    /// One page of donations matching `filter`, newest first.
    pub fn list_donations(&self, filter: &DonationFilter, limit: u32, offset: u64) -> Result<Vec<Donation>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM donations
                 WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR method = ?2)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?3 OFFSET ?4",
                DONATION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![
                        filter.status.map(|s| s.as_str()),
                        filter.method.map(|m| m.as_str()),
                        limit,
                        offset as i64,
                    ],
                    donation_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(DonationRow::into_donation).collect()
        })
    }

    /// Count and sums over every donation matching `filter`, ignoring paging.
    pub fn donation_totals(&self, filter: &DonationFilter) -> Result<CentTotals> {
        self.with_conn(|conn| {
            let totals = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(amount_cents), 0),
                        COALESCE(SUM(processing_fee_cents + platform_fee_cents), 0),
                        COALESCE(SUM(net_cents), 0)
                 FROM donations
                 WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR method = ?2)",
                params![filter.status.map(|s| s.as_str()), filter.method.map(|m| m.as_str())],
                |r| {
                    Ok(CentTotals {
                        count: r.get::<_, i64>(0)? as u64,
                        amount_cents: r.get(1)?,
                        fee_cents: r.get(2)?,
                        net_cents: r.get(3)?,
                    })
                },
            )?;
            Ok(totals)
        })
    }

    /// Sums over completed donations created inside `range`. In-kind
    /// contributions carry no money and are left out.
    pub fn completed_totals_between(&self, range: &DateRange) -> Result<ReportTotals> {
        let (start, end) = range.bounds();
        self.with_conn(|conn| {
            let totals = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(amount_cents), 0),
                        COALESCE(SUM(processing_fee_cents), 0),
                        COALESCE(SUM(platform_fee_cents), 0),
                        COALESCE(SUM(net_cents), 0)
                 FROM donations
                 WHERE status = 'completed' AND method != 'in-kind'
                   AND (?1 IS NULL OR julianday(created_at) >= julianday(?1))
                   AND (?2 IS NULL OR julianday(created_at) <= julianday(?2))",
                params![start, end],
                |r| {
                    Ok(ReportTotals {
                        count: r.get::<_, i64>(0)? as u64,
                        amount_cents: r.get(1)?,
                        processing_fee_cents: r.get(2)?,
                        platform_fee_cents: r.get(3)?,
                        net_cents: r.get(4)?,
                    })
                },
            )?;
            Ok(totals)
        })
    }

    /// Move a donation to `to` if and only if its current status is one of
    /// `allowed_from`. The read and the write share one transaction, and the
    /// update re-checks the status it read, so two racing transitions on the
    /// same donation cannot both apply.
    pub fn transition_donation(
        &self,
        id: Uuid,
        allowed_from: &[PaymentStatus],
        to: PaymentStatus,
        patch: &TransitionPatch,
    ) -> Result<Transition> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let id = id.to_string();

            let current: Option<String> = tx
                .query_row("SELECT status FROM donations WHERE id = ?1", [&id], |r| r.get(0))
                .optional()?;
            let Some(current) = current else {
                return Ok(Transition::Missing);
            };
            let current: PaymentStatus = current.parse()?;
            if !allowed_from.contains(&current) {
                return Ok(Transition::Rejected { current });
            }

            let now = now_timestamp();
            let refunded_at = patch.refund_reason.as_ref().map(|_| now.clone());
            let changed = tx.execute(
                "UPDATE donations SET
                    status = ?2,
                    transaction_id = COALESCE(?3, transaction_id),
                    method_reference = COALESCE(?4, method_reference),
                    refund_reason = COALESCE(?5, refund_reason),
                    refunded_at = COALESCE(?6, refunded_at),
                    refunded_by = COALESCE(?7, refunded_by),
                    updated_at = ?8
                 WHERE id = ?1 AND status = ?9",
                params![
                    id,
                    to.as_str(),
                    patch.transaction_id,
                    patch.method_reference,
                    patch.refund_reason,
                    refunded_at,
                    patch.refunded_by.map(|u| u.to_string()),
                    now,
                    current.as_str(),
                ],
            )?;
            if changed != 1 {
                return Ok(Transition::Rejected { current });
            }

            tx.commit()?;
            Ok(Transition::Applied { previous: current })
        })
    }

    /// Shift a request's received total and a donor's counters by the given
    /// deltas. Both updates are relative (`col = col + ?`) and commit together.
    pub fn adjust_totals(
        &self,
        request_id: Option<Uuid>,
        donor_id: Uuid,
        count_delta: i64,
        amount_cents_delta: i64,
        net_cents_delta: i64,
    ) -> Result<TotalsPatched> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let now = now_timestamp();

            let request_rows = match request_id {
                Some(rid) => tx.execute(
                    "UPDATE requests SET total_received_cents = total_received_cents + ?2, updated_at = ?3
                     WHERE id = ?1",
                    params![rid.to_string(), net_cents_delta, now],
                )?,
                None => 0,
            };
            let user_rows = tx.execute(
                "UPDATE users SET
                    total_donations = total_donations + ?2,
                    total_donation_cents = total_donation_cents + ?3
                 WHERE id = ?1",
                params![donor_id.to_string(), count_delta, amount_cents_delta],
            )?;

            tx.commit()?;
            Ok(TotalsPatched {
                request_rows,
                user_rows,
            })
        })
    }
}

fn donation_from_row(row: &Row<'_>) -> rusqlite::Result<DonationRow> {
    Ok(DonationRow {
        id: row.get(0)?,
        donor_id: row.get(1)?,
        request_id: row.get(2)?,
        amount_cents: row.get(3)?,
        method: row.get(4)?,
        status: row.get(5)?,
        transaction_id: row.get(6)?,
        method_reference: row.get(7)?,
        processing_fee_cents: row.get(8)?,
        platform_fee_cents: row.get(9)?,
        net_cents: row.get(10)?,
        is_recurring: row.get(11)?,
        notes: row.get(12)?,
        refund_reason: row.get(13)?,
        refunded_at: row.get(14)?,
        refunded_by: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use relief_types::models::{
        GeoPoint, Priority, RequestCategory, RequestStatus, ReliefRequest, User, UserCategory,
    };
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn user(db: &Database, email: &str) -> Uuid {
        let u = User {
            id: Uuid::new_v4(),
            email: email.into(),
            name: "Donor".into(),
            phone: None,
            category: UserCategory::Individual,
            is_admin: false,
            is_active: true,
            email_verified: false,
            phone_verified: false,
            total_donations: 0,
            total_donation_amount: Decimal::from(0),
            help_count: 0,
            badges: vec![],
            created_at: Utc::now(),
        };
        assert!(db.create_user(&u, "hash").unwrap());
        u.id
    }

    fn request(db: &Database) -> Uuid {
        let r = ReliefRequest {
            id: Uuid::new_v4(),
            owner_id: None,
            name: "Barangay 12".into(),
            phone: "09170000000".into(),
            email: None,
            category: RequestCategory::Money,
            description: "Flood relief".into(),
            location: GeoPoint { lat: 14.6, lng: 121.0 },
            address: None,
            status: RequestStatus::Pending,
            priority: Priority::High,
            is_verified: false,
            verified_by: None,
            verified_at: None,
            is_active: true,
            wallet_number: Some("09171234567".into()),
            bank_account: None,
            funding_goal: Some(Decimal::from(50000)),
            total_received: Decimal::from(0),
            helpers: vec![],
            created_at: Utc::now(),
        };
        db.insert_request(&r).unwrap();
        r.id
    }

    fn donation(donor: Uuid, request: Option<Uuid>, status: PaymentStatus) -> Donation {
        let now = Utc::now();
        Donation {
            id: Uuid::new_v4(),
            donor_id: donor,
            request_id: request,
            amount: Decimal::from(1000),
            method: PaymentMethod::Gcash,
            status,
            transaction_id: None,
            method_reference: None,
            processing_fee: Decimal::from(25),
            platform_fee: Decimal::from(25),
            net_amount: Decimal::from(950),
            is_recurring: false,
            notes: None,
            refund: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn transition_is_guarded_by_current_status() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "a@example.com");
        let d = donation(donor, None, PaymentStatus::Pending);
        db.insert_donation(&d).unwrap();

        let patch = TransitionPatch {
            transaction_id: Some("REF-1".into()),
            ..Default::default()
        };
        let first = db
            .transition_donation(d.id, &[PaymentStatus::Pending], PaymentStatus::Completed, &patch)
            .unwrap();
        assert_eq!(first, Transition::Applied { previous: PaymentStatus::Pending });

        let second = db
            .transition_donation(d.id, &[PaymentStatus::Pending], PaymentStatus::Completed, &patch)
            .unwrap();
        assert_eq!(second, Transition::Rejected { current: PaymentStatus::Completed });

        let stored = db.get_donation(d.id).unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Completed);
        assert_eq!(stored.transaction_id.as_deref(), Some("REF-1"));

        let missing = db
            .transition_donation(Uuid::new_v4(), &[PaymentStatus::Pending], PaymentStatus::Completed, &patch)
            .unwrap();
        assert_eq!(missing, Transition::Missing);
    }

    #[test]
    fn refund_patch_records_who_and_why() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "a@example.com");
        let admin = user(&db, "admin@example.com");
        let d = donation(donor, None, PaymentStatus::Completed);
        db.insert_donation(&d).unwrap();

        let patch = TransitionPatch {
            refund_reason: Some("duplicate charge".into()),
            refunded_by: Some(admin),
            ..Default::default()
        };
        db.transition_donation(d.id, &[PaymentStatus::Completed], PaymentStatus::Refunded, &patch)
            .unwrap();

        let stored = db.get_donation(d.id).unwrap().unwrap();
        let refund = stored.refund.unwrap();
        assert_eq!(refund.reason, "duplicate charge");
        assert_eq!(refund.refunded_by, admin);
    }

    #[test]
    fn concurrent_adjustments_do_not_lose_updates() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let donor = user(&db, "a@example.com");
        let rid = request(&db);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        db.adjust_totals(Some(rid), donor, 1, 100_000, 95_000).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let req = db.get_request(rid).unwrap().unwrap();
        assert_eq!(req.total_received, Decimal::from(190000));
        let u = db.get_user(donor).unwrap().unwrap();
        assert_eq!(u.total_donations, 200);
        assert_eq!(u.total_donation_amount, Decimal::from(200000));
    }

    #[test]
    fn adjust_totals_reports_missing_rows() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "a@example.com");
        let patched = db.adjust_totals(Some(Uuid::new_v4()), donor, 1, 100, 90).unwrap();
        assert_eq!(patched, TotalsPatched { request_rows: 0, user_rows: 1 });
    }

    #[test]
    fn totals_follow_filter() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "a@example.com");
        db.insert_donation(&donation(donor, None, PaymentStatus::Completed)).unwrap();
        db.insert_donation(&donation(donor, None, PaymentStatus::Completed)).unwrap();
        db.insert_donation(&donation(donor, None, PaymentStatus::Pending)).unwrap();

        let filter = DonationFilter {
            status: Some(PaymentStatus::Completed),
            method: None,
        };
        let totals = db.donation_totals(&filter).unwrap();
        assert_eq!(totals.count, 2);
        assert_eq!(totals.amount_cents, 200_000);
        assert_eq!(totals.fee_cents, 10_000);
        assert_eq!(totals.net_cents, 190_000);

        let page = db.list_donations(&filter, 1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(db.list_donations_by_donor(donor).unwrap().len(), 3);
    }

    #[test]
    fn report_totals_respect_window_and_skip_in_kind() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "a@example.com");

        let mut old = donation(donor, None, PaymentStatus::Completed);
        old.created_at = Utc::now() - chrono::Duration::days(40);
        db.insert_donation(&old).unwrap();
        db.insert_donation(&donation(donor, None, PaymentStatus::Completed)).unwrap();
        db.insert_donation(&donation(donor, None, PaymentStatus::Pending)).unwrap();
        let mut goods = donation(donor, None, PaymentStatus::Completed);
        goods.method = PaymentMethod::InKind;
        db.insert_donation(&goods).unwrap();

        let all = db.completed_totals_between(&DateRange::default()).unwrap();
        assert_eq!(all.count, 2);
        assert_eq!(all.amount_cents, 200_000);
        assert_eq!(all.processing_fee_cents, 5_000);
        assert_eq!(all.platform_fee_cents, 5_000);
        assert_eq!(all.net_cents, 190_000);

        let recent = DateRange {
            start: Some(Utc::now() - chrono::Duration::days(30)),
            end: None,
        };
        assert_eq!(db.completed_totals_between(&recent).unwrap().count, 1);

        let before = DateRange {
            start: None,
            end: Some(Utc::now() - chrono::Duration::days(30)),
        };
        assert_eq!(db.completed_totals_between(&before).unwrap().count, 1);
    }

    #[test]
    fn completed_listing_skips_other_statuses() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "a@example.com");
        let rid = request(&db);
        db.insert_donation(&donation(donor, Some(rid), PaymentStatus::Completed)).unwrap();
        db.insert_donation(&donation(donor, Some(rid), PaymentStatus::Pending)).unwrap();

        let listed = db.list_completed_for_request(rid).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, PaymentStatus::Completed);
    }
}
