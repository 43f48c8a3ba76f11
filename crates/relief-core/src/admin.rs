//! Back-office views: account and request listings, platform reports and
//! bulk moderation.

use relief_db::Database;
use relief_db::queries::{AdminRequestFilter, DateRange, UserFilter};
use relief_types::api::{
    AdminRequestQuery, AdminUserDetail, AdminUserQuery, AdminUserStats, BulkAction, BulkResult,
    CategoryCount, DonationSummary, PlatformReport, ReportPeriod, ReportQuery, RequestBreakdown,
    RequestPage, UserPage,
};
use relief_types::models::Identity;
use relief_types::money::from_cents;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;
use uuid::Uuid;

use crate::donations::require_admin;
use crate::error::{CoreError, CoreResult};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;
const MAX_BULK_IDS: usize = 500;

/// A resolved `page`/`limit` pair. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Paging {
    pub page: u32,
    pub limit: u32,
}

impl Paging {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

pub fn list_users(db: &Database, caller: Identity, query: &AdminUserQuery) -> CoreResult<UserPage> {
    require_admin(caller)?;
    let paging = Paging::new(query.page, query.limit);
    let filter = UserFilter {
        category: query.category,
        is_active: query.is_active,
        search: query.search.clone(),
    };

    let users = db.search_users(&filter, paging.limit, paging.offset())?;
    let total = db.count_matching_users(&filter)?;
    Ok(UserPage {
        count: users.len(),
        total,
        total_pages: paging.total_pages(total),
        current_page: paging.page,
        users,
    })
}

/// A user together with the requests they filed and the donations they made.
pub fn user_detail(db: &Database, caller: Identity, id: Uuid) -> CoreResult<AdminUserDetail> {
    require_admin(caller)?;
    let user = db.get_user(id)?.ok_or(CoreError::NotFound("user"))?;
    let requests = db.list_requests_by_owner(id)?;
    let donations = db.list_donations_by_donor(id)?;

    let stats = AdminUserStats {
        total_requests: requests.len(),
        total_donations: donations.len(),
        total_amount: user.total_donation_amount,
    };
    Ok(AdminUserDetail {
        user,
        requests,
        donations,
        stats,
    })
}

pub fn list_requests(db: &Database, caller: Identity, query: &AdminRequestQuery) -> CoreResult<RequestPage> {
    require_admin(caller)?;
    let paging = Paging::new(query.page, query.limit);
    let filter = AdminRequestFilter {
        category: query.category,
        status: query.status,
        is_verified: query.is_verified,
        priority: query.priority,
    };

    let requests = db.admin_list_requests(&filter, paging.limit, paging.offset())?;
    let total = db.count_admin_requests(&filter)?;
    Ok(RequestPage {
        count: requests.len(),
        total,
        total_pages: paging.total_pages(total),
        current_page: paging.page,
        requests,
    })
}

/// Platform summary over an optional creation-time window. Either bound may
/// be left open.
pub fn report(db: &Database, caller: Identity, query: &ReportQuery) -> CoreResult<PlatformReport> {
    require_admin(caller)?;
    if let (Some(start), Some(end)) = (query.start, query.end) {
        if start > end {
            return Err(CoreError::validation("start must not be after end"));
        }
    }
    let range = DateRange {
        start: query.start,
        end: query.end,
    };

    let users_by_category = db
        .users_by_category(&range)?
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();
    let requests_by_category_status = db
        .requests_by_category_status(&range)?
        .into_iter()
        .map(|(category, status, count)| RequestBreakdown {
            category,
            status,
            count,
        })
        .collect();

    let totals = db.completed_totals_between(&range)?;
    let total_amount = from_cents(totals.amount_cents);
    let average_donation = if totals.count == 0 {
        Decimal::ZERO
    } else {
        (total_amount / Decimal::from(totals.count)).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    };

    Ok(PlatformReport {
        period: ReportPeriod {
            start: query.start,
            end: query.end,
        },
        generated_at: chrono::Utc::now(),
        users_by_category,
        requests_by_category_status,
        donations: DonationSummary {
            count: totals.count,
            total_amount,
            total_processing_fees: from_cents(totals.processing_fee_cents),
            total_platform_fees: from_cents(totals.platform_fee_cents),
            total_net: from_cents(totals.net_cents),
            average_donation,
        },
    })
}

/// Apply one moderation action to many ids in a single transaction.
/// Unknown ids are skipped; `matched` counts the ones that exist.
pub fn bulk(db: &Database, caller: Identity, action: BulkAction, ids: &[Uuid]) -> CoreResult<BulkResult> {
    require_admin(caller)?;
    if ids.is_empty() {
        return Err(CoreError::validation("ids must not be empty"));
    }
    if ids.len() > MAX_BULK_IDS {
        return Err(CoreError::Validation(format!("at most {} ids per call", MAX_BULK_IDS)));
    }
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let outcome = match action {
        BulkAction::VerifyRequests => db.verify_requests(&ids, caller.user_id)?,
        BulkAction::ActivateUsers => db.set_users_active(&ids, true)?,
        BulkAction::DeactivateUsers => {
            if ids.contains(&caller.user_id) {
                return Err(CoreError::conflict("administrators cannot deactivate themselves"));
            }
            db.set_users_active(&ids, false)?
        }
    };

    info!(
        "Bulk {:?} by admin {}: {} matched, {} modified",
        action, caller.user_id, outcome.matched, outcome.modified
    );
    Ok(BulkResult {
        action,
        matched: outcome.matched,
        modified: outcome.modified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::donations::DonationLedger;
    use crate::fees::DonationLimits;
    use crate::gateway::SandboxGateway;
    use crate::testutil::{admin, insert_request, insert_user, wallet_request};
    use chrono::{Duration, Utc};
    use relief_types::api::{AdminUserUpdate, WalletDonationRequest};
    use relief_types::models::{RequestCategory, RequestStatus, UserCategory};
    use std::sync::Arc;

    fn member(id: Uuid) -> Identity {
        Identity {
            user_id: id,
            is_admin: false,
        }
    }

    #[test]
    fn paging_defaults_and_bounds() {
        assert_eq!(Paging::new(None, None), Paging { page: 1, limit: 20 });
        assert_eq!(Paging::new(Some(0), Some(500)), Paging { page: 1, limit: 100 });
        let p = Paging::new(Some(3), Some(2));
        assert_eq!(p.offset(), 4);
        assert_eq!(p.total_pages(5), 3);
        assert_eq!(p.total_pages(0), 0);
    }

    #[test]
    fn user_listing_filters_and_pages() {
        let db = Database::open_in_memory().unwrap();
        let boss = insert_user(&db, "boss@example.com");
        for i in 0..4 {
            insert_user(&db, &format!("donor{}@example.com", i));
        }
        let org = insert_user(&db, "red-cross@example.com");
        let update = AdminUserUpdate {
            category: Some(UserCategory::Organization),
            ..Default::default()
        };
        db.admin_update_user(org, &update).unwrap();

        let query = AdminUserQuery {
            search: Some("donor".into()),
            limit: Some(3),
            page: Some(2),
            ..Default::default()
        };
        let page = list_users(&db, admin(boss), &query).unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.count, 1);
        assert_eq!(page.current_page, 2);

        let orgs = AdminUserQuery {
            category: Some(UserCategory::Organization),
            ..Default::default()
        };
        let page = list_users(&db, admin(boss), &orgs).unwrap();
        assert_eq!(page.users.len(), 1);
        assert_eq!(page.users[0].id, org);

        assert!(matches!(list_users(&db, member(boss), &orgs), Err(CoreError::Forbidden(_))));
    }

    #[test]
    fn user_detail_gathers_activity() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let boss = insert_user(&db, "boss@example.com");
        let donor = insert_user(&db, "donor@example.com");
        insert_request(&db, Some(donor));
        let rid = wallet_request(&db);

        let ledger = DonationLedger::new(Arc::clone(&db), Arc::new(SandboxGateway), DonationLimits::default());
        let pledge = ledger
            .donate_wallet(
                member(donor),
                WalletDonationRequest {
                    request_id: rid,
                    amount: Decimal::from(2000),
                    reference_number: None,
                    notes: None,
                },
            )
            .unwrap();
        ledger.confirm(member(donor), pledge.donation.id, "GC-1").unwrap();
        ledger
            .donate_wallet(
                member(donor),
                WalletDonationRequest {
                    request_id: rid,
                    amount: Decimal::from(100),
                    reference_number: None,
                    notes: None,
                },
            )
            .unwrap();

        let detail = user_detail(&db, admin(boss), donor).unwrap();
        assert_eq!(detail.user.id, donor);
        assert_eq!(detail.stats.total_requests, 1);
        assert_eq!(detail.stats.total_donations, 2);
        assert_eq!(detail.stats.total_amount, Decimal::from(2000));

        let missing = user_detail(&db, admin(boss), Uuid::new_v4());
        assert!(matches!(missing, Err(CoreError::NotFound("user"))));
    }

    #[test]
    fn request_listing_includes_inactive() {
        let db = Database::open_in_memory().unwrap();
        let boss = insert_user(&db, "boss@example.com");
        let gone = insert_request(&db, None);
        insert_request(&db, None);
        db.deactivate_request(gone).unwrap();

        let page = list_requests(&db, admin(boss), &AdminRequestQuery::default()).unwrap();
        assert_eq!(page.total, 2);
        assert!(page.requests.iter().any(|r| r.id == gone && !r.is_active));

        let query = AdminRequestQuery {
            category: Some(RequestCategory::Money),
            ..Default::default()
        };
        assert_eq!(list_requests(&db, admin(boss), &query).unwrap().total, 0);
    }

    #[test]
    fn report_sums_completed_money_donations() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let boss = insert_user(&db, "boss@example.com");
        let donor = insert_user(&db, "donor@example.com");
        let rid = wallet_request(&db);
        let ledger = DonationLedger::new(Arc::clone(&db), Arc::new(SandboxGateway), DonationLimits::default());

        for amount in [100, 200] {
            let pledge = ledger
                .donate_wallet(
                    member(donor),
                    WalletDonationRequest {
                        request_id: rid,
                        amount: Decimal::from(amount),
                        reference_number: None,
                        notes: None,
                    },
                )
                .unwrap();
            ledger.confirm(member(donor), pledge.donation.id, "GC").unwrap();
        }

        let summary = report(&db, admin(boss), &ReportQuery::default()).unwrap();
        let d = summary.donations;
        assert_eq!(d.count, 2);
        assert_eq!(d.total_amount, Decimal::from(300));
        assert_eq!(d.total_processing_fees, Decimal::new(750, 2));
        assert_eq!(d.total_platform_fees, Decimal::new(750, 2));
        assert_eq!(d.total_net, Decimal::from(285));
        assert_eq!(d.average_donation, Decimal::from(150));
        assert_eq!(summary.users_by_category.len(), 1);
        assert_eq!(summary.users_by_category[0].count, 2);
        assert_eq!(summary.requests_by_category_status.len(), 1);
        assert_eq!(summary.requests_by_category_status[0].status, RequestStatus::Pending);

        let future = ReportQuery {
            start: Some(Utc::now() + Duration::days(1)),
            end: None,
        };
        let empty = report(&db, admin(boss), &future).unwrap();
        assert_eq!(empty.donations, DonationSummary::default());
        assert!(empty.users_by_category.is_empty());

        let backwards = ReportQuery {
            start: Some(Utc::now()),
            end: Some(Utc::now() - Duration::days(1)),
        };
        assert!(matches!(
            report(&db, admin(boss), &backwards),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn bulk_actions() {
        let db = Database::open_in_memory().unwrap();
        let boss = insert_user(&db, "boss@example.com");
        let a = insert_user(&db, "a@example.com");
        let b = insert_user(&db, "b@example.com");
        let r1 = insert_request(&db, None);
        let r2 = insert_request(&db, None);

        let out = bulk(&db, admin(boss), BulkAction::VerifyRequests, &[r1, r2, r1]).unwrap();
        assert_eq!((out.matched, out.modified), (2, 2));
        assert_eq!(db.get_request(r1).unwrap().unwrap().verified_by, Some(boss));

        let out = bulk(&db, admin(boss), BulkAction::DeactivateUsers, &[a, b, Uuid::new_v4()]).unwrap();
        assert_eq!((out.matched, out.modified), (2, 2));
        assert!(!db.get_user(a).unwrap().unwrap().is_active);

        let out = bulk(&db, admin(boss), BulkAction::ActivateUsers, &[a]).unwrap();
        assert_eq!(out.modified, 1);
        assert!(db.get_user(a).unwrap().unwrap().is_active);

        assert!(matches!(
            bulk(&db, admin(boss), BulkAction::DeactivateUsers, &[a, boss]),
            Err(CoreError::Conflict(_))
        ));
        assert!(db.get_user(a).unwrap().unwrap().is_active);
        assert!(matches!(
            bulk(&db, admin(boss), BulkAction::ActivateUsers, &[]),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            bulk(&db, member(boss), BulkAction::ActivateUsers, &[a]),
            Err(CoreError::Forbidden(_))
        ));
    }
}
