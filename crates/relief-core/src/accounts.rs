use relief_db::Database;
use relief_db::ledger::DonationFilter;
use relief_types::api::{AdminStats, AdminUserUpdate, DonationTotals, UpdateProfileRequest};
use relief_types::models::{Identity, PaymentStatus, RequestStatus, User};
use relief_types::money::from_cents;
use tracing::info;
use uuid::Uuid;

use crate::donations::require_admin;
use crate::error::{CoreError, CoreResult};

pub fn profile(db: &Database, caller: Identity) -> CoreResult<User> {
    db.get_user(caller.user_id)?.ok_or(CoreError::NotFound("user"))
}

pub fn update_profile(db: &Database, caller: Identity, body: &UpdateProfileRequest) -> CoreResult<User> {
    let name = body.name.as_deref().map(str::trim);
    if name == Some("") {
        return Err(CoreError::validation("name cannot be empty"));
    }
    let phone = body.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

    db.update_profile(caller.user_id, name, phone)?;
    profile(db, caller)
}

/// Admin edit of flags and category. Donation statistics are not writable.
pub fn admin_update_user(db: &Database, caller: Identity, id: Uuid, body: &AdminUserUpdate) -> CoreResult<User> {
    require_admin(caller)?;
    if caller.user_id == id && (body.is_admin == Some(false) || body.is_active == Some(false)) {
        return Err(CoreError::conflict("administrators cannot demote or deactivate themselves"));
    }
    if db.admin_update_user(id, body)? == 0 {
        return Err(CoreError::NotFound("user"));
    }
    info!("User {} updated by admin {}", id, caller.user_id);
    db.get_user(id)?.ok_or(CoreError::NotFound("user"))
}

pub fn stats(db: &Database, caller: Identity) -> CoreResult<AdminStats> {
    require_admin(caller)?;
    let completed = db.donation_totals(&DonationFilter {
        status: Some(PaymentStatus::Completed),
        method: None,
    })?;

    Ok(AdminStats {
        total_users: db.count_users(false)?,
        active_users: db.count_users(true)?,
        total_requests: db.count_requests(None)?,
        pending_requests: db.count_requests(Some(RequestStatus::Pending))?,
        completed_donations: completed.count,
        donations: DonationTotals {
            total_amount: from_cents(completed.amount_cents),
            total_fees: from_cents(completed.fee_cents),
            total_net: from_cents(completed.net_cents),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{admin, insert_request, insert_user};
    use relief_types::models::UserCategory;

    fn me(id: Uuid) -> Identity {
        Identity {
            user_id: id,
            is_admin: false,
        }
    }

    #[test]
    fn profile_update_keeps_unset_fields() {
        let db = Database::open_in_memory().unwrap();
        let id = insert_user(&db, "juan@example.com");

        let body = UpdateProfileRequest {
            name: None,
            phone: Some("09181112222".into()),
        };
        let user = update_profile(&db, me(id), &body).unwrap();
        assert_eq!(user.name, "juan");
        assert_eq!(user.phone.as_deref(), Some("09181112222"));

        let blank = UpdateProfileRequest {
            name: Some("  ".into()),
            phone: None,
        };
        assert!(matches!(update_profile(&db, me(id), &blank), Err(CoreError::Validation(_))));
    }

    #[test]
    fn admin_updates_flags() {
        let db = Database::open_in_memory().unwrap();
        let boss = insert_user(&db, "boss@example.com");
        let target = insert_user(&db, "org@example.com");

        let body = AdminUserUpdate {
            category: Some(UserCategory::Organization),
            email_verified: Some(true),
            ..Default::default()
        };
        assert!(matches!(
            admin_update_user(&db, me(boss), target, &body),
            Err(CoreError::Forbidden(_))
        ));

        let user = admin_update_user(&db, admin(boss), target, &body).unwrap();
        assert_eq!(user.category, UserCategory::Organization);
        assert!(user.email_verified);

        let missing = admin_update_user(&db, admin(boss), Uuid::new_v4(), &body);
        assert!(matches!(missing, Err(CoreError::NotFound("user"))));

        let demote = AdminUserUpdate {
            is_admin: Some(false),
            ..Default::default()
        };
        assert!(matches!(
            admin_update_user(&db, admin(boss), boss, &demote),
            Err(CoreError::Conflict(_))
        ));
    }

    #[test]
    fn stats_count_everything() {
        let db = Database::open_in_memory().unwrap();
        let boss = insert_user(&db, "boss@example.com");
        insert_request(&db, None);
        insert_request(&db, Some(boss));

        let s = stats(&db, admin(boss)).unwrap();
        assert_eq!(s.total_users, 1);
        assert_eq!(s.active_users, 1);
        assert_eq!(s.total_requests, 2);
        assert_eq!(s.pending_requests, 2);
        assert_eq!(s.completed_donations, 0);
        assert!(matches!(stats(&db, me(boss)), Err(CoreError::Forbidden(_))));
    }
}
