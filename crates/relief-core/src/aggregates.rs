use relief_db::Database;
use relief_types::models::Donation;
use relief_types::money::to_cents;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// The donation's status change committed, but its totals were not patched.
#[derive(Debug, Error)]
#[error("totals for donation {donation_id} were not updated: {source}")]
pub struct AggregateUpdateError {
    pub donation_id: Uuid,
    #[source]
    pub source: anyhow::Error,
}

/// Add a newly completed donation to its request's received total and its
/// donor's counters.
pub fn apply(db: &Database, donation: &Donation) -> Result<(), AggregateUpdateError> {
    patch(db, donation, 1)
}

/// Exact inverse of [`apply`], used when a completed donation leaves the
/// completed state.
pub fn reverse(db: &Database, donation: &Donation) -> Result<(), AggregateUpdateError> {
    patch(db, donation, -1)
}

fn patch(db: &Database, donation: &Donation, sign: i64) -> Result<(), AggregateUpdateError> {
    if !donation.method.is_ledger() {
        return Ok(());
    }

    let fail = |source: anyhow::Error| AggregateUpdateError {
        donation_id: donation.id,
        source,
    };
    let (Some(amount_cents), Some(net_cents)) = (to_cents(donation.amount), to_cents(donation.net_amount)) else {
        return Err(fail(anyhow::anyhow!("amount {} is out of range", donation.amount)));
    };

    let patched = db
        .adjust_totals(
            donation.request_id,
            donation.donor_id,
            sign,
            sign * amount_cents,
            sign * net_cents,
        )
        .map_err(fail)?;

    if let Some(rid) = donation.request_id {
        if patched.request_rows == 0 {
            warn!("Request {} gone, skipped total for donation {}", rid, donation.id);
        }
    }
    if patched.user_rows == 0 {
        warn!("Donor {} gone, skipped stats for donation {}", donation.donor_id, donation.id);
    }
    debug!("Aggregates patched (sign {}) for donation {}", sign, donation.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::calculate_fees;
    use crate::testutil::{insert_request, insert_user};
    use chrono::Utc;
    use relief_types::models::{PaymentMethod, PaymentStatus};
    use rust_decimal::Decimal;

    fn completed(donor: Uuid, request: Option<Uuid>, amount: i64, method: PaymentMethod) -> Donation {
        let amount = Decimal::from(amount);
        let fees = calculate_fees(amount);
        Donation {
            id: Uuid::new_v4(),
            donor_id: donor,
            request_id: request,
            amount,
            method,
            status: PaymentStatus::Completed,
            transaction_id: None,
            method_reference: None,
            processing_fee: fees.processing_fee,
            platform_fee: fees.platform_fee,
            net_amount: fees.net_amount,
            is_recurring: false,
            notes: None,
            refund: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn apply_then_reverse_restores_totals() {
        let db = Database::open_in_memory().unwrap();
        let donor = insert_user(&db, "donor@example.com");
        let rid = insert_request(&db, None);

        db.adjust_totals(Some(rid), donor, 0, 0, 300_000).unwrap();
        let d = completed(donor, Some(rid), 5000, PaymentMethod::Gcash);

        apply(&db, &d).unwrap();
        let req = db.get_request(rid).unwrap().unwrap();
        assert_eq!(req.total_received, Decimal::from(3000) + d.net_amount);
        let user = db.get_user(donor).unwrap().unwrap();
        assert_eq!(user.total_donations, 1);
        assert_eq!(user.total_donation_amount, Decimal::from(5000));

        reverse(&db, &d).unwrap();
        let req = db.get_request(rid).unwrap().unwrap();
        assert_eq!(req.total_received, Decimal::from(3000));
        let user = db.get_user(donor).unwrap().unwrap();
        assert_eq!(user.total_donations, 0);
        assert_eq!(user.total_donation_amount, Decimal::ZERO);
    }

    #[test]
    fn in_kind_never_touches_totals() {
        let db = Database::open_in_memory().unwrap();
        let donor = insert_user(&db, "donor@example.com");
        let rid = insert_request(&db, None);

        apply(&db, &completed(donor, Some(rid), 500, PaymentMethod::InKind)).unwrap();
        assert_eq!(db.get_request(rid).unwrap().unwrap().total_received, Decimal::ZERO);
        assert_eq!(db.get_user(donor).unwrap().unwrap().total_donations, 0);
    }

    #[test]
    fn missing_request_is_skipped() {
        let db = Database::open_in_memory().unwrap();
        let donor = insert_user(&db, "donor@example.com");
        let d = completed(donor, Some(Uuid::new_v4()), 100, PaymentMethod::Stripe);

        apply(&db, &d).unwrap();
        assert_eq!(db.get_user(donor).unwrap().unwrap().total_donation_amount, Decimal::from(100));
    }
}
