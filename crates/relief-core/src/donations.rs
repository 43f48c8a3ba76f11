use std::sync::Arc;

use chrono::Utc;
use relief_db::Database;
use relief_db::ledger::{DonationFilter, Transition, TransitionPatch};
use relief_types::api::{
    AdminDonationQuery, CardDonationRequest, DonationPage, DonationTotals, FeeBreakdown,
    InKindDonationRequest, RequestDonations, WalletDonationRequest,
};
use relief_types::models::{Donation, Identity, PaymentMethod, PaymentStatus, ReliefRequest};
use relief_types::money::from_cents;
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::admin::Paging;
use crate::aggregates;
use crate::badges;
use crate::error::{CoreError, CoreResult};
use crate::fees::{DonationLimits, calculate_fees, no_fees, recorded_fees};
use crate::gateway::PaymentGateway;
use crate::run_blocking;

/// Statuses a donation may be in for a move to `to` to be accepted.
/// Terminal and same-state moves have no sources.
pub fn allowed_sources(to: PaymentStatus) -> &'static [PaymentStatus] {
    match to {
        PaymentStatus::Pending => &[],
        PaymentStatus::Completed => &[PaymentStatus::Pending],
        PaymentStatus::Failed => &[PaymentStatus::Pending, PaymentStatus::Completed],
        PaymentStatus::Refunded => &[PaymentStatus::Completed],
    }
}

pub fn transition_allowed(from: PaymentStatus, to: PaymentStatus) -> bool {
    allowed_sources(to).contains(&from)
}

/// A committed donation change. `warning` is set when the donation itself
/// was saved but its totals or badges could not be brought up to date.
#[derive(Debug)]
pub struct LedgerOutcome {
    pub donation: Donation,
    pub fees: FeeBreakdown,
    pub warning: Option<String>,
}

/// A wallet pledge awaiting the donor's transfer and confirmation.
#[derive(Debug)]
pub struct WalletPledge {
    pub donation: Donation,
    pub fees: FeeBreakdown,
    pub wallet_number: String,
}

/// Donation creation, transitions and listings.
#[derive(Clone)]
pub struct DonationLedger {
    db: Arc<Database>,
    gateway: Arc<dyn PaymentGateway>,
    limits: DonationLimits,
}

impl DonationLedger {
    pub fn new(db: Arc<Database>, gateway: Arc<dyn PaymentGateway>, limits: DonationLimits) -> Self {
        Self { db, gateway, limits }
    }

    pub fn limits(&self) -> DonationLimits {
        self.limits
    }

    /// Fee breakdown for a prospective donation, using the same calculator
    /// as creation.
    pub fn quote(&self, amount: Decimal) -> CoreResult<FeeBreakdown> {
        self.limits.check(amount)?;
        Ok(calculate_fees(amount))
    }

    /// Charge a card through the gateway and record the result.
    ///
    /// Gateway errors propagate and nothing is recorded. An accepted but
    /// unsettled charge is recorded as pending for later reconciliation.
    pub async fn donate_card(&self, donor: Identity, req: CardDonationRequest) -> CoreResult<LedgerOutcome> {
        self.limits.check(req.amount)?;
        let token = req.payment_method_id.trim().to_string();
        if token.is_empty() {
            return Err(CoreError::validation("payment_method_id is required"));
        }

        if let Some(rid) = req.request_id {
            let db = Arc::clone(&self.db);
            run_blocking(move || active_request(&db, rid).map(|_| ())).await?;
        }

        let fees = calculate_fees(req.amount);
        let charge = self.gateway.authorize_charge(req.amount, &token).await?;
        let status = if charge.succeeded {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Pending
        };

        let donation = new_donation(
            donor.user_id,
            req.request_id,
            req.amount,
            PaymentMethod::Stripe,
            status,
            fees,
            Some(charge.external_id.clone()),
            Some(charge.external_id),
            req.is_recurring,
            req.notes,
        );

        let ledger = self.clone();
        run_blocking(move || {
            if let Err(e) = ledger.db.insert_donation(&donation) {
                error!(
                    "Card charge {} for donor {} went through at the gateway but was not recorded: {:#}",
                    donation.transaction_id.as_deref().unwrap_or_default(),
                    donation.donor_id,
                    e
                );
                return Err(e.into());
            }
            info!(
                "Card donation {} of {} by {} recorded as {}",
                donation.id, donation.amount, donation.donor_id, donation.status
            );
            let warning = if donation.status == PaymentStatus::Completed {
                ledger.settle(&donation)
            } else {
                None
            };
            Ok(LedgerOutcome {
                donation,
                fees,
                warning,
            })
        })
        .await
    }

    /// Record a pending wallet pledge against a request that publishes a
    /// wallet number.
    pub fn donate_wallet(&self, donor: Identity, req: WalletDonationRequest) -> CoreResult<WalletPledge> {
        self.limits.check(req.amount)?;
        let request = active_request(&self.db, req.request_id)?;
        let wallet_number = request
            .wallet_number
            .filter(|w| !w.trim().is_empty())
            .ok_or_else(|| CoreError::validation("request does not accept wallet transfers"))?;

        let fees = calculate_fees(req.amount);
        let reference = req.reference_number.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let donation = new_donation(
            donor.user_id,
            Some(request.id),
            req.amount,
            PaymentMethod::Gcash,
            PaymentStatus::Pending,
            fees,
            None,
            reference,
            false,
            req.notes,
        );
        self.db.insert_donation(&donation)?;
        info!("Wallet pledge {} of {} by {}", donation.id, donation.amount, donation.donor_id);

        Ok(WalletPledge {
            donation,
            fees,
            wallet_number,
        })
    }

    /// Record an in-kind contribution. It carries no fees and is kept out
    /// of every money total.
    pub fn donate_in_kind(&self, donor: Identity, req: InKindDonationRequest) -> CoreResult<LedgerOutcome> {
        self.limits.check(req.amount)?;
        if let Some(rid) = req.request_id {
            active_request(&self.db, rid)?;
        }

        let fees = no_fees(req.amount);
        let donation = new_donation(
            donor.user_id,
            req.request_id,
            req.amount,
            PaymentMethod::InKind,
            PaymentStatus::Completed,
            fees,
            None,
            None,
            false,
            req.notes,
        );
        self.db.insert_donation(&donation)?;
        info!("In-kind donation {} by {}", donation.id, donation.donor_id);

        Ok(LedgerOutcome {
            donation,
            fees,
            warning: None,
        })
    }

    /// Donor confirms a wallet transfer with the reference code the wallet
    /// issued.
    pub fn confirm(&self, caller: Identity, id: Uuid, reference: &str) -> CoreResult<LedgerOutcome> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(CoreError::validation("reference_number is required"));
        }

        let donation = self.load(id)?;
        if donation.donor_id != caller.user_id {
            return Err(CoreError::forbidden("only the donor can confirm this donation"));
        }
        if donation.method != PaymentMethod::Gcash {
            return Err(CoreError::conflict("only wallet donations are confirmed by reference"));
        }

        let patch = TransitionPatch {
            transaction_id: Some(reference.to_string()),
            method_reference: Some(reference.to_string()),
            ..Default::default()
        };
        self.transition(id, PaymentStatus::Completed, &patch)?;

        let donation = self.load(id)?;
        info!("Donation {} confirmed by donor", id);
        let warning = self.settle(&donation);
        Ok(self.outcome(donation, warning))
    }

    /// Admin refund of a completed money donation. Totals are reversed;
    /// badges already earned are kept.
    pub fn refund(&self, caller: Identity, id: Uuid, reason: &str) -> CoreResult<LedgerOutcome> {
        require_admin(caller)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CoreError::validation("refund reason is required"));
        }

        let donation = self.load(id)?;
        if !donation.method.is_ledger() {
            return Err(CoreError::conflict("in-kind donations cannot be refunded"));
        }

        let patch = TransitionPatch {
            refund_reason: Some(reason.to_string()),
            refunded_by: Some(caller.user_id),
            ..Default::default()
        };
        self.transition(id, PaymentStatus::Refunded, &patch)?;

        let donation = self.load(id)?;
        info!("Donation {} refunded by {}", id, caller.user_id);
        let warning = self.unsettle(&donation);
        Ok(self.outcome(donation, warning))
    }

    /// Apply a gateway's final word on a card charge.
    pub fn record_gateway_outcome(&self, caller: Identity, id: Uuid, succeeded: bool) -> CoreResult<LedgerOutcome> {
        require_admin(caller)?;
        let donation = self.load(id)?;
        if donation.method != PaymentMethod::Stripe {
            return Err(CoreError::conflict("only card donations have gateway outcomes"));
        }

        let to = if succeeded {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        };
        let previous = self.transition(id, to, &TransitionPatch::default())?;

        let donation = self.load(id)?;
        info!("Gateway outcome for donation {}: {} -> {}", id, previous, to);
        let warning = match (previous, to) {
            (PaymentStatus::Pending, PaymentStatus::Completed) => self.settle(&donation),
            (PaymentStatus::Completed, PaymentStatus::Failed) => self.unsettle(&donation),
            _ => None,
        };
        Ok(self.outcome(donation, warning))
    }

    pub fn get(&self, caller: Identity, id: Uuid) -> CoreResult<Donation> {
        let donation = self.load(id)?;
        if !caller.is_admin && donation.donor_id != caller.user_id {
            return Err(CoreError::forbidden("not your donation"));
        }
        Ok(donation)
    }

    pub fn donations_by(&self, donor: Identity) -> CoreResult<Vec<Donation>> {
        Ok(self.db.list_donations_by_donor(donor.user_id)?)
    }

    /// Completed donations for one request with their summed net.
    pub fn donations_for_request(&self, request_id: Uuid) -> CoreResult<RequestDonations> {
        if self.db.get_request(request_id)?.is_none() {
            return Err(CoreError::NotFound("request"));
        }
        let donations = self.db.list_completed_for_request(request_id)?;
        let total = donations.iter().map(|d| d.net_amount).sum();
        Ok(RequestDonations {
            count: donations.len(),
            total,
            donations,
        })
    }

    pub fn admin_list(&self, caller: Identity, query: &AdminDonationQuery) -> CoreResult<DonationPage> {
        require_admin(caller)?;
        let paging = Paging::new(query.page, query.limit);

        let filter = DonationFilter {
            status: query.status,
            method: query.method,
        };
        let donations = self.db.list_donations(&filter, paging.limit, paging.offset())?;
        let totals = self.db.donation_totals(&filter)?;

        Ok(DonationPage {
            count: donations.len(),
            total: totals.count,
            total_pages: paging.total_pages(totals.count),
            current_page: paging.page,
            totals: DonationTotals {
                total_amount: from_cents(totals.amount_cents),
                total_fees: from_cents(totals.fee_cents),
                total_net: from_cents(totals.net_cents),
            },
            donations,
        })
    }

    fn load(&self, id: Uuid) -> CoreResult<Donation> {
        self.db.get_donation(id)?.ok_or(CoreError::NotFound("donation"))
    }

    fn transition(&self, id: Uuid, to: PaymentStatus, patch: &TransitionPatch) -> CoreResult<PaymentStatus> {
        match self.db.transition_donation(id, allowed_sources(to), to, patch)? {
            Transition::Applied { previous } => Ok(previous),
            Transition::Rejected { current } => {
                warn!("Rejected donation {} transition {} -> {}", id, current, to);
                Err(CoreError::Conflict(format!("donation is {} and cannot become {}", current, to)))
            }
            Transition::Missing => Err(CoreError::NotFound("donation")),
        }
    }

    /// Totals and badges for a donation that just became completed.
    fn settle(&self, donation: &Donation) -> Option<String> {
        if !donation.method.is_ledger() {
            return None;
        }
        if let Err(e) = aggregates::apply(&self.db, donation) {
            error!("{:#}", e);
            return Some("donation recorded but totals could not be updated".into());
        }
        match badges::award_donation_badges(&self.db, donation.donor_id) {
            Ok(_) => None,
            Err(e) => {
                error!("Badge evaluation failed for {}: {:#}", donation.donor_id, e);
                Some("donation recorded but badges could not be evaluated".into())
            }
        }
    }

    fn unsettle(&self, donation: &Donation) -> Option<String> {
        match aggregates::reverse(&self.db, donation) {
            Ok(()) => None,
            Err(e) => {
                error!("{:#}", e);
                Some("donation updated but totals could not be reversed".into())
            }
        }
    }

    fn outcome(&self, donation: Donation, warning: Option<String>) -> LedgerOutcome {
        LedgerOutcome {
            fees: recorded_fees(&donation),
            donation,
            warning,
        }
    }
}

pub(crate) fn require_admin(caller: Identity) -> CoreResult<()> {
    if caller.is_admin {
        Ok(())
    } else {
        Err(CoreError::forbidden("administrator access required"))
    }
}

fn active_request(db: &Database, id: Uuid) -> CoreResult<ReliefRequest> {
    db.get_request(id)?
        .filter(|r| r.is_active)
        .ok_or(CoreError::NotFound("request"))
}

#[allow(clippy::too_many_arguments)]
fn new_donation(
    donor_id: Uuid,
    request_id: Option<Uuid>,
    amount: Decimal,
    method: PaymentMethod,
    status: PaymentStatus,
    fees: FeeBreakdown,
    transaction_id: Option<String>,
    method_reference: Option<String>,
    is_recurring: bool,
    notes: Option<String>,
) -> Donation {
    let now = Utc::now();
    Donation {
        id: Uuid::new_v4(),
        donor_id,
        request_id,
        amount,
        method,
        status,
        transaction_id,
        method_reference,
        processing_fee: fees.processing_fee,
        platform_fee: fees.platform_fee,
        net_amount: fees.net_amount,
        is_recurring,
        notes,
        refund: None,
        created_at: now,
        updated_at: now,
    }
}
