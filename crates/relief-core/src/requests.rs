use std::sync::Arc;

use chrono::Utc;
use relief_db::Database;
use relief_db::queries::{HelpRecord, RequestFilter};
use relief_types::api::{CreateReliefRequest, RequestQuery, UpdateReliefRequest};
use relief_types::models::{
    BadgeTier, GeoPoint, Identity, ReliefRequest, RequestCategory, RequestStatus,
};
use relief_types::money::has_valid_scale;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::badges;
use crate::donations::require_admin;
use crate::error::{CoreError, CoreResult};

const LIST_LIMIT: usize = 100;
/// Rows fetched from the bounding box before the exact distance check.
const GEO_PREFETCH: u32 = 1_000;
const KM_PER_DEGREE: f64 = 111.32;
/// Largest funding goal a request may publish.
const MAX_FUNDING_GOAL: i64 = 1_000_000_000;

/// Result of a successful help mark.
#[derive(Debug)]
pub struct HelpOutcome {
    pub request: ReliefRequest,
    pub help_count: i64,
    pub badges_granted: Vec<BadgeTier>,
}

#[derive(Clone)]
pub struct RequestService {
    db: Arc<Database>,
}

impl RequestService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// File a new request. Anyone may file one; an authenticated caller
    /// becomes its owner. Payment details are only kept on money requests.
    pub fn create(&self, caller: Option<Identity>, body: CreateReliefRequest) -> CoreResult<ReliefRequest> {
        let name = required(&body.name, "name")?;
        let phone = required(&body.phone, "phone")?;
        let description = required(&body.description, "description")?;
        let location = GeoPoint {
            lat: body.lat,
            lng: body.lng,
        };
        if !location.is_valid() {
            return Err(CoreError::validation("coordinates are out of range"));
        }

        let is_money = body.category == RequestCategory::Money;
        let funding_goal = if is_money { body.funding_goal } else { None };
        check_goal(funding_goal)?;

        let request = ReliefRequest {
            id: Uuid::new_v4(),
            owner_id: caller.map(|c| c.user_id),
            name,
            phone,
            email: trimmed(body.email),
            category: body.category,
            description,
            location,
            address: trimmed(body.address),
            status: RequestStatus::Pending,
            priority: body.priority.unwrap_or_default(),
            is_verified: false,
            verified_by: None,
            verified_at: None,
            is_active: true,
            wallet_number: if is_money { trimmed(body.wallet_number) } else { None },
            bank_account: if is_money { trimmed(body.bank_account) } else { None },
            funding_goal,
            total_received: Decimal::ZERO,
            helpers: Vec::new(),
            created_at: Utc::now(),
        };

        self.db.insert_request(&request)?;
        info!("Request {} filed ({})", request.id, request.category);
        Ok(request)
    }

    /// Active requests, newest first, capped at 100.
    pub fn list(&self, query: &RequestQuery) -> CoreResult<Vec<ReliefRequest>> {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        let near = match (query.lat, query.lng, query.radius_km) {
            (Some(lat), Some(lng), Some(radius)) => {
                let center = GeoPoint { lat, lng };
                if !center.is_valid() || !radius.is_finite() || radius <= 0.0 {
                    return Err(CoreError::validation("invalid location filter"));
                }
                Some((center, radius))
            }
            (None, None, None) => None,
            _ => return Err(CoreError::validation("lat, lng and radius_km must be given together")),
        };

        let filter = RequestFilter {
            category: query.category,
            status: query.status,
            search,
            bounds: near.map(|(c, r)| bounding_box(c, r)),
            limit: if near.is_some() { GEO_PREFETCH } else { LIST_LIMIT as u32 },
        };
        let mut requests = self.db.list_requests(&filter)?;

        if let Some((center, radius)) = near {
            requests.retain(|r| center.distance_km(&r.location) <= radius);
        }
        requests.truncate(LIST_LIMIT);
        Ok(requests)
    }

    pub fn get(&self, id: Uuid) -> CoreResult<ReliefRequest> {
        self.db
            .get_request(id)?
            .filter(|r| r.is_active)
            .ok_or(CoreError::NotFound("request"))
    }

    pub fn update(&self, caller: Identity, id: Uuid, mut body: UpdateReliefRequest) -> CoreResult<ReliefRequest> {
        let current = self.managed(caller, id)?;

        for (value, field) in [
            (&body.name, "name"),
            (&body.phone, "phone"),
            (&body.description, "description"),
        ] {
            if let Some(v) = value {
                required(v, field)?;
            }
        }
        if current.category != RequestCategory::Money {
            body.wallet_number = None;
            body.bank_account = None;
            body.funding_goal = None;
        }
        check_goal(body.funding_goal)?;

        self.db.update_request(id, &body)?;
        self.get(id)
    }

    pub fn set_status(&self, caller: Identity, id: Uuid, status: RequestStatus) -> CoreResult<ReliefRequest> {
        self.managed(caller, id)?;
        self.db.set_request_status(id, status)?;
        info!("Request {} is now {}", id, status);
        self.get(id)
    }

    /// Soft delete: the row stays for donation history.
    pub fn delete(&self, caller: Identity, id: Uuid) -> CoreResult<()> {
        self.managed(caller, id)?;
        self.db.deactivate_request(id)?;
        info!("Request {} deactivated by {}", id, caller.user_id);
        Ok(())
    }

    pub fn verify(&self, caller: Identity, id: Uuid) -> CoreResult<ReliefRequest> {
        require_admin(caller)?;
        self.get(id)?;
        self.db.verify_request(id, caller.user_id)?;
        info!("Request {} verified by {}", id, caller.user_id);
        self.get(id)
    }

    /// Record that the caller helped with a request. Each user helps a
    /// request at most once.
    pub fn mark_helped(&self, caller: Identity, id: Uuid, notes: Option<String>) -> CoreResult<HelpOutcome> {
        let notes = trimmed(notes);
        match self.db.add_helper(id, caller.user_id, notes.as_deref())? {
            HelpRecord::MissingRequest => return Err(CoreError::NotFound("request")),
            HelpRecord::AlreadyHelped => {
                return Err(CoreError::conflict("you have already helped with this request"));
            }
            HelpRecord::Added => {}
        }

        let help_count = self.db.increment_help_count(caller.user_id)?.unwrap_or_else(|| {
            warn!("Helper {} has no user row, help count not recorded", caller.user_id);
            0
        });
        let badges_granted = badges::award_help_badges(&self.db, caller.user_id, help_count)?;
        info!("User {} helped request {} (count {})", caller.user_id, id, help_count);

        Ok(HelpOutcome {
            request: self.get(id)?,
            help_count,
            badges_granted,
        })
    }

    /// Load an active request the caller is allowed to change.
    fn managed(&self, caller: Identity, id: Uuid) -> CoreResult<ReliefRequest> {
        let request = self.get(id)?;
        if !caller.can_manage(request.owner_id) {
            return Err(CoreError::forbidden("only the owner or an admin can change this request"));
        }
        Ok(request)
    }
}

/// Degree box enclosing a circle of `radius_km` around `center`.
fn bounding_box(center: GeoPoint, radius_km: f64) -> (f64, f64, f64, f64) {
    let dlat = radius_km / KM_PER_DEGREE;
    let cos = center.lat.to_radians().cos().abs().max(0.01);
    let dlng = (radius_km / (KM_PER_DEGREE * cos)).min(180.0);
    (center.lat - dlat, center.lat + dlat, center.lng - dlng, center.lng + dlng)
}

fn required(value: &str, field: &str) -> CoreResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn check_goal(goal: Option<Decimal>) -> CoreResult<()> {
    match goal {
        Some(g) if g <= Decimal::ZERO || !has_valid_scale(g) => {
            Err(CoreError::validation("funding_goal must be a positive amount"))
        }
        Some(g) if g > Decimal::from(MAX_FUNDING_GOAL) => Err(CoreError::Validation(format!(
            "funding_goal cannot exceed {}",
            MAX_FUNDING_GOAL
        ))),
        _ => Ok(()),
    }
}
