use chrono::Utc;
use relief_db::Database;
use relief_types::models::{
    GeoPoint, Identity, Priority, ReliefRequest, RequestCategory, RequestStatus, User, UserCategory,
};
use rust_decimal::Decimal;
use uuid::Uuid;

pub fn insert_user(db: &Database, email: &str) -> Uuid {
    let user = User {
        id: Uuid::new_v4(),
        email: email.into(),
        name: email.split('@').next().unwrap_or(email).into(),
        phone: None,
        category: UserCategory::Individual,
        is_admin: false,
        is_active: true,
        email_verified: false,
        phone_verified: false,
        total_donations: 0,
        total_donation_amount: Decimal::ZERO,
        help_count: 0,
        badges: vec![],
        created_at: Utc::now(),
    };
    assert!(db.create_user(&user, "not-a-real-hash").unwrap());
    user.id
}

pub fn admin(user_id: Uuid) -> Identity {
    Identity {
        user_id,
        is_admin: true,
    }
}

fn request(owner: Option<Uuid>, category: RequestCategory, wallet: Option<&str>) -> ReliefRequest {
    ReliefRequest {
        id: Uuid::new_v4(),
        owner_id: owner,
        name: "Barangay San Roque".into(),
        phone: "09170000000".into(),
        email: None,
        category,
        description: "Typhoon evacuees need supplies".into(),
        location: GeoPoint {
            lat: 14.5995,
            lng: 120.9842,
        },
        address: Some("Manila".into()),
        status: RequestStatus::Pending,
        priority: Priority::High,
        is_verified: false,
        verified_by: None,
        verified_at: None,
        is_active: true,
        wallet_number: wallet.map(String::from),
        bank_account: None,
        funding_goal: None,
        total_received: Decimal::ZERO,
        helpers: vec![],
        created_at: Utc::now(),
    }
}

pub fn insert_request(db: &Database, owner: Option<Uuid>) -> Uuid {
    let r = request(owner, RequestCategory::Food, None);
    db.insert_request(&r).unwrap();
    r.id
}

pub fn wallet_request(db: &Database) -> Uuid {
    let r = request(None, RequestCategory::Money, Some("09171234567"));
    db.insert_request(&r).unwrap();
    r.id
}
