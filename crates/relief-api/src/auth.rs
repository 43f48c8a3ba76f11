use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use relief_core::{CoreError, DonationLedger, RequestService, run_blocking};
use relief_db::Database;
use relief_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use relief_types::models::User;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::ApiJson;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub ledger: DonationLedger,
    pub requests: RequestService,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();
    if name.is_empty() || name.len() > 100 {
        return Err(ApiError::ValidationError("name must be 1-100 characters".into()));
    }
    if !looks_like_email(&email) {
        return Err(ApiError::ValidationError("email is not valid".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::ValidationError("password must be at least 8 characters".into()));
    }

    let user = User {
        id: Uuid::new_v4(),
        email,
        name,
        phone: req.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
        category: req.category.unwrap_or_default(),
        is_admin: false,
        is_active: true,
        email_verified: false,
        phone_verified: false,
        total_donations: 0,
        total_donation_amount: Decimal::ZERO,
        help_count: 0,
        badges: Vec::new(),
        created_at: Utc::now(),
    };

    let db = state.db.clone();
    let password = req.password;
    let user = run_blocking(move || {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        if !db.create_user(&user, &password_hash)? {
            return Err(CoreError::conflict("email is already registered"));
        }
        Ok(user)
    })
    .await?;

    info!("Registered user {} ({})", user.id, user.category);
    let token = create_token(&state.jwt_secret, state.token_ttl_days, &user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let db = state.db.clone();

    let user = run_blocking(move || {
        let Some(row) = db.get_user_by_email(&email)? else {
            return Ok(None);
        };

        // Verify password
        let parsed_hash = PasswordHash::new(&row.password)
            .map_err(|e| anyhow::anyhow!("stored password hash is corrupt: {}", e))?;
        if Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Ok(None);
        }
        if !row.is_active {
            return Ok(None);
        }

        let id: Uuid = row
            .id
            .parse()
            .map_err(|_| anyhow::anyhow!("corrupt user id {}", row.id))?;
        Ok(db.get_user(id)?)
    })
    .await?
    .ok_or(ApiError::Unauthorized)?;

    let token = create_token(&state.jwt_secret, state.token_ttl_days, &user)?;
    Ok(Json(AuthResponse { token, user }))
}

pub fn create_token(secret: &str, ttl_days: i64, user: &User) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        exp: (Utc::now() + chrono::Duration::days(ttl_days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::decode_token;

    #[test]
    fn email_shape() {
        assert!(looks_like_email("maria@example.ph"));
        assert!(!looks_like_email("maria@localhost"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("maria example@x.com"));
    }

    #[test]
    fn token_round_trips_subject() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            name: "A".into(),
            phone: None,
            category: Default::default(),
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
        let token = create_token("secret", 7, &user).unwrap();
        assert_eq!(decode_token("secret", &token).unwrap().sub, user.id);
        assert!(decode_token("other-secret", &token).is_err());
    }
}
