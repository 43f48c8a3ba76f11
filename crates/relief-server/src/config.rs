use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use relief_core::fees::DonationLimits;
use rust_decimal::Decimal;

/// Secrets shipped in sample `.env` files. Accepted only in development.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayChoice {
    Sandbox,
    Stripe { api_base: String, secret_key: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub environment: Environment,
    pub limits: DonationLimits,
    pub gateway: GatewayChoice,
    pub currency: String,
}

impl Config {
    /// Read every `RELIEF_*` (and `STRIPE_*`) variable, failing fast on
    /// anything unusable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let environment = match var("RELIEF_ENV", "development").to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        let jwt_secret = var("RELIEF_JWT_SECRET", "dev-secret-change-me");
        if environment == Environment::Production
            && (jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()))
        {
            bail!("RELIEF_JWT_SECRET is unset or still a placeholder");
        }

        let host = var("RELIEF_HOST", "0.0.0.0");
        let port: u16 = var("RELIEF_PORT", "3000")
            .parse()
            .context("RELIEF_PORT must be a valid port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let min = Decimal::from_str(&var("RELIEF_MIN_DONATION", "10"))
            .context("RELIEF_MIN_DONATION must be a decimal amount")?;
        let max = Decimal::from_str(&var("RELIEF_MAX_DONATION", "1000000"))
            .context("RELIEF_MAX_DONATION must be a decimal amount")?;
        if min <= Decimal::ZERO || min > max {
            bail!("donation limits must satisfy 0 < min <= max (got {} and {})", min, max);
        }

        let gateway = match var("RELIEF_PAYMENT_GATEWAY", "sandbox").to_lowercase().as_str() {
            "sandbox" => GatewayChoice::Sandbox,
            "stripe" => GatewayChoice::Stripe {
                api_base: var("STRIPE_API_BASE", "https://api.stripe.com"),
                secret_key: lookup("STRIPE_SECRET_KEY")
                    .filter(|k| !k.is_empty())
                    .context("STRIPE_SECRET_KEY is required for the stripe gateway")?,
            },
            other => bail!("unknown RELIEF_PAYMENT_GATEWAY {:?}", other),
        };
        if environment == Environment::Production && gateway == GatewayChoice::Sandbox {
            bail!("the sandbox gateway cannot be used in production");
        }

        let token_ttl_days: i64 = var("RELIEF_TOKEN_TTL_DAYS", "7")
            .parse()
            .context("RELIEF_TOKEN_TTL_DAYS must be a whole number")?;
        if token_ttl_days < 1 {
            bail!("RELIEF_TOKEN_TTL_DAYS must be at least 1");
        }

        Ok(Config {
            addr,
            db_path: PathBuf::from(var("RELIEF_DB_PATH", "relief.db")),
            jwt_secret,
            token_ttl_days,
            environment,
            limits: DonationLimits { min, max },
            gateway,
            currency: var("RELIEF_CURRENCY", "php").to_lowercase(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_are_development_sandbox() {
        let config = load(&[]).unwrap();
        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.gateway, GatewayChoice::Sandbox);
        assert_eq!(config.limits, DonationLimits::default());
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.currency, "php");
    }

    #[test]
    fn production_rejects_placeholder_secret() {
        let err = load(&[
            ("RELIEF_ENV", "production"),
            ("RELIEF_JWT_SECRET", "dev-secret-change-me"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("RELIEF_JWT_SECRET"));
    }

    #[test]
    fn production_with_stripe() {
        let config = load(&[
            ("RELIEF_ENV", "production"),
            ("RELIEF_JWT_SECRET", "b3f1c9a0e7d24c6f"),
            ("RELIEF_PAYMENT_GATEWAY", "stripe"),
            ("STRIPE_SECRET_KEY", "sk_live_x"),
        ])
        .unwrap();
        assert!(matches!(config.gateway, GatewayChoice::Stripe { ref secret_key, .. } if secret_key == "sk_live_x"));
    }

    #[test]
    fn stripe_needs_a_key() {
        assert!(load(&[("RELIEF_PAYMENT_GATEWAY", "stripe")]).is_err());
    }

    #[test]
    fn limits_are_configurable_and_checked() {
        let config = load(&[("RELIEF_MIN_DONATION", "50"), ("RELIEF_MAX_DONATION", "5000.50")]).unwrap();
        assert_eq!(config.limits.min, Decimal::from(50));
        assert!(load(&[("RELIEF_MIN_DONATION", "500"), ("RELIEF_MAX_DONATION", "100")]).is_err());
        assert!(load(&[("RELIEF_PORT", "http")]).is_err());
    }
}
