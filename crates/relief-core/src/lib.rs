//! Donation ledger and request coordination rules.
//!
//! Everything here takes a resolved [`Identity`](relief_types::models::Identity)
//! where authorization matters; HTTP and token handling live in `relief-api`.

pub mod accounts;
pub mod admin;
pub mod aggregates;
pub mod badges;
pub mod donations;
pub mod error;
pub mod fees;
pub mod gateway;
pub mod leaderboard;
pub mod requests;

pub use donations::DonationLedger;
pub use error::{CoreError, CoreResult};
pub use requests::RequestService;

/// Run synchronous database work off the async runtime.
pub async fn run_blocking<F, T>(f: F) -> CoreResult<T>
where
    F: FnOnce() -> CoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CoreError::Storage(anyhow::anyhow!("blocking task failed: {}", e)))?
}

#[cfg(test)]
mod testutil;
