//! Password hashing for the account routes.
//!
//! bcrypt is deliberately slow, so both operations run on the blocking pool.

use std::sync::LazyLock;

use dashmap::DashMap;

use crate::error::ApiError;

// Stand-in hash per work factor, built on first use.
static DUMMY_HASHES: LazyLock<DashMap<u32, String>> = LazyLock::new(DashMap::new);

pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("hash task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("bcrypt hash failed: {e}")))
}

/// Returns `false` for a wrong password and for a stored hash that cannot be parsed.
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("verify task failed: {e}")))?;
    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!("Unreadable password hash: {}", e);
            Ok(false)
        }
    }
}

/// A hash of a throwaway password at `cost`, for logins naming no account.
/// Verifying against it takes as long as verifying against a real account's
/// hash of the same cost.
pub async fn dummy_hash(cost: u32) -> Result<String, ApiError> {
    if let Some(hash) = DUMMY_HASHES.get(&cost).map(|h| h.value().clone()) {
        return Ok(hash);
    }
    let hash = hash_password(uuid::Uuid::new_v4().to_string(), cost).await?;
    Ok(DUMMY_HASHES.entry(cost).or_insert(hash).value().clone())
}
