//! Cryptographic functions for user credentials
//!
//! Provides secret hashing and stream-key lookup using:
//! - Argon2id for salted, cost-tunable hashing of passwords and stream keys
//! - HMAC-SHA256 for the deterministic stream-key lookup digest

use std::{fmt, sync::Arc};

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use hmac::{Hmac, Mac};
use rand::{Rng, distributions::Alphanumeric, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::OnceCell;
use zeroize::Zeroizing;

use super::errors::UserError;
use crate::{Result, constants::STREAM_KEY_LENGTH};

type HmacSha256 = Hmac<Sha256>;

/// Argon2id work factor.
///
/// Stored digests carry their own parameters, so raising the work factor only
/// affects secrets hashed afterwards; older digests keep verifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasherConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes over memory
    pub iterations: u32,
    /// Degree of parallelism (lanes)
    pub parallelism: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HasherConfig {
    /// The cheapest parameters Argon2 accepts. Only for tests.
    #[cfg(any(test, feature = "testing"))]
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }
}

/// An Argon2id digest in PHC string format.
///
/// The value is opaque to callers. It is never printed by `Debug`, and the only
/// equality offered is the constant-time [`SecretHash::ct_eq`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretHash(String);

impl SecretHash {
    /// Wrap a PHC string loaded from storage.
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    /// The PHC string, for persistence only.
    pub fn as_phc(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison of two stored digests.
    pub fn ct_eq(&self, other: &SecretHash) -> bool {
        ct_eq(self.0.as_bytes(), other.0.as_bytes())
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretHash(<redacted>)")
    }
}

/// Salted one-way hashing and verification of secrets.
///
/// Cloning is cheap and clones share the decoy digest used to equalise the
/// cost of logins for unknown users.
#[derive(Clone)]
pub struct SecretHasher {
    argon2: Argon2<'static>,
    decoy: Arc<OnceCell<SecretHash>>,
}

impl fmt::Debug for SecretHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretHasher").finish_non_exhaustive()
    }
}

impl SecretHasher {
    /// Create a hasher with the given work factor.
    ///
    /// # Errors
    /// `UserError::InvalidWorkFactor` if Argon2 rejects the parameters.
    pub fn new(config: HasherConfig) -> Result<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| UserError::InvalidWorkFactor {
            reason: e.to_string(),
        })?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            decoy: Arc::new(OnceCell::new()),
        })
    }

    /// Hash a secret with a fresh random salt.
    ///
    /// Hashing the same secret twice yields different digests.
    pub fn hash(&self, secret: &str) -> Result<SecretHash> {
        let salt = SaltString::generate(&mut OsRng);

        let digest = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| UserError::HashingFailed {
                reason: e.to_string(),
            })?;

        Ok(SecretHash(digest.to_string()))
    }

    /// Verify a secret against a stored digest.
    ///
    /// # Returns
    /// `Ok(true)` on a match, `Ok(false)` on a mismatch or a malformed digest.
    /// `Err` is reserved for failures of the primitive itself.
    pub fn verify(&self, secret: &str, digest: &SecretHash) -> Result<bool> {
        let Ok(parsed) = PasswordHash::new(digest.as_phc()) else {
            return Ok(false);
        };

        match self.argon2.verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Crypto) => Err(UserError::VerificationFailed {
                reason: "argon2 primitive failure".to_string(),
            }
            .into()),
            Err(_) => Ok(false),
        }
    }

    /// [`SecretHasher::hash`] on the blocking pool.
    ///
    /// If the caller stops waiting the computation still runs to completion and
    /// its result is discarded.
    pub async fn hash_async(&self, secret: &str) -> Result<SecretHash> {
        let hasher = self.clone();
        let secret = Zeroizing::new(secret.to_owned());
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| UserError::WorkerFailed {
                reason: e.to_string(),
            })?
    }

    /// [`SecretHasher::verify`] on the blocking pool.
    pub async fn verify_async(&self, secret: &str, digest: &SecretHash) -> Result<bool> {
        let hasher = self.clone();
        let secret = Zeroizing::new(secret.to_owned());
        let digest = digest.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&secret, &digest))
            .await
            .map_err(|e| UserError::WorkerFailed {
                reason: e.to_string(),
            })?
    }

    /// Spend one verification against a digest nobody can match.
    ///
    /// Used when the user being authenticated does not exist so that the
    /// response time does not reveal it.
    pub async fn verify_decoy(&self, secret: &str) -> Result<()> {
        let decoy = self.decoy().await?;
        self.verify_async(secret, decoy).await?;
        Ok(())
    }

    /// Compute the decoy digest ahead of the first unknown-user login.
    ///
    /// Until this runs, the first decoy verification also pays for hashing the
    /// decoy and is measurably slower than a wrong password.
    pub async fn warm_up(&self) -> Result<()> {
        self.decoy().await.map(|_| ())
    }

    async fn decoy(&self) -> Result<&SecretHash> {
        self.decoy
            .get_or_try_init(|| async {
                let candidate = generate_stream_key();
                self.hash_async(&candidate).await
            })
            .await
    }
}

/// Keyed deterministic digest of stream keys.
///
/// Salted hashes cannot be searched by plaintext, so each record also stores
/// this digest as an index for the reverse stream-key lookup.
#[derive(Clone)]
pub struct LookupKey {
    mac: HmacSha256,
}

impl fmt::Debug for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LookupKey(<redacted>)")
    }
}

impl LookupKey {
    /// Create a lookup key from raw key material.
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(UserError::InvalidLookupKey {
                reason: "lookup key must not be empty".to_string(),
            }
            .into());
        }

        let mac = HmacSha256::new_from_slice(key).map_err(|e| UserError::InvalidLookupKey {
            reason: e.to_string(),
        })?;

        Ok(Self { mac })
    }

    /// Hex-encoded HMAC-SHA256 of a stream key.
    pub fn digest(&self, stream_key: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(stream_key.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Generate a random alphanumeric stream key.
pub fn generate_stream_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STREAM_KEY_LENGTH)
        .map(char::from)
        .collect()
}

/// Constant-time equality for two byte slices.
fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut acc: u8 = 0;
    for (x, y) in a.iter().zip(b) {
        acc |= x ^ y;
    }
    acc == 0
}
