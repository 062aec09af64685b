use serde::{Deserialize, Serialize};

/// Durable shape of a registered user for the credential store.
/// DNA samples are unordered but kept as a `Vec` here since duplicate
/// submission is a silent no-op, not a set-membership error (dedup is
/// enforced at submission time, not by the container).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    pub dna_samples: Vec<String>,
}
