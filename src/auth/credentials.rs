//! Credential store: username -> password, token -> username, and
//! per-user DNA reference samples.
//!
//! Plain `HashMap`s rather than `dashmap` — the engine's single mutex
//! serializes *every* read-modify-write access to the credential store
//! and DNA tables, not per-table fine-grained locking. This type is only
//! ever reached through `Engine`'s single critical section, so it takes
//! `&mut self` throughout and needs no interior concurrency of its own
//! (`register`'s exists-check-then-insert, in particular, would race
//! under independent per-map locking).

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::UserRecord;

fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Default, Clone)]
pub struct CredentialStore {
    users: HashMap<String, UserRecord>,
    tokens: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    pub fn register(&mut self, username: &str, password: &str) -> bool {
        if self.users.contains_key(username) {
            return false;
        }
        self.users.insert(
            username.to_string(),
            UserRecord {
                username: username.to_string(),
                password_hash: hash_password(password),
                dna_samples: Vec::new(),
            },
        );
        true
    }

    fn check_password(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .map(|u| u.password_hash == hash_password(password))
            .unwrap_or(false)
    }

    /// Mints a fresh opaque token bound to `username`. Returns `None` if the
    /// password is wrong or the user doesn't exist.
    pub fn login(&mut self, username: &str, password: &str) -> Option<String> {
        if !self.check_password(username, password) {
            return None;
        }
        Some(self.mint_token(username))
    }

    fn mint_token(&mut self, username: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), username.to_string());
        token
    }

    /// Resolves a bearer token to its owning username.
    pub fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.get(token).cloned()
    }

    /// Invalidates every token bound to `username` (password change).
    pub fn revoke_all_tokens_for(&mut self, username: &str) {
        self.tokens.retain(|_, owner| owner != username);
    }

    /// Changes the password after verifying the old one, invalidating all
    /// of the user's existing tokens.
    pub fn change_password(
        &mut self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), PasswordChangeError> {
        if !self.check_password(username, old_password) {
            return Err(if self.users.contains_key(username) {
                PasswordChangeError::WrongPassword
            } else {
                PasswordChangeError::NotFound
            });
        }
        let entry = self.users.get_mut(username).unwrap();
        entry.password_hash = hash_password(new_password);
        self.revoke_all_tokens_for(username);
        Ok(())
    }

    /// Adds a DNA reference sample for `username` after verifying the
    /// password. Duplicate samples are silently accepted (no-op).
    pub fn submit_dna(&mut self, username: &str, password: &str, sample: &str) -> Result<(), DnaSubmitError> {
        if !self.users.contains_key(username) {
            return Err(DnaSubmitError::NotFound);
        }
        if !self.check_password(username, password) {
            return Err(DnaSubmitError::WrongPassword);
        }
        let entry = self.users.get_mut(username).unwrap();
        if !entry.dna_samples.iter().any(|s| s == sample) {
            entry.dna_samples.push(sample.to_string());
        }
        Ok(())
    }

    /// Attempts DNA login: mints a token iff `sample` matches any of the
    /// user's registered references within tolerance.
    pub fn dna_login(&mut self, username: &str, sample: &str) -> Result<String, DnaLoginError> {
        let matched = {
            let entry = self.users.get(username).ok_or(DnaLoginError::NotFound)?;
            if entry.dna_samples.is_empty() {
                return Err(DnaLoginError::NoSamplesRegistered);
            }
            crate::dna::dna_matches_any(entry.dna_samples.iter(), sample)
        };
        if !matched {
            return Err(DnaLoginError::NoMatch);
        }
        Ok(self.mint_token(username))
    }

    /// Snapshot of all users, for persistence.
    pub fn snapshot_users(&self) -> Vec<UserRecord> {
        self.users.values().cloned().collect()
    }

    /// Restores users from a snapshot. Tokens are never persisted (every
    /// restart starts with an empty session table).
    pub fn restore_users(&mut self, users: Vec<UserRecord>) {
        self.users.clear();
        for u in users {
            self.users.insert(u.username.clone(), u);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordChangeError {
    #[error("user not found")]
    NotFound,
    #[error("wrong password")]
    WrongPassword,
}

#[derive(Debug, thiserror::Error)]
pub enum DnaSubmitError {
    #[error("user not found")]
    NotFound,
    #[error("wrong password")]
    WrongPassword,
}

#[derive(Debug, thiserror::Error)]
pub enum DnaLoginError {
    #[error("user not found")]
    NotFound,
    #[error("no DNA samples registered")]
    NoSamplesRegistered,
    #[error("no matching sample")]
    NoMatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_login_round_trips() {
        let mut store = CredentialStore::new();
        assert!(store.register("alice", "hunter2"));
        assert!(!store.register("alice", "other")); // already exists

        let token = store.login("alice", "hunter2").expect("login should succeed");
        assert_eq!(store.resolve(&token), Some("alice".to_string()));
        assert!(store.login("alice", "wrong").is_none());
    }

    #[test]
    fn password_change_revokes_existing_tokens() {
        let mut store = CredentialStore::new();
        store.register("bob", "pw1");
        let token = store.login("bob", "pw1").unwrap();

        store.change_password("bob", "pw1", "pw2").unwrap();
        assert_eq!(store.resolve(&token), None);

        let new_token = store.login("bob", "pw2").unwrap();
        assert_eq!(store.resolve(&new_token), Some("bob".to_string()));
    }

    #[test]
    fn duplicate_dna_submission_is_a_no_op() {
        let mut store = CredentialStore::new();
        store.register("carol", "pw");
        store.submit_dna("carol", "pw", "ACGTAC").unwrap();
        store.submit_dna("carol", "pw", "ACGTAC").unwrap();
        let users = store.snapshot_users();
        let carol = users.iter().find(|u| u.username == "carol").unwrap();
        assert_eq!(carol.dna_samples.len(), 1);
    }

    #[test]
    fn dna_login_mints_token_on_match() {
        let mut store = CredentialStore::new();
        store.register("dave", "pw");
        store.submit_dna("dave", "pw", "ACGTAC").unwrap();
        let token = store.dna_login("dave", "ACGTAC").unwrap();
        assert_eq!(store.resolve(&token), Some("dave".to_string()));
        assert!(matches!(
            store.dna_login("dave", "TTTTTT"),
            Err(DnaLoginError::NoMatch)
        ));
    }
}
