/*!
 * API credential pool.
 *
 * Credentials are tried in the order they were supplied. A quota failure on
 * the active credential advances the cursor to the next one; the cursor never
 * moves back during a run, so a throttled key is not reused before the
 * cooldown path has been taken.
 */

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use log::{debug, warn};

use crate::errors::TranslationError;

/// Opaque API key; `Debug` and `Display` never print the secret
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for request headers only
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn masked(&self) -> String {
        let tail: String = self.0.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        format!("****{}", tail)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Ordered credentials with a forward-only cursor
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    active: AtomicUsize,
}

impl CredentialPool {
    /// Parse a comma separated list. Entries are trimmed and entries shorter
    /// than `min_len` are dropped.
    pub fn parse(raw: &str, min_len: usize) -> Result<Self, TranslationError> {
        let mut credentials = Vec::new();
        for (position, entry) in raw.split(',').enumerate() {
            let key = entry.trim();
            if key.is_empty() {
                continue;
            }
            if key.chars().count() < min_len {
                warn!("Ignoring credential #{}: shorter than {} characters", position + 1, min_len);
                continue;
            }
            credentials.push(Credential::new(key));
        }

        if credentials.is_empty() {
            return Err(TranslationError::InvalidInput("No valid API key provided".to_string()));
        }

        debug!("Loaded {} credential(s)", credentials.len());
        Ok(Self::from_credentials(credentials))
    }

    fn from_credentials(credentials: Vec<Credential>) -> Self {
        Self { credentials, active: AtomicUsize::new(0) }
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Active credential and its position
    pub fn current(&self) -> (usize, &Credential) {
        let index = self.active_index();
        (index, &self.credentials[index])
    }

    /// All credentials, in order
    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.iter()
    }

    /// Advance past the credential observed at `observed` after it hit a quota.
    ///
    /// The cursor only moves forward. When several callers report the same
    /// credential, exactly one of them gets `Rotation::Advanced`.
    pub fn rotate_from(&self, observed: usize) -> Rotation {
        let next = observed + 1;
        if next >= self.credentials.len() {
            return Rotation::Exhausted;
        }
        match self.active.compare_exchange(observed, next, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => {
                warn!("Credential #{} hit its quota, switching to credential #{}", observed + 1, next + 1);
                Rotation::Advanced { to: next }
            }
            // `observed` was active once and the cursor is monotonic
            Err(_) => Rotation::AlreadyAdvanced,
        }
    }
}

/// Result of reporting a throttled credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// This call moved the cursor to `to`
    Advanced { to: usize },
    /// Another caller already moved past the observed credential
    AlreadyAdvanced,
    /// The observed credential is the last one
    Exhausted,
}

impl Rotation {
    /// Whether a later credential is now active
    pub fn has_next(self) -> bool {
        !matches!(self, Rotation::Exhausted)
    }
}
