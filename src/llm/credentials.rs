//! API key pools with an explicit selection policy.

use anyhow::{bail, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::util::SecretString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KeySelection {
    #[default]
    RoundRobin,
    Random,
}

/// Pick a slot in `0..len`. `counter` is the number of selections made so far.
pub fn select_index<R: Rng + ?Sized>(
    policy: KeySelection,
    len: usize,
    counter: usize,
    rng: &mut R,
) -> usize {
    if len <= 1 {
        return 0;
    }
    match policy {
        KeySelection::RoundRobin => counter % len,
        KeySelection::Random => rng.gen_range(0..len),
    }
}

/// The keys a provider client draws from. An anonymous pool yields no key.
#[derive(Debug)]
pub struct CredentialPool {
    keys: Vec<SecretString>,
    policy: KeySelection,
    counter: AtomicUsize,
}

impl CredentialPool {
    pub fn new(keys: Vec<SecretString>, policy: KeySelection) -> Result<Self> {
        if keys.is_empty() {
            bail!("credential pool needs at least one key");
        }
        Ok(Self {
            keys,
            policy,
            counter: AtomicUsize::new(0),
        })
    }

    /// Parse a comma-separated key list, ignoring blanks around and between keys
    pub fn from_list(raw: &str, policy: KeySelection) -> Result<Self> {
        let keys = raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| SecretString::new(k.to_string()))
            .collect();
        Self::new(keys, policy)
    }

    pub fn single(key: &str) -> Self {
        Self {
            keys: vec![SecretString::new(key.to_string())],
            policy: KeySelection::RoundRobin,
            counter: AtomicUsize::new(0),
        }
    }

    /// A pool for providers that take no key
    pub fn anonymous() -> Self {
        Self {
            keys: Vec::new(),
            policy: KeySelection::RoundRobin,
            counter: AtomicUsize::new(0),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Next key according to the policy, or `None` for an anonymous pool
    pub fn next_key(&self) -> Option<&SecretString> {
        if self.keys.is_empty() {
            return None;
        }
        let counter = self.counter.fetch_add(1, Ordering::Relaxed);
        let index = select_index(
            self.policy,
            self.keys.len(),
            counter,
            &mut rand::thread_rng(),
        );
        debug!("Using API key slot {} of {}", index + 1, self.keys.len());
        self.keys.get(index)
    }
}
