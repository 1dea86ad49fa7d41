//! Strategy and sanctions interfaces.
//!
//! A strategy answers "may this account act?"; a sanctions list answers "is
//! this account sanctioned?". Both are identified by an [`Address`] so the
//! registry can detect duplicates and events can name them.
//!
//! The list-backed implementations fail closed: if their lock is poisoned an
//! account is treated as not allowed / sanctioned.

use std::collections::BTreeSet;
use std::sync::RwLock;

use cadence_types::Address;

use crate::{Result, SentryError};

/// A pluggable allow check.
pub trait SentryStrategy: Send + Sync {
    fn address(&self) -> Address;

    fn is_allowed(&self, account: &Address) -> bool;
}

/// A sanctions lookup.
pub trait SanctionsList: Send + Sync {
    fn address(&self) -> Address;

    fn is_sanctioned(&self, account: &Address) -> bool;
}

/// Strategy allowing exactly the accounts in its set.
#[derive(Debug)]
pub struct AllowListStrategy {
    address: Address,
    members: RwLock<BTreeSet<Address>>,
}

impl AllowListStrategy {
    pub fn new(address: Address) -> Self {
        Self::with_members(address, std::iter::empty())
    }

    pub fn with_members(address: Address, members: impl IntoIterator<Item = Address>) -> Self {
        Self {
            address,
            members: RwLock::new(members.into_iter().collect()),
        }
    }

    /// Add `account`. Returns `false` if it was already present.
    pub fn insert(&self, account: Address) -> Result<bool> {
        let mut members = self.members.write().map_err(|_| poisoned(self.address))?;
        Ok(members.insert(account))
    }

    /// Remove `account`. Returns `false` if it was not present.
    pub fn remove(&self, account: &Address) -> Result<bool> {
        let mut members = self.members.write().map_err(|_| poisoned(self.address))?;
        Ok(members.remove(account))
    }

    pub fn len(&self) -> usize {
        self.members.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SentryStrategy for AllowListStrategy {
    fn address(&self) -> Address {
        self.address
    }

    fn is_allowed(&self, account: &Address) -> bool {
        self.members
            .read()
            .map(|members| members.contains(account))
            .unwrap_or(false)
    }
}

/// Sanctions list backed by a set of accounts.
#[derive(Debug)]
pub struct SanctionsRegistry {
    address: Address,
    entries: RwLock<BTreeSet<Address>>,
}

impl SanctionsRegistry {
    pub fn new(address: Address, entries: impl IntoIterator<Item = Address>) -> Self {
        Self {
            address,
            entries: RwLock::new(entries.into_iter().collect()),
        }
    }

    /// Add `account`. Returns `false` if it was already listed.
    pub fn insert(&self, account: Address) -> Result<bool> {
        let mut entries = self.entries.write().map_err(|_| poisoned(self.address))?;
        Ok(entries.insert(account))
    }

    /// Delist `account`. Returns `false` if it was not listed.
    pub fn remove(&self, account: &Address) -> Result<bool> {
        let mut entries = self.entries.write().map_err(|_| poisoned(self.address))?;
        Ok(entries.remove(account))
    }
}

impl SanctionsList for SanctionsRegistry {
    fn address(&self) -> Address {
        self.address
    }

    fn is_sanctioned(&self, account: &Address) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains(account))
            .unwrap_or(true)
    }
}

fn poisoned(address: Address) -> SentryError {
    SentryError::StrategyState(format!("{address} lock poisoned"))
}
