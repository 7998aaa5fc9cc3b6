// ruletree-core/src/core/transaction.rs
// ============================================================================
// Module: Transaction State Gate
// Description: Weighted-owner confirmation ledger guarding evaluation.
// Purpose: Provide the quorum predicate consulted before each tree walk.
// Dependencies: crate::core::identifiers, serde, thiserror
// ============================================================================

//! ## Overview
//! The transaction state is a ledger of owners with confirmation weights and
//! a minimum passing score. Evaluation consults `is_confirmed` exactly once
//! per walk and clears all confirmations afterwards, whether the walk
//! succeeds or fails. The gate is the only mutable component observable
//! across evaluations; callers re-confirm owners between walks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::OwnerId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of owners a ledger may register.
pub const MAX_OWNERS: usize = 250;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Transaction state and gate permission errors.
#[derive(Debug, Error)]
pub enum PermissionError {
    /// An owner operation referenced an empty identifier.
    #[error("owner identifier is empty")]
    EmptyOwnerId,
    /// An owner operation referenced an unregistered identifier.
    #[error("unknown owner: {0}")]
    UnknownOwner(String),
    /// The owner identifier is already registered.
    #[error("owner already registered: {0}")]
    DuplicateOwner(String),
    /// Registering the owner would exceed the ledger capacity.
    #[error("owner ledger is limited to {MAX_OWNERS} owners")]
    OwnerLimitExceeded,
    /// The minimum score must be at least one.
    #[error("minimum score must be at least 1")]
    InvalidMinScore,
    /// Evaluation was attempted without a confirmed transaction state.
    #[error("transaction state is not confirmed")]
    NotConfirmed,
}

// ============================================================================
// SECTION: Transaction State
// ============================================================================

/// One owner's ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct OwnerEntry {
    /// Confirmation weight contributed by the owner.
    weight: u32,
    /// Indicates whether the owner has confirmed.
    confirmed: bool,
}

/// Weighted-owner confirmation ledger.
///
/// # Invariants
/// - The ledger holds between zero and [`MAX_OWNERS`] owners.
/// - `is_confirmed` holds iff the summed weight of confirmed owners reaches
///   the minimum score.
/// - When no explicit minimum is set, the minimum is half the owner count,
///   floored, and never below one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionState {
    /// Owner entries keyed by identifier.
    owners: BTreeMap<OwnerId, OwnerEntry>,
    /// Explicit minimum passing score, when supplied.
    min_score: Option<u32>,
}

impl TransactionState {
    /// Creates an empty ledger with a derived minimum score.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an owner with an explicit confirmation weight.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] when the identifier is empty or already
    /// registered, or when the ledger is full.
    pub fn add_owner(&mut self, id: OwnerId, weight: u32) -> Result<(), PermissionError> {
        if id.as_str().is_empty() {
            return Err(PermissionError::EmptyOwnerId);
        }
        if self.owners.contains_key(&id) {
            return Err(PermissionError::DuplicateOwner(id.to_string()));
        }
        if self.owners.len() >= MAX_OWNERS {
            return Err(PermissionError::OwnerLimitExceeded);
        }
        self.owners.insert(id, OwnerEntry {
            weight,
            confirmed: false,
        });
        Ok(())
    }

    /// Registers an owner with the default weight of one.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] as for [`TransactionState::add_owner`].
    pub fn add_owner_default(&mut self, id: OwnerId) -> Result<(), PermissionError> {
        self.add_owner(id, 1)
    }

    /// Removes an owner from the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] when the identifier is empty or unknown.
    pub fn remove_owner(&mut self, id: &OwnerId) -> Result<(), PermissionError> {
        if id.as_str().is_empty() {
            return Err(PermissionError::EmptyOwnerId);
        }
        self.owners
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PermissionError::UnknownOwner(id.to_string()))
    }

    /// Records an owner's confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] when the identifier is empty or unknown.
    pub fn confirm(&mut self, id: &OwnerId) -> Result<(), PermissionError> {
        self.entry_mut(id)?.confirmed = true;
        Ok(())
    }

    /// Revokes an owner's confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] when the identifier is empty or unknown.
    pub fn revoke(&mut self, id: &OwnerId) -> Result<(), PermissionError> {
        self.entry_mut(id)?.confirmed = false;
        Ok(())
    }

    /// Clears every owner's confirmation.
    pub fn revoke_all(&mut self) {
        for entry in self.owners.values_mut() {
            entry.confirmed = false;
        }
    }

    /// Sets the explicit minimum passing score.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::InvalidMinScore`] when the score is zero.
    pub fn set_min_score(&mut self, min_score: u32) -> Result<(), PermissionError> {
        if min_score == 0 {
            return Err(PermissionError::InvalidMinScore);
        }
        self.min_score = Some(min_score);
        Ok(())
    }

    /// Returns the effective minimum passing score.
    #[must_use]
    pub fn min_score(&self) -> u32 {
        self.min_score.unwrap_or_else(|| {
            let derived = (self.owners.len() / 2) as u32;
            derived.max(1)
        })
    }

    /// Returns the summed weight of confirmed owners.
    #[must_use]
    pub fn current_score(&self) -> u32 {
        self.owners
            .values()
            .filter(|entry| entry.confirmed)
            .fold(0, |total, entry| total.saturating_add(entry.weight))
    }

    /// Returns true when the current score reaches the minimum.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.current_score() >= self.min_score()
    }

    /// Returns the number of registered owners.
    #[must_use]
    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    /// Returns true when the owner is registered.
    #[must_use]
    pub fn is_owner(&self, id: &OwnerId) -> bool {
        self.owners.contains_key(id)
    }

    /// Returns true when the owner has confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError`] when the identifier is empty or unknown.
    pub fn has_confirmed(&self, id: &OwnerId) -> Result<bool, PermissionError> {
        if id.as_str().is_empty() {
            return Err(PermissionError::EmptyOwnerId);
        }
        self.owners
            .get(id)
            .map(|entry| entry.confirmed)
            .ok_or_else(|| PermissionError::UnknownOwner(id.to_string()))
    }

    /// Looks up a mutable ledger entry by owner identifier.
    fn entry_mut(&mut self, id: &OwnerId) -> Result<&mut OwnerEntry, PermissionError> {
        if id.as_str().is_empty() {
            return Err(PermissionError::EmptyOwnerId);
        }
        self.owners.get_mut(id).ok_or_else(|| PermissionError::UnknownOwner(id.to_string()))
    }
}
