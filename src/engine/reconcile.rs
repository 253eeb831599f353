//! Reconciliation guard: self-healing for the duplicated currency balance.
//!
//! A player's PP is mirrored in more than one stored record. When copies
//! diverge the highest value wins and the stale copy is corrected, so passive
//! income recorded in one copy is never erased by a stale read of the other.
//! Corrections are debounced and yield to freshly applied restores.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::engine::types::Vault;

/// Coalesce repeated corrections landing within this window.
pub const DEBOUNCE_MS: i64 = 500;
/// Skip currency corrections this long after an explicit restore, so a
/// just-applied admin/heal action is not clobbered.
pub const RESTORE_GRACE_SECS: i64 = 8;

/// Why a reconciliation pass did not correct anything.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SkipReason {
    Debounced,
    RestoreGrace,
}

/// Result of one reconciliation pass over two currency copies.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReconcileOutcome {
    /// Both copies now agree on `authoritative`. `corrected` is false when
    /// they already matched.
    Converged { authoritative: i64, corrected: bool },
    Skipped(SkipReason),
}

/// Both windows are scoped per owner: a restore protects that player's
/// just-applied heal, and the debounce coalesces repeated corrections of the
/// same balance, never anyone else's.
#[derive(Clone, Debug, Default)]
pub struct ReconciliationGuard {
    last_correction: HashMap<String, DateTime<Utc>>,
    last_restore: HashMap<String, DateTime<Utc>>,
}

impl ReconciliationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an explicit restore so the owner's grace window starts now.
    pub fn note_restore(&mut self, owner: &str, now: DateTime<Utc>) {
        self.last_restore.insert(owner.to_string(), now);
    }

    /// Decide the authoritative value for two copies of the same balance.
    /// The correction itself is idempotent; applying the returned value to
    /// both copies twice changes nothing.
    pub fn reconcile_currency(
        &mut self,
        owner: &str,
        a: i64,
        b: i64,
        now: DateTime<Utc>,
    ) -> ReconcileOutcome {
        let authoritative = a.max(b);
        if a == b {
            return ReconcileOutcome::Converged {
                authoritative,
                corrected: false,
            };
        }
        if let Some(restored) = self.last_restore.get(owner) {
            if now - *restored < Duration::seconds(RESTORE_GRACE_SECS) {
                return ReconcileOutcome::Skipped(SkipReason::RestoreGrace);
            }
        }
        if let Some(corrected) = self.last_correction.get(owner) {
            if now - *corrected < Duration::milliseconds(DEBOUNCE_MS) {
                return ReconcileOutcome::Skipped(SkipReason::Debounced);
            }
        }
        self.last_correction.insert(owner.to_string(), now);
        ReconcileOutcome::Converged {
            authoritative,
            corrected: true,
        }
    }
}

/// Recompute health and shield from currency and capacity. Health is a
/// derived quantity: full when the balance covers the ceiling, otherwise
/// bounded by both the ceiling and the balance.
pub fn repair_derived(vault: &mut Vault) {
    vault.max_vault_health = vault.capacity / 10;
    vault.vault_health = if vault.current_pp >= vault.max_vault_health {
        vault.max_vault_health
    } else {
        vault
            .vault_health
            .min(vault.max_vault_health)
            .min(vault.current_pp)
            .max(0)
    };
    vault.shield_strength = vault.shield_strength.clamp(0, vault.max_shield_strength);
}
