//! Vault economy and battle-resolution engine.
//!
//! Pure computation lives in the leaf modules (`resolve`, `cycle`,
//! `cost_curve`, `reconcile`); `EngineState` is the service facade that loads
//! snapshots, invokes them and commits the result through the ledger store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_pcg::Lcg64Xsh32;
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;

pub mod attack_log;
pub mod catalog;
pub mod cost_curve;
pub mod cycle;
pub mod reconcile;
pub mod resolve;
pub mod siege;
pub mod types;

use crate::error::{EngineError, EngineResult};
use crate::store::{LedgerStore, MemoryStore};
use attack_log::{AttackLog, FileWriter};
use reconcile::{ReconcileOutcome, ReconciliationGuard};
use resolve::AttackInput;
use siege::AttackRequest;
use types::{ActionCard, AttackRecord, ConsumptionKind, ConsumptionStamp, Move, MoveCategory, Vault};

/// Which collection item a request names.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde", tag = "item_type")]
pub enum ItemRef {
    Move { id: String },
    Card { id: String },
}

impl ItemRef {
    pub fn id(&self) -> &str {
        match self {
            ItemRef::Move { id } | ItemRef::Card { id } => id,
        }
    }
}

/// One siege action against another player's vault.
#[derive(Clone, Debug)]
pub struct SiegeCommand {
    pub attacker_id: String,
    pub target_id: String,
    pub item: ItemRef,
    /// Opaque equipped-modifier multiplier, >= 1.0.
    pub modifier: f64,
    pub stamp: Option<ConsumptionStamp>,
}

/// Result of a mastery upgrade, echoing the rolled multiplier and price paid.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde", tag = "item_type")]
pub enum UpgradeReceipt {
    Move { item: Move, multiplier: f64, cost: i64 },
    Card { item: ActionCard, multiplier: f64, cost: i64 },
}

/// In-memory engine state managed by the web layer.
#[derive(Debug)]
pub struct EngineState {
    pub store: MemoryStore,
    /// Second stored copy of each player's currency (the profile record the
    /// rest of the platform reads). Intentionally allowed to lag; the
    /// reconciliation guard heals it.
    pub profile_balances: HashMap<String, i64>,
    pub moves: HashMap<String, Vec<Move>>,
    pub cards: HashMap<String, Vec<ActionCard>>,
    pub attack_log: Arc<AttackLog>,
    pub guard: ReconciliationGuard,
    pub rng: Lcg64Xsh32,
}

impl EngineState {
    pub fn new() -> Self {
        let attack_log = match std::env::var("ATTACK_LOG_FILE") {
            Ok(path) => {
                let mut log = match AttackLog::load_from_file(&path) {
                    Ok(l) => l,
                    Err(_) => AttackLog::new(),
                };
                if let Ok(writer) = FileWriter::new(std::path::PathBuf::from(&path)) {
                    log.set_writer(Some(writer));
                }
                log
            }
            Err(_) => AttackLog::new(),
        };
        EngineState {
            store: MemoryStore::new(),
            profile_balances: HashMap::new(),
            moves: HashMap::new(),
            cards: HashMap::new(),
            attack_log: Arc::new(attack_log),
            guard: ReconciliationGuard::new(),
            rng: Lcg64Xsh32::from_seed([0u8; 16]),
        }
    }

    /// Reset the RNG from a caller-provided seed for deterministic upgrades.
    pub fn set_seed(&mut self, seed: u64) {
        let mut seed_bytes = [0u8; 16];
        seed_bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        seed_bytes[8..16].copy_from_slice(&seed.to_le_bytes());
        self.rng = Lcg64Xsh32::from_seed(seed_bytes);
    }

    /// Create vault and collections on first access, seeded from the
    /// player's authoritative currency balance. Existing players are
    /// returned untouched.
    pub fn ensure_player(&mut self, owner: &str, balance: i64, now: DateTime<Utc>) -> Vault {
        if let Some(versioned) = self.store.load(owner) {
            return versioned.record;
        }
        let vault = Vault::seeded_from_balance(owner, balance, now);
        self.store.insert(vault.clone());
        self.profile_balances.insert(owner.to_string(), balance);
        self.moves
            .insert(owner.to_string(), catalog::starter_moves());
        self.cards
            .insert(owner.to_string(), catalog::starter_cards());
        vault
    }

    /// Current vault snapshot without side effects.
    pub fn vault(&self, owner: &str) -> Option<Vault> {
        self.store.load(owner).map(|v| v.record)
    }

    /// Vault snapshot with stale daily allowances rolled over and persisted.
    pub fn vault_refreshed(&mut self, owner: &str, now: DateTime<Utc>) -> Option<Vault> {
        let versioned = self.store.load(owner)?;
        let rolled = cycle::rollover_cycles(versioned.record.clone(), now);
        if rolled != versioned.record {
            let write = vec![(owner.to_string(), versioned.version, rolled.clone())];
            if let Err(e) = self.store.commit(write) {
                log::debug!("lazy rollover commit lost a race: {e}");
                return Some(versioned.record);
            }
        }
        Some(rolled)
    }

    pub fn moves_of(&self, owner: &str) -> Option<&Vec<Move>> {
        self.moves.get(owner)
    }

    pub fn cards_of(&self, owner: &str) -> Option<&Vec<ActionCard>> {
        self.cards.get(owner)
    }

    /// Execute one siege action end to end and append the attack record.
    pub fn attack(&mut self, cmd: &SiegeCommand, now: DateTime<Utc>) -> EngineResult<AttackRecord> {
        let (input, consumption) = match &cmd.item {
            ItemRef::Move { id } => {
                let mv = self
                    .moves
                    .get(&cmd.attacker_id)
                    .and_then(|ms| ms.iter().find(|m| &m.id == id))
                    .ok_or_else(|| EngineError::ItemNotFound {
                        item_id: id.clone(),
                    })?;
                if !mv.unlocked {
                    return Err(EngineError::ItemLocked {
                        item_id: id.clone(),
                    });
                }
                (AttackInput::from_move(mv), ConsumptionKind::Move)
            }
            ItemRef::Card { id } => {
                let card = self
                    .cards
                    .get(&cmd.attacker_id)
                    .and_then(|cs| cs.iter().find(|c| &c.id == id))
                    .ok_or_else(|| EngineError::ItemNotFound {
                        item_id: id.clone(),
                    })?;
                if !card.unlocked {
                    return Err(EngineError::ItemLocked {
                        item_id: id.clone(),
                    });
                }
                if card.uses == 0 {
                    return Err(EngineError::NoUsesRemaining {
                        item_id: id.clone(),
                    });
                }
                (AttackInput::from_card(card), ConsumptionKind::Card)
            }
        };

        let req = AttackRequest {
            attacker_id: cmd.attacker_id.clone(),
            target_id: cmd.target_id.clone(),
            modifier: cmd.modifier,
            stamp: cmd.stamp,
        };
        let applied = siege::execute_attack(&self.store, &input, consumption, &req, now)?;

        // Replays (same stamp) are fully idempotent: a second pass consumes
        // neither the move slot nor a card use.
        if applied.slot_consumed {
            if let ItemRef::Card { id } = &cmd.item {
                if let Some(cards) = self.cards.get_mut(&cmd.attacker_id) {
                    if let Some(card) = cards.iter_mut().find(|c| &c.id == id) {
                        card.uses = card.uses.saturating_sub(1);
                    }
                }
            }
        }

        // Apply-before-reconcile: the commit above is durable before any
        // currency-copy correction runs.
        self.reconcile_owner(&cmd.attacker_id, now);

        let outcome = &applied.outcome;
        let record = AttackRecord {
            seq: 0,
            attacker_id: cmd.attacker_id.clone(),
            target_id: cmd.target_id.clone(),
            item_id: cmd.item.id().to_string(),
            shield_damage: outcome.shield_damage,
            health_damage: outcome.health_damage,
            pp_stolen: outcome.pp_stolen,
            overshield_absorbed: outcome.overshield_absorbed,
            cooldown_triggered: outcome.cooldown_started.is_some(),
            target_shield_before: applied.target_shield_before,
            target_shield_after: applied.target.shield_strength,
            target_health_before: applied.target_health_before,
            target_health_after: applied.target.vault_health,
            target_overshield_before: applied.target_overshield_before,
            target_overshield_after: applied.target.overshield,
            summary: format!(
                "{} -> {} with {}: {}",
                cmd.attacker_id,
                cmd.target_id,
                cmd.item.id(),
                outcome.summary
            ),
            timestamp: now,
        };
        Ok(self.attack_log.append(record))
    }

    /// Upgrade a move or card one mastery level, charging the vault.
    pub fn upgrade(
        &mut self,
        owner: &str,
        item: &ItemRef,
        now: DateTime<Utc>,
    ) -> EngineResult<UpgradeReceipt> {
        self.with_commit_retry(|s| s.upgrade_once(owner, item, now))
    }

    fn upgrade_once(
        &mut self,
        owner: &str,
        item: &ItemRef,
        now: DateTime<Utc>,
    ) -> EngineResult<UpgradeReceipt> {
        let versioned = self
            .store
            .load(owner)
            .ok_or_else(|| EngineError::InvalidTarget {
                reason: format!("{owner} has no vault"),
            })?;
        let vault = cycle::rollover_cycles(versioned.record, now);

        let receipt = match item {
            ItemRef::Move { id } => {
                let mv = self
                    .moves
                    .get(owner)
                    .and_then(|ms| ms.iter().find(|m| &m.id == id))
                    .cloned()
                    .ok_or_else(|| EngineError::ItemNotFound {
                        item_id: id.clone(),
                    })?;
                let cost = cost_curve::upgrade_cost(mv.base_price, mv.mastery_level, mv.premium);
                let (upgraded, vault, multiplier) =
                    cost_curve::upgrade_move(mv, vault, &mut self.rng)?;
                self.commit_spend(owner, versioned.version, vault)?;
                if let Some(ms) = self.moves.get_mut(owner) {
                    if let Some(slot) = ms.iter_mut().find(|m| &m.id == id) {
                        *slot = upgraded.clone();
                    }
                }
                UpgradeReceipt::Move {
                    item: upgraded,
                    multiplier,
                    cost,
                }
            }
            ItemRef::Card { id } => {
                let card = self
                    .cards
                    .get(owner)
                    .and_then(|cs| cs.iter().find(|c| &c.id == id))
                    .cloned()
                    .ok_or_else(|| EngineError::ItemNotFound {
                        item_id: id.clone(),
                    })?;
                let cost =
                    cost_curve::upgrade_cost(card.base_price, card.mastery_level, card.premium);
                let (upgraded, vault, multiplier) =
                    cost_curve::upgrade_card(card, vault, &mut self.rng)?;
                self.commit_spend(owner, versioned.version, vault)?;
                if let Some(cs) = self.cards.get_mut(owner) {
                    if let Some(slot) = cs.iter_mut().find(|c| &c.id == id) {
                        *slot = upgraded.clone();
                    }
                }
                UpgradeReceipt::Card {
                    item: upgraded,
                    multiplier,
                    cost,
                }
            }
        };
        self.refresh_unlocks(owner);
        Ok(receipt)
    }

    /// Progression rule: higher tiers qualify as lower-tier moves gain
    /// mastery. Unlock state is monotonic, so a move that once qualified
    /// stays unlocked.
    fn refresh_unlocks(&mut self, owner: &str) {
        if let Some(moves) = self.moves.get_mut(owner) {
            let best_of = |category: MoveCategory, moves: &[Move]| {
                moves
                    .iter()
                    .filter(|m| m.category == category)
                    .map(|m| m.mastery_level)
                    .max()
                    .unwrap_or(1)
            };
            let best_basic = best_of(MoveCategory::Basic, moves);
            let best_advanced = best_of(MoveCategory::Advanced, moves);
            catalog::sync_unlocks(moves, |m| match m.category {
                MoveCategory::Basic => true,
                MoveCategory::Advanced | MoveCategory::Elite => best_basic >= 3,
                MoveCategory::Legendary => best_advanced >= 5,
            });
        }
    }

    /// Collect pending generator income into the vault. Returns the amount
    /// actually credited.
    pub fn collect(&mut self, owner: &str, now: DateTime<Utc>) -> EngineResult<i64> {
        self.with_commit_retry(|s| s.collect_once(owner, now))
    }

    fn collect_once(&mut self, owner: &str, now: DateTime<Utc>) -> EngineResult<i64> {
        let versioned = self
            .store
            .load(owner)
            .ok_or_else(|| EngineError::InvalidTarget {
                reason: format!("{owner} has no vault"),
            })?;
        let vault = cycle::rollover_cycles(versioned.record, now);
        let (vault, collected) = cycle::collect_generator(vault);
        self.commit_spend(owner, versioned.version, vault)?;
        Ok(collected)
    }

    /// Admin/heal path: refill vault health, clear the cooldown and start
    /// the reconciliation grace window.
    pub fn restore_vault(&mut self, owner: &str, now: DateTime<Utc>) -> EngineResult<Vault> {
        self.with_commit_retry(|s| s.restore_once(owner, now))
    }

    fn restore_once(&mut self, owner: &str, now: DateTime<Utc>) -> EngineResult<Vault> {
        let versioned = self
            .store
            .load(owner)
            .ok_or_else(|| EngineError::InvalidTarget {
                reason: format!("{owner} has no vault"),
            })?;
        let mut vault = versioned.record;
        vault.vault_health = vault.max_vault_health;
        vault.vault_health_cooldown = None;
        self.guard.note_restore(owner, now);
        self.store
            .commit(vec![(owner.to_string(), versioned.version, vault.clone())])
            .map_err(commit_error)?;
        Ok(vault)
    }

    /// Align the vault balance and the mirrored profile balance:
    /// highest-value-wins, then propagate to the stale copy. Derived health
    /// and shield are recomputed on every pass, even when the copies already
    /// agree.
    pub fn reconcile_owner(&mut self, owner: &str, now: DateTime<Utc>) -> Option<ReconcileOutcome> {
        let versioned = self.store.load(owner)?;
        let mut vault = versioned.record;
        let mirror = *self
            .profile_balances
            .entry(owner.to_string())
            .or_insert(vault.current_pp);
        let outcome = self
            .guard
            .reconcile_currency(owner, vault.current_pp, mirror, now);
        if let ReconcileOutcome::Converged {
            authoritative,
            corrected,
        } = outcome
        {
            if corrected {
                vault.current_pp = authoritative.min(vault.capacity);
                self.profile_balances
                    .insert(owner.to_string(), authoritative);
            }
            let before = vault.clone();
            reconcile::repair_derived(&mut vault);
            if corrected || vault != before {
                if let Err(e) =
                    self.store
                        .commit(vec![(owner.to_string(), versioned.version, vault)])
                {
                    // Advisory only; a fresh combat apply always wins the race.
                    log::debug!("reconcile commit for {owner} skipped: {e}");
                }
            }
        }
        Some(outcome)
    }

    /// Rerun an operation that lost an optimistic-commit race, up to the same
    /// bound the siege path uses. Each attempt reloads fresh state; any other
    /// error surfaces immediately.
    fn with_commit_retry<T>(
        &mut self,
        mut op: impl FnMut(&mut Self) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut attempt = 0u32;
        loop {
            match op(self) {
                Err(EngineError::ConcurrentWriteConflict)
                    if attempt < siege::MAX_COMMIT_RETRIES =>
                {
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Spend-path commit: currency decreases must land in both stored copies,
    /// otherwise max-wins reconciliation would resurrect the spent PP.
    fn commit_spend(&mut self, owner: &str, version: u64, vault: Vault) -> EngineResult<()> {
        let balance = vault.current_pp;
        self.store
            .commit(vec![(owner.to_string(), version, vault)])
            .map_err(commit_error)?;
        self.profile_balances.insert(owner.to_string(), balance);
        Ok(())
    }

    /// Flush the background attack-log writer.
    pub fn shutdown(&self) {
        self.attack_log.shutdown();
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

/// A commit can fail because a concurrent writer won the race, or because a
/// record loaded moments ago no longer exists. The latter is corruption, not
/// contention.
fn commit_error(e: crate::store::StoreError) -> EngineError {
    match e {
        crate::store::StoreError::Conflict { .. } => EngineError::ConcurrentWriteConflict,
        crate::store::StoreError::NotFound { owner } => EngineError::InconsistentState {
            detail: format!("vault record for {owner} disappeared mid-operation"),
        },
    }
}
