//! Siege orchestrator: one attack transaction, `Validate -> Resolve -> Apply
//! -> Log`. Apply is all-or-nothing across both ledgers; storage conflicts
//! are retried transparently up to a small bound.

use chrono::{DateTime, Utc};

use crate::engine::cycle::rollover_cycles;
use crate::engine::resolve::{resolve_attack, AttackInput, AttackOutcome, OutcomeKind};
use crate::engine::types::{ConsumptionKind, ConsumptionStamp, Vault};
use crate::error::{EngineError, EngineResult};
use crate::store::{LedgerStore, StoreError};

/// Optimistic-commit retries before surfacing `ConcurrentWriteConflict`.
pub const MAX_COMMIT_RETRIES: u32 = 3;

/// One attack, as requested by a caller.
#[derive(Clone, Debug)]
pub struct AttackRequest {
    pub attacker_id: String,
    pub target_id: String,
    /// Opaque equipped-modifier multiplier, >= 1.0.
    pub modifier: f64,
    /// Identity of the slot-consuming event; replays reuse the same stamp.
    pub stamp: Option<ConsumptionStamp>,
}

/// Everything the orchestrator committed for one attack.
#[derive(Clone, Debug)]
pub struct AttackApplied {
    pub outcome: AttackOutcome,
    pub attacker: Vault,
    pub target: Vault,
    pub target_shield_before: i64,
    pub target_health_before: i64,
    pub target_overshield_before: bool,
    /// False when the stamp was a replay and the slot had already been paid.
    pub slot_consumed: bool,
}

fn load_party(store: &dyn LedgerStore, owner: &str) -> EngineResult<(u64, Vault)> {
    let versioned = store.load(owner).ok_or_else(|| EngineError::InvalidTarget {
        reason: format!("{owner} has no vault"),
    })?;
    Ok((versioned.version, versioned.record))
}

/// Run one attack transaction against the store. Both vaults are loaded,
/// lazily rolled over, validated, mutated in memory and committed in a single
/// atomic write. The caller checks item unlock/uses before calling.
pub fn execute_attack(
    store: &dyn LedgerStore,
    input: &AttackInput,
    consumption: ConsumptionKind,
    req: &AttackRequest,
    now: DateTime<Utc>,
) -> EngineResult<AttackApplied> {
    if req.attacker_id == req.target_id {
        return Err(EngineError::InvalidTarget {
            reason: "a vault cannot besiege itself".to_string(),
        });
    }

    let mut attempt = 0u32;
    loop {
        let (attacker_version, attacker) = load_party(store, &req.attacker_id)?;
        let (target_version, target) = load_party(store, &req.target_id)?;

        // Stale daily allowances roll over on read, before validation.
        let mut attacker = rollover_cycles(attacker, now);
        let mut target = rollover_cycles(target, now);

        if target.cooldown_active(now) {
            return Err(EngineError::TargetOnCooldown {
                until: target.cooldown_until().unwrap_or(now),
            });
        }

        let stamp = req.stamp.unwrap_or(ConsumptionStamp {
            at: now,
            kind: consumption,
        });
        let already_consumed = attacker.move_consumptions.contains(&stamp);
        if !already_consumed && attacker.moves_remaining == 0 {
            return Err(EngineError::NoMovesRemaining);
        }
        // Exactly one decrement per event, even across retries and replays.
        let slot_consumed = attacker.consume_move_slot(stamp);

        let target_shield_before = target.shield_strength;
        let target_health_before = target.vault_health;
        let target_overshield_before = target.overshield;

        let outcome = resolve_attack(input, &attacker, &target, req.modifier, now);
        match outcome.kind {
            OutcomeKind::Absorbed => {
                target.overshield = false;
            }
            OutcomeKind::ShieldBoosted => {
                attacker.shield_strength = (attacker.shield_strength
                    + outcome.attacker_shield_gain)
                    .min(attacker.max_shield_strength);
            }
            OutcomeKind::Landed => {
                target.shield_strength -= outcome.shield_damage;
                target.vault_health -= outcome.health_damage;
                attacker.credit_pp(outcome.pp_stolen);
                if let Some(started) = outcome.cooldown_started {
                    target.vault_health_cooldown = Some(started);
                }
            }
        }

        for vault in [&mut attacker, &mut target] {
            if let Err(detail) = vault.check_invariants() {
                // Never ignored: record the anomaly, then fall back to the
                // nearest legal values.
                log::warn!("invariant violation on {}: {detail}", vault.owner_id);
                vault.clamp_to_invariants();
            }
        }

        let writes = vec![
            (req.attacker_id.clone(), attacker_version, attacker.clone()),
            (req.target_id.clone(), target_version, target.clone()),
        ];
        match store.commit(writes) {
            Ok(()) => {
                return Ok(AttackApplied {
                    outcome,
                    attacker,
                    target,
                    target_shield_before,
                    target_health_before,
                    target_overshield_before,
                    slot_consumed,
                })
            }
            Err(StoreError::Conflict { owner }) => {
                attempt += 1;
                if attempt > MAX_COMMIT_RETRIES {
                    log::warn!("siege commit on {owner} lost {attempt} races, giving up");
                    return Err(EngineError::ConcurrentWriteConflict);
                }
            }
            Err(StoreError::NotFound { owner }) => {
                return Err(EngineError::InvalidTarget {
                    reason: format!("{owner} has no vault"),
                })
            }
        }
    }
}
