//! Pure damage resolution: how raw attack power distributes across
//! overshield, shield and vault health, and how much PP changes hands.

use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;

use crate::engine::types::{ActionCard, CardEffectKind, Move, MoveKind, Vault};

/// Damage applied when an offensive item carries neither a damage nor a
/// PP-steal value, so that no offensive action is a complete no-op.
pub const FALLBACK_DAMAGE: i64 = 5;

/// Normalized view of whatever is being played, move or card.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct AttackInput {
    pub damage: Option<i64>,
    pub pp_steal: Option<i64>,
    pub shield_boost: Option<i64>,
}

impl AttackInput {
    pub fn from_move(mv: &Move) -> Self {
        if mv.kind == MoveKind::Defense {
            AttackInput {
                damage: None,
                pp_steal: None,
                shield_boost: mv.shield_boost.or(Some(0)),
            }
        } else {
            AttackInput {
                damage: mv.damage,
                pp_steal: mv.pp_steal,
                shield_boost: None,
            }
        }
    }

    pub fn from_card(card: &ActionCard) -> Self {
        match card.effect.kind {
            CardEffectKind::ShieldBreach => AttackInput {
                damage: Some(card.effect.strength),
                pp_steal: None,
                shield_boost: None,
            },
            CardEffectKind::ShieldRestore => AttackInput {
                damage: None,
                pp_steal: None,
                shield_boost: Some(card.effect.strength),
            },
            CardEffectKind::PpTeleport => AttackInput {
                damage: None,
                pp_steal: Some(card.effect.strength),
                shield_boost: None,
            },
        }
    }
}

/// How an attack landed.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub enum OutcomeKind {
    /// Overshield ate the whole attack.
    Absorbed,
    /// Damage reached shield and/or health.
    Landed,
    /// Defensive play; only the attacker's own shield changed.
    ShieldBoosted,
}

/// Resolver output: deltas for both parties plus a log line. Nothing is
/// applied here; the orchestrator commits these transactionally.
#[derive(Clone, PartialEq, Debug)]
pub struct AttackOutcome {
    pub kind: OutcomeKind,
    pub shield_damage: i64,
    pub health_damage: i64,
    /// PP credited to the attacker, pre-clamped against its capacity.
    pub pp_stolen: i64,
    pub attacker_shield_gain: i64,
    pub overshield_absorbed: bool,
    /// Cooldown start instant for the target, when the hit drained it.
    pub cooldown_started: Option<DateTime<Utc>>,
    pub summary: String,
}

fn scaled(base: i64, modifier: f64) -> i64 {
    ((base.max(0) as f64) * modifier.max(1.0)).floor() as i64
}

/// Raw power of an offensive play against a target in the given shield state.
/// A missing damage value falls back to the PP-steal value treated as health
/// damage, halved while the target still has shield so steals cannot bypass
/// it; with neither present a small fixed damage applies.
pub fn raw_power(input: &AttackInput, target_shielded: bool, modifier: f64) -> i64 {
    let base = match (input.damage, input.pp_steal) {
        (Some(d), _) => d,
        (None, Some(s)) => {
            if target_shielded {
                s / 2
            } else {
                s
            }
        }
        (None, None) => FALLBACK_DAMAGE,
    };
    scaled(base, modifier)
}

/// Resolve one attack. Pure: reads both vault snapshots, mutates neither.
///
/// Order of absorption: overshield (all-or-nothing), then shield, then vault
/// health. Health damage converts 1:1 into PP for the attacker, clamped so
/// the attacker never exceeds capacity; the target's raw PP balance is never
/// debited by combat.
pub fn resolve_attack(
    input: &AttackInput,
    attacker: &Vault,
    target: &Vault,
    modifier: f64,
    now: DateTime<Utc>,
) -> AttackOutcome {
    if let Some(boost) = input.shield_boost {
        let gain = scaled(boost, modifier)
            .min(attacker.max_shield_strength - attacker.shield_strength)
            .max(0);
        return AttackOutcome {
            kind: OutcomeKind::ShieldBoosted,
            shield_damage: 0,
            health_damage: 0,
            pp_stolen: 0,
            attacker_shield_gain: gain,
            overshield_absorbed: false,
            cooldown_started: None,
            summary: format!("defensive play raised own shield by {gain}"),
        };
    }

    if target.overshield {
        return AttackOutcome {
            kind: OutcomeKind::Absorbed,
            shield_damage: 0,
            health_damage: 0,
            pp_stolen: 0,
            attacker_shield_gain: 0,
            overshield_absorbed: true,
            cooldown_started: None,
            summary: "attack fully absorbed by overshield".to_string(),
        };
    }

    let power = raw_power(input, target.shield_strength > 0, modifier);
    let shield_damage = power.min(target.shield_strength);
    let remaining = power - shield_damage;
    let health_damage = remaining.min(target.vault_health);
    let pp_stolen = health_damage
        .min(attacker.capacity - attacker.current_pp)
        .max(0);
    let drained = target.vault_health > 0 && health_damage == target.vault_health;

    AttackOutcome {
        kind: OutcomeKind::Landed,
        shield_damage,
        health_damage,
        pp_stolen,
        attacker_shield_gain: 0,
        overshield_absorbed: false,
        cooldown_started: drained.then_some(now),
        summary: format!(
            "power {power}: {shield_damage} shield damage, {health_damage} health damage, {pp_stolen} PP stolen{}",
            if drained { ", vault drained" } else { "" }
        ),
    }
}
