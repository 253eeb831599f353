//! Pure damage-resolver behavior: absorption order, currency conversion and
//! the fallback rules.

use chrono::{DateTime, TimeZone, Utc};
use vault_siege::engine::resolve::{
    raw_power, resolve_attack, AttackInput, OutcomeKind, FALLBACK_DAMAGE,
};
use vault_siege::engine::types::Vault;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 18, 0, 0).unwrap()
}

fn vault(owner: &str, capacity: i64, pp: i64, shield: i64, health: i64) -> Vault {
    let mut v = Vault::seeded_from_balance(owner, pp, t0());
    v.set_capacity(capacity);
    v.current_pp = pp.min(v.capacity);
    v.shield_strength = shield.min(v.max_shield_strength);
    v.vault_health = health.min(v.max_vault_health);
    v
}

fn plain_attack(damage: i64) -> AttackInput {
    AttackInput {
        damage: Some(damage),
        pp_steal: None,
        shield_boost: None,
    }
}

#[test]
fn overshield_absorbs_any_attack_completely() {
    let attacker = vault("a", 1000, 100, 0, 100);
    let mut target = vault("b", 1000, 500, 30, 100);
    target.overshield = true;

    let outcome = resolve_attack(&plain_attack(9999), &attacker, &target, 1.0, t0());

    assert_eq!(outcome.kind, OutcomeKind::Absorbed);
    assert!(outcome.overshield_absorbed);
    assert_eq!(outcome.shield_damage, 0);
    assert_eq!(outcome.health_damage, 0);
    assert_eq!(outcome.pp_stolen, 0);
    assert!(outcome.cooldown_started.is_none());
}

#[test]
fn shield_absorbs_before_health() {
    let attacker = vault("a", 1000, 100, 0, 100);
    let target = vault("b", 1000, 500, 30, 50);

    let outcome = resolve_attack(&plain_attack(50), &attacker, &target, 1.0, t0());

    assert_eq!(outcome.kind, OutcomeKind::Landed);
    assert_eq!(outcome.shield_damage, 30);
    assert_eq!(outcome.health_damage, 20);
    assert_eq!(outcome.pp_stolen, 20);
}

#[test]
fn health_damage_caps_at_remaining_health() {
    // capacity 1000 -> max_vault_health 100
    let attacker = vault("a", 1000, 550, 0, 100);
    let target = vault("b", 1000, 500, 0, 100);

    let outcome = resolve_attack(&plain_attack(150), &attacker, &target, 1.0, t0());

    assert_eq!(outcome.health_damage, 100);
    assert_eq!(outcome.pp_stolen, 100);
    assert_eq!(attacker.current_pp + outcome.pp_stolen, 650);
    assert!(outcome.cooldown_started.is_some());
}

#[test]
fn draining_health_starts_cooldown() {
    let attacker = vault("a", 1000, 0, 0, 100);
    let mut target = vault("b", 1000, 500, 0, 100);
    target.vault_health = 10;

    let outcome = resolve_attack(&plain_attack(10), &attacker, &target, 1.0, t0());
    assert_eq!(outcome.cooldown_started, Some(t0()));

    // A hit that leaves health above zero does not.
    let outcome = resolve_attack(&plain_attack(5), &attacker, &target, 1.0, t0());
    assert!(outcome.cooldown_started.is_none());
}

#[test]
fn already_empty_health_never_retriggers_cooldown() {
    let attacker = vault("a", 1000, 0, 0, 100);
    let mut target = vault("b", 1000, 500, 0, 100);
    target.vault_health = 0;

    let outcome = resolve_attack(&plain_attack(50), &attacker, &target, 1.0, t0());
    assert_eq!(outcome.health_damage, 0);
    assert!(outcome.cooldown_started.is_none());
}

#[test]
fn stolen_pp_clamps_at_attacker_capacity() {
    let attacker = vault("a", 1000, 990, 0, 100);
    let target = vault("b", 1000, 500, 0, 100);

    let outcome = resolve_attack(&plain_attack(80), &attacker, &target, 1.0, t0());

    assert_eq!(outcome.health_damage, 80);
    assert_eq!(outcome.pp_stolen, 10);
}

#[test]
fn modifier_scales_raw_power() {
    let input = plain_attack(10);
    assert_eq!(raw_power(&input, false, 2.5), 25);
    // Modifiers below 1.0 never weaken the attack.
    assert_eq!(raw_power(&input, false, 0.5), 10);
}

#[test]
fn steal_only_move_falls_back_to_health_damage() {
    let input = AttackInput {
        damage: None,
        pp_steal: Some(12),
        shield_boost: None,
    };
    assert_eq!(raw_power(&input, false, 1.0), 12);
    // Halved while the target still has shield.
    assert_eq!(raw_power(&input, true, 1.0), 6);
}

#[test]
fn move_without_damage_or_steal_uses_fallback() {
    let input = AttackInput {
        damage: None,
        pp_steal: None,
        shield_boost: None,
    };
    assert_eq!(raw_power(&input, false, 1.0), FALLBACK_DAMAGE);
}

#[test]
fn defensive_move_boosts_own_shield_and_ignores_target() {
    let mut attacker = vault("a", 1000, 100, 0, 100);
    attacker.shield_strength = 40; // max 50
    let target = vault("b", 1000, 500, 30, 100);

    let input = AttackInput {
        damage: None,
        pp_steal: None,
        shield_boost: Some(15),
    };
    let outcome = resolve_attack(&input, &attacker, &target, 1.0, t0());

    assert_eq!(outcome.kind, OutcomeKind::ShieldBoosted);
    assert_eq!(outcome.attacker_shield_gain, 10); // capped at max 50
    assert_eq!(outcome.shield_damage, 0);
    assert_eq!(outcome.health_damage, 0);
    assert_eq!(outcome.pp_stolen, 0);
}

#[test]
fn combat_never_debits_target_currency() {
    let attacker = vault("a", 1000, 100, 0, 100);
    let target = vault("b", 1000, 500, 0, 100);

    let outcome = resolve_attack(&plain_attack(60), &attacker, &target, 1.0, t0());

    // The outcome only carries target shield/health deltas; the target's
    // currency balance has no delta channel at all.
    assert_eq!(outcome.health_damage, 60);
    assert_eq!(target.current_pp, 500);
}
