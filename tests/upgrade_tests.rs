//! Upgrade cost curve, seeded multiplier rolls and effect compounding.

use chrono::{TimeZone, Utc};
use rand::SeedableRng;
use rand_pcg::Lcg64Xsh32;
use vault_siege::engine::cost_curve::{
    multiplier_range, roll_multiplier, upgrade_card, upgrade_cost, upgrade_move,
};
use vault_siege::engine::types::{
    ActionCard, CardEffect, CardEffectKind, Move, MoveCategory, MoveKind, Vault, CARD_MAX_LEVEL,
    MOVE_MAX_LEVEL,
};
use vault_siege::engine::{EngineState, ItemRef};
use vault_siege::error::EngineError;

fn rng(seed: u8) -> Lcg64Xsh32 {
    Lcg64Xsh32::from_seed([seed; 16])
}

fn rich_vault(pp: i64) -> Vault {
    let now = Utc.with_ymd_and_hms(2026, 6, 15, 18, 0, 0).unwrap();
    let mut v = Vault::seeded_from_balance("p", pp, now);
    v.set_capacity(pp.max(1000) * 10);
    v.current_pp = pp;
    v
}

fn test_move(level: u8, premium: bool) -> Move {
    Move {
        id: "test-move".to_string(),
        category: MoveCategory::Basic,
        kind: MoveKind::Attack,
        cost: 10,
        base_price: 100,
        damage: Some(10),
        shield_boost: None,
        healing: Some(4),
        pp_steal: None,
        debuff_strength: None,
        buff_strength: None,
        cooldown: 60,
        mastery_level: level,
        unlocked: true,
        premium,
    }
}

#[test]
fn cost_doubles_per_level_and_is_strictly_monotonic() {
    let mut previous = 0;
    for level in 1..=9u8 {
        let cost = upgrade_cost(100, level, false);
        assert_eq!(cost, 100 * (1 << (level - 1)));
        assert!(cost > previous);
        previous = cost;
    }
}

#[test]
fn premium_items_pay_ten_times_the_base() {
    assert_eq!(upgrade_cost(100, 1, true), 1000);
    assert_eq!(upgrade_cost(100, 3, true), 4000);
}

#[test]
fn upgrade_rejected_at_max_level() {
    let mv = test_move(MOVE_MAX_LEVEL, false);
    let err = upgrade_move(mv, rich_vault(1_000_000), &mut rng(1)).unwrap_err();
    assert!(matches!(err, EngineError::AlreadyMaxLevel { level: 10, .. }));
}

#[test]
fn insufficient_funds_reports_need_and_have() {
    let mv = test_move(4, false); // cost 100 * 2^3 = 800
    let err = upgrade_move(mv, rich_vault(450), &mut rng(1)).unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientFunds {
            need: 800,
            have: 450
        }
    );
    assert_eq!(err.to_string(), "Need 800 PP, have 450 PP");
}

#[test]
fn premium_upgrade_requires_shards() {
    let mv = test_move(2, true);
    let mut vault = rich_vault(1_000_000);
    vault.shards = 1; // needs new_level - 1 = 2
    let err = upgrade_move(mv, vault, &mut rng(1)).unwrap_err();
    assert_eq!(err, EngineError::InsufficientShards { need: 2, have: 1 });

    let mv = test_move(2, true);
    let mut vault = rich_vault(1_000_000);
    vault.shards = 2;
    let (mv, vault, _) = upgrade_move(mv, vault, &mut rng(1)).unwrap();
    assert_eq!(mv.mastery_level, 3);
    assert_eq!(vault.shards, 0);
}

#[test]
fn rolls_are_deterministic_under_a_fixed_seed() {
    let a = roll_multiplier(&mut rng(7), 2, MOVE_MAX_LEVEL);
    let b = roll_multiplier(&mut rng(7), 2, MOVE_MAX_LEVEL);
    assert_eq!(a, b);
}

#[test]
fn rolls_stay_inside_the_level_range() {
    let mut r = rng(3);
    for new_level in 2..=MOVE_MAX_LEVEL {
        let (lo, hi) = multiplier_range(new_level, MOVE_MAX_LEVEL);
        for _ in 0..50 {
            let m = roll_multiplier(&mut r, new_level, MOVE_MAX_LEVEL);
            assert!(m >= lo && m < hi, "level {new_level}: {m} outside [{lo},{hi})");
        }
    }
}

#[test]
fn top_level_always_rolls_three_to_three_and_a_half() {
    assert_eq!(multiplier_range(MOVE_MAX_LEVEL, MOVE_MAX_LEVEL), (3.0, 3.5));
    assert_eq!(multiplier_range(CARD_MAX_LEVEL, CARD_MAX_LEVEL), (3.0, 3.5));
}

#[test]
fn upgrade_compounds_all_present_effect_fields() {
    let mv = test_move(1, false);
    let (mv, vault, multiplier) = upgrade_move(mv, rich_vault(10_000), &mut rng(9)).unwrap();

    assert_eq!(mv.mastery_level, 2);
    assert_eq!(vault.current_pp, 10_000 - 100);
    // Level 2 rolls in [2.0, 2.3): damage 10 floors into 20..=22.
    assert_eq!(mv.damage, Some((10.0 * multiplier).floor() as i64));
    assert_eq!(mv.healing, Some((4.0 * multiplier).floor() as i64));
    assert!(mv.damage.unwrap() >= 20 && mv.damage.unwrap() <= 22);
}

#[test]
fn card_upgrade_uses_the_five_level_curve() {
    let card = ActionCard {
        id: "breach".to_string(),
        effect: CardEffect {
            kind: CardEffectKind::ShieldBreach,
            strength: 20,
        },
        uses: 3,
        max_uses: 3,
        mastery_level: CARD_MAX_LEVEL,
        base_price: 150,
        unlocked: true,
        premium: false,
    };
    let err = upgrade_card(card, rich_vault(1_000_000), &mut rng(1)).unwrap_err();
    assert!(matches!(err, EngineError::AlreadyMaxLevel { level: 5, .. }));
}

#[test]
fn advanced_tier_unlocks_once_a_basic_move_hits_mastery_three() {
    let now = Utc.with_ymd_and_hms(2026, 6, 15, 18, 0, 0).unwrap();
    let mut engine = EngineState::new();
    engine.ensure_player("alice", 100_000, now);

    let locked = |engine: &EngineState, id: &str| {
        !engine
            .moves_of("alice")
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .unwrap()
            .unlocked
    };
    assert!(locked(&engine, "power-strike"));

    let item = ItemRef::Move {
        id: "quick-jab".to_string(),
    };
    engine.upgrade("alice", &item, now).unwrap(); // level 2
    assert!(locked(&engine, "power-strike"));
    engine.upgrade("alice", &item, now).unwrap(); // level 3
    assert!(!locked(&engine, "power-strike"));
    // Legendary tier needs an advanced move at mastery 5.
    assert!(locked(&engine, "overload"));
}

#[test]
fn mastery_only_moves_up_one_level_per_paid_upgrade() {
    let mut mv = test_move(1, false);
    let mut vault = rich_vault(1_000_000);
    let mut r = rng(5);
    for expected in 2..=MOVE_MAX_LEVEL {
        let (m2, v2, _) = upgrade_move(mv, vault, &mut r).unwrap();
        assert_eq!(m2.mastery_level, expected);
        mv = m2;
        vault = v2;
    }
}
