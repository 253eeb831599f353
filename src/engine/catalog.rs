//! Static move/card templates used to seed each player's collection.

use crate::engine::types::{
    ActionCard, CardEffect, CardEffectKind, Move, MoveCategory, MoveKind,
};

fn template(
    id: &str,
    category: MoveCategory,
    kind: MoveKind,
    cost: i64,
    base_price: i64,
    unlocked: bool,
    premium: bool,
) -> Move {
    Move {
        id: id.to_string(),
        category,
        kind,
        cost,
        base_price,
        damage: None,
        shield_boost: None,
        healing: None,
        pp_steal: None,
        debuff_strength: None,
        buff_strength: None,
        cooldown: 60,
        mastery_level: 1,
        unlocked,
        premium,
    }
}

/// The starter move collection granted on first access.
pub fn starter_moves() -> Vec<Move> {
    let mut quick_jab = template("quick-jab", MoveCategory::Basic, MoveKind::Attack, 10, 100, true, false);
    quick_jab.damage = Some(10);

    let mut power_strike = template("power-strike", MoveCategory::Advanced, MoveKind::Attack, 40, 250, false, false);
    power_strike.damage = Some(25);

    let mut barrier = template("barrier", MoveCategory::Basic, MoveKind::Defense, 15, 120, true, false);
    barrier.shield_boost = Some(15);

    let mut siphon = template("siphon", MoveCategory::Advanced, MoveKind::Utility, 30, 200, true, false);
    siphon.pp_steal = Some(12);

    let mut overload = template("overload", MoveCategory::Legendary, MoveKind::Special, 120, 400, false, true);
    overload.damage = Some(40);
    overload.buff_strength = Some(10);

    // No damage and no steal; resolves through the fallback rule.
    let taunt = template("taunt", MoveCategory::Basic, MoveKind::Utility, 5, 80, true, false);

    vec![quick_jab, power_strike, barrier, siphon, overload, taunt]
}

fn card(id: &str, kind: CardEffectKind, strength: i64, max_uses: u32, base_price: i64) -> ActionCard {
    ActionCard {
        id: id.to_string(),
        effect: CardEffect { kind, strength },
        uses: max_uses,
        max_uses,
        mastery_level: 1,
        base_price,
        unlocked: true,
        premium: false,
    }
}

/// The starter action-card collection granted on first access.
pub fn starter_cards() -> Vec<ActionCard> {
    vec![
        card("breach-charge", CardEffectKind::ShieldBreach, 20, 3, 150),
        card("aegis-patch", CardEffectKind::ShieldRestore, 18, 3, 150),
        card("pp-teleport", CardEffectKind::PpTeleport, 15, 2, 200),
    ]
}

/// Re-apply the unlock rule over a collection. Unlock state is monotonic:
/// `unlocked' = unlocked_old OR newly_qualifies`, merged here rather than at
/// scattered call sites.
pub fn sync_unlocks<F: Fn(&Move) -> bool>(moves: &mut [Move], qualifies: F) {
    for mv in moves.iter_mut() {
        let q = qualifies(mv);
        mv.merge_unlocked(q);
    }
}
