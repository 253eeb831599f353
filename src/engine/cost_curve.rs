//! Exponential upgrade-cost curve and seeded power-multiplier rolls.

use rand::Rng;
use rand_pcg::Lcg64Xsh32;

use crate::engine::types::{ActionCard, Move, Vault, CARD_MAX_LEVEL, MOVE_MAX_LEVEL};
use crate::error::{EngineError, EngineResult};

/// Premium-tier items pay ten times the base price on every step.
const PREMIUM_PRICE_FACTOR: i64 = 10;

/// PP cost of the upgrade from `current_level` to `current_level + 1`:
/// `base_price * 2^(level-1)`, doubling on every step.
pub fn upgrade_cost(base_price: i64, current_level: u8, premium: bool) -> i64 {
    let base = if premium {
        base_price * PREMIUM_PRICE_FACTOR
    } else {
        base_price
    };
    base * (1i64 << current_level.saturating_sub(1).min(62))
}

/// Half-open multiplier range for the roll that accompanies an upgrade to
/// `new_level`. The top level always rolls in [3.0, 3.5).
pub fn multiplier_range(new_level: u8, max_level: u8) -> (f64, f64) {
    if new_level >= max_level {
        return (3.0, 3.5);
    }
    match new_level {
        2 => (2.0, 2.3),
        3 => (1.25, 1.5),
        4 => (1.5, 1.75),
        5 => (1.75, 2.0),
        6 => (2.0, 2.25),
        7 => (2.25, 2.5),
        8 => (2.5, 2.75),
        9 => (2.75, 3.0),
        _ => (1.0, 1.25),
    }
}

/// Roll a uniform multiplier for `new_level`. The RNG is injected so upgrade
/// outcomes stay reproducible under a fixed seed.
pub fn roll_multiplier(rng: &mut Lcg64Xsh32, new_level: u8, max_level: u8) -> f64 {
    let (lo, hi) = multiplier_range(new_level, max_level);
    rng.gen_range(lo..hi)
}

fn charge(vault: &mut Vault, cost: i64, premium: bool, new_level: u8) -> EngineResult<()> {
    if vault.current_pp < cost {
        return Err(EngineError::InsufficientFunds {
            need: cost,
            have: vault.current_pp,
        });
    }
    if premium {
        let shards_needed = i64::from(new_level) - 1;
        if vault.shards < shards_needed {
            return Err(EngineError::InsufficientShards {
                need: shards_needed,
                have: vault.shards,
            });
        }
        vault.shards -= shards_needed;
    }
    vault.current_pp -= cost;
    Ok(())
}

/// Upgrade a move one mastery level: charge the vault, roll a multiplier and
/// compound every present effect field. Returns the rolled multiplier.
pub fn upgrade_move(
    mv: Move,
    vault: Vault,
    rng: &mut Lcg64Xsh32,
) -> EngineResult<(Move, Vault, f64)> {
    if mv.mastery_level >= MOVE_MAX_LEVEL {
        return Err(EngineError::AlreadyMaxLevel {
            item_id: mv.id,
            level: mv.mastery_level,
        });
    }
    let mut mv = mv;
    let mut vault = vault;
    let cost = upgrade_cost(mv.base_price, mv.mastery_level, mv.premium);
    let new_level = mv.mastery_level + 1;
    charge(&mut vault, cost, mv.premium, new_level)?;
    let m = roll_multiplier(rng, new_level, MOVE_MAX_LEVEL);
    mv.apply_multiplier(m);
    mv.mastery_level = new_level;
    Ok((mv, vault, m))
}

/// Upgrade an action card one mastery level. Same curve as moves with a max
/// level of 5.
pub fn upgrade_card(
    card: ActionCard,
    vault: Vault,
    rng: &mut Lcg64Xsh32,
) -> EngineResult<(ActionCard, Vault, f64)> {
    if card.mastery_level >= CARD_MAX_LEVEL {
        return Err(EngineError::AlreadyMaxLevel {
            item_id: card.id,
            level: card.mastery_level,
        });
    }
    let mut card = card;
    let mut vault = vault;
    let cost = upgrade_cost(card.base_price, card.mastery_level, card.premium);
    let new_level = card.mastery_level + 1;
    charge(&mut vault, cost, card.premium, new_level)?;
    let m = roll_multiplier(rng, new_level, CARD_MAX_LEVEL);
    card.apply_multiplier(m);
    card.mastery_level = new_level;
    Ok((card, vault, m))
}
