use chrono::{DateTime, Duration, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;

/// Default capacity for a freshly created vault.
pub const DEFAULT_CAPACITY: i64 = 1_000;
/// Default maximum shield strength for a freshly created vault.
pub const DEFAULT_MAX_SHIELD: i64 = 50;
/// Move slots granted per day cycle.
pub const MAX_MOVES_PER_DAY: u32 = 3;
/// How long a drained vault stays attack-immune.
pub const VAULT_COOLDOWN_HOURS: i64 = 4;
/// Top mastery level for moves.
pub const MOVE_MAX_LEVEL: u8 = 10;
/// Top mastery level for action cards.
pub const CARD_MAX_LEVEL: u8 = 5;

/// Catalog tier of a move.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub enum MoveCategory {
    Basic,
    Advanced,
    Elite,
    Legendary,
}

/// What a move does when played.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub enum MoveKind {
    Attack,
    Defense,
    Utility,
    Special,
}

/// An unlockable ability. Numeric effect fields are optional and compound
/// through mastery upgrades.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct Move {
    pub id: String,
    pub category: MoveCategory,
    pub kind: MoveKind,
    /// PP cost to use the move.
    pub cost: i64,
    /// Base price of the mastery upgrade curve.
    pub base_price: i64,
    pub damage: Option<i64>,
    pub shield_boost: Option<i64>,
    pub healing: Option<i64>,
    pub pp_steal: Option<i64>,
    pub debuff_strength: Option<i64>,
    pub buff_strength: Option<i64>,
    /// Cooldown between uses, in seconds.
    pub cooldown: i64,
    /// 1..=10, only ever increased by paid upgrades.
    pub mastery_level: u8,
    /// Monotonic: once true it never reverts outside an explicit reset.
    pub unlocked: bool,
    /// Premium moves use a 10x base price and consume shards on upgrade.
    pub premium: bool,
}

impl Move {
    /// Multiply every present effect field by `m`, flooring the result.
    pub fn apply_multiplier(&mut self, m: f64) {
        for field in [
            &mut self.damage,
            &mut self.shield_boost,
            &mut self.healing,
            &mut self.pp_steal,
            &mut self.debuff_strength,
            &mut self.buff_strength,
        ] {
            if let Some(v) = field {
                *v = ((*v as f64) * m).floor() as i64;
            }
        }
    }

    /// Monotonic unlock merge: a move that qualifies stays unlocked forever.
    pub fn merge_unlocked(&mut self, newly_qualifies: bool) {
        self.unlocked = self.unlocked || newly_qualifies;
    }
}

/// Effect carried by a consumable action card.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub enum CardEffectKind {
    ShieldBreach,
    ShieldRestore,
    PpTeleport,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct CardEffect {
    #[serde(rename = "type")]
    pub kind: CardEffectKind,
    pub strength: i64,
}

/// A consumable card with limited uses.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct ActionCard {
    pub id: String,
    pub effect: CardEffect,
    pub uses: u32,
    pub max_uses: u32,
    /// 1..=5, only ever increased by paid upgrades.
    pub mastery_level: u8,
    pub base_price: i64,
    pub unlocked: bool,
    pub premium: bool,
}

impl ActionCard {
    /// Multiply the card's effect strength by `m`, flooring the result.
    pub fn apply_multiplier(&mut self, m: f64) {
        self.effect.strength = ((self.effect.strength as f64) * m).floor() as i64;
    }
}

/// What kind of event consumed a move slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub enum ConsumptionKind {
    Move,
    Card,
}

/// Identity of one slot-consuming event. Offline-queued attacks replay with
/// the same stamp, so an equal stamp within the day window never consumes a
/// second slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct ConsumptionStamp {
    pub at: DateTime<Utc>,
    pub kind: ConsumptionKind,
}

/// A player's persistent resource container: currency, shield, health pool
/// and daily allowances.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct Vault {
    pub owner_id: String,
    /// Max PP the vault can hold; upgradeable.
    pub capacity: i64,
    /// Currency. 0 <= current_pp <= capacity.
    pub current_pp: i64,
    /// 0 <= vault_health <= max_vault_health.
    pub vault_health: i64,
    /// Always capacity / 10, recomputed whenever capacity changes.
    pub max_vault_health: i64,
    pub shield_strength: i64,
    pub max_shield_strength: i64,
    /// Single-use full absorption of the next successful hit.
    pub overshield: bool,
    pub moves_remaining: u32,
    pub max_moves_per_day: u32,
    pub last_move_reset: DateTime<Utc>,
    pub generator_level: u8,
    /// Accrued, uncollected passive income.
    pub generator_pending_pp: i64,
    pub generator_last_reset: DateTime<Utc>,
    /// When set, the vault is attack-immune for a fixed window from this
    /// instant.
    pub vault_health_cooldown: Option<DateTime<Utc>>,
    /// Pass-through fields; the engine's core math never touches them.
    pub debt_status: bool,
    pub debt_amount: i64,
    /// Premium upgrade resource.
    pub shards: i64,
    /// Slot-consumption stamps for the current day window.
    pub move_consumptions: Vec<ConsumptionStamp>,
}

impl Vault {
    /// Create the default vault on first access, seeded from the player's
    /// current currency balance.
    pub fn seeded_from_balance(owner_id: &str, balance: i64, now: DateTime<Utc>) -> Self {
        let capacity = DEFAULT_CAPACITY.max(balance);
        let max_vault_health = capacity / 10;
        Vault {
            owner_id: owner_id.to_string(),
            capacity,
            current_pp: balance.clamp(0, capacity),
            vault_health: max_vault_health,
            max_vault_health,
            shield_strength: DEFAULT_MAX_SHIELD,
            max_shield_strength: DEFAULT_MAX_SHIELD,
            overshield: false,
            moves_remaining: MAX_MOVES_PER_DAY,
            max_moves_per_day: MAX_MOVES_PER_DAY,
            last_move_reset: now,
            generator_level: 1,
            generator_pending_pp: 0,
            generator_last_reset: now,
            vault_health_cooldown: None,
            debt_status: false,
            debt_amount: 0,
            shards: 0,
            move_consumptions: Vec::new(),
        }
    }

    /// Change capacity and recompute the derived health ceiling.
    pub fn set_capacity(&mut self, capacity: i64) {
        self.capacity = capacity.max(0);
        self.max_vault_health = self.capacity / 10;
        self.clamp_to_invariants();
    }

    /// Whether the vault is currently attack-immune.
    pub fn cooldown_active(&self, now: DateTime<Utc>) -> bool {
        match self.vault_health_cooldown {
            Some(started) => now < started + Duration::hours(VAULT_COOLDOWN_HOURS),
            None => false,
        }
    }

    /// Instant at which the current cooldown expires, if one is set.
    pub fn cooldown_until(&self) -> Option<DateTime<Utc>> {
        self.vault_health_cooldown
            .map(|started| started + Duration::hours(VAULT_COOLDOWN_HOURS))
    }

    /// Credit PP, clamped at capacity. Returns the amount actually credited.
    pub fn credit_pp(&mut self, amount: i64) -> i64 {
        let credited = amount.max(0).min(self.capacity - self.current_pp);
        self.current_pp += credited;
        credited
    }

    /// Consume one move slot for the given event. Returns false when the
    /// stamp was already recorded, in which case nothing is decremented.
    pub fn consume_move_slot(&mut self, stamp: ConsumptionStamp) -> bool {
        if self.move_consumptions.contains(&stamp) {
            return false;
        }
        self.moves_remaining = self.moves_remaining.saturating_sub(1);
        self.move_consumptions.push(stamp);
        true
    }

    /// Verify every documented invariant, returning the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.current_pp < 0 || self.current_pp > self.capacity {
            return Err(format!(
                "current_pp {} outside 0..={}",
                self.current_pp, self.capacity
            ));
        }
        if self.max_vault_health != self.capacity / 10 {
            return Err(format!(
                "max_vault_health {} != capacity/10 ({})",
                self.max_vault_health,
                self.capacity / 10
            ));
        }
        if self.vault_health < 0 || self.vault_health > self.max_vault_health {
            return Err(format!(
                "vault_health {} outside 0..={}",
                self.vault_health, self.max_vault_health
            ));
        }
        if self.shield_strength < 0 || self.shield_strength > self.max_shield_strength {
            return Err(format!(
                "shield_strength {} outside 0..={}",
                self.shield_strength, self.max_shield_strength
            ));
        }
        if self.moves_remaining > self.max_moves_per_day {
            return Err(format!(
                "moves_remaining {} > max {}",
                self.moves_remaining, self.max_moves_per_day
            ));
        }
        Ok(())
    }

    /// Repair out-of-range values by clamping to the nearest legal value.
    /// Returns true when anything had to change.
    pub fn clamp_to_invariants(&mut self) -> bool {
        let before = self.clone();
        self.max_vault_health = self.capacity / 10;
        self.current_pp = self.current_pp.clamp(0, self.capacity);
        self.vault_health = self.vault_health.clamp(0, self.max_vault_health);
        self.shield_strength = self.shield_strength.clamp(0, self.max_shield_strength);
        self.moves_remaining = self.moves_remaining.min(self.max_moves_per_day);
        *self != before
    }
}

/// Append-only log entry describing one resolved attack.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct AttackRecord {
    pub seq: u64,
    pub attacker_id: String,
    pub target_id: String,
    pub item_id: String,
    pub shield_damage: i64,
    /// Health damage; converts 1:1 into PP gained by the attacker.
    pub health_damage: i64,
    pub pp_stolen: i64,
    pub overshield_absorbed: bool,
    pub cooldown_triggered: bool,
    pub target_shield_before: i64,
    pub target_shield_after: i64,
    pub target_health_before: i64,
    pub target_health_after: i64,
    pub target_overshield_before: bool,
    pub target_overshield_after: bool,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}
