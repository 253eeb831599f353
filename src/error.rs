//! Engine error taxonomy. Every variant renders a human-readable message
//! suitable for direct display to the player.

use std::fmt;

use chrono::{DateTime, Utc};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Clone, PartialEq, Debug)]
pub enum EngineError {
    /// The vault balance does not cover the price.
    InsufficientFunds { need: i64, have: i64 },
    /// Premium upgrades also consume shards.
    InsufficientShards { need: i64, have: i64 },
    AlreadyMaxLevel { item_id: String, level: u8 },
    /// The day's move allowance is spent.
    NoMovesRemaining,
    /// The target vault is attack-immune until the given instant.
    TargetOnCooldown { until: DateTime<Utc> },
    InvalidTarget { reason: String },
    ItemNotFound { item_id: String },
    /// The item exists but has not been unlocked yet.
    ItemLocked { item_id: String },
    /// A consumable card with no uses left.
    NoUsesRemaining { item_id: String },
    /// An optimistic commit kept losing races and gave up.
    ConcurrentWriteConflict,
    /// A stored record violated a documented invariant.
    InconsistentState { detail: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InsufficientFunds { need, have } => {
                write!(f, "Need {need} PP, have {have} PP")
            }
            EngineError::InsufficientShards { need, have } => {
                write!(f, "Need {need} shards, have {have}")
            }
            EngineError::AlreadyMaxLevel { item_id, level } => {
                write!(f, "{item_id} is already at max level {level}")
            }
            EngineError::NoMovesRemaining => write!(f, "No moves remaining today"),
            EngineError::TargetOnCooldown { until } => {
                write!(f, "Target vault is on cooldown until {until}")
            }
            EngineError::InvalidTarget { reason } => write!(f, "Invalid target: {reason}"),
            EngineError::ItemNotFound { item_id } => write!(f, "No such item: {item_id}"),
            EngineError::ItemLocked { item_id } => write!(f, "{item_id} is not unlocked yet"),
            EngineError::NoUsesRemaining { item_id } => {
                write!(f, "{item_id} has no uses remaining")
            }
            EngineError::ConcurrentWriteConflict => {
                write!(f, "Another action modified this vault, try again")
            }
            EngineError::InconsistentState { detail } => {
                write!(f, "Inconsistent stored state: {detail}")
            }
        }
    }
}

impl std::error::Error for EngineError {}
