//! Daily-cycle scheduler: move slots and passive generator output roll over
//! lazily at 08:00 in the platform's civil timezone.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::America::New_York;

use crate::engine::types::Vault;

/// Local civil hour at which daily allowances reset.
pub const RESET_HOUR: u32 = 8;

fn civil_reset_instant(date: NaiveDate) -> DateTime<Utc> {
    let naive = date
        .and_hms_opt(RESET_HOUR, 0, 0)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN));
    match New_York.from_local_datetime(&naive) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        // Fall-back overlap: the clock shows 08:00 twice; the first pass wins.
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // New York shifts at 02:00 local, so 08:00 is never skipped; keep a
        // total function anyway.
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}

/// The most recent daily boundary at or before `now`: today's 08:00 local if
/// the local clock has passed it, otherwise yesterday's.
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let local = now.with_timezone(&New_York);
    let date = if local.hour() < RESET_HOUR {
        local.date_naive() - Duration::days(1)
    } else {
        local.date_naive()
    };
    civil_reset_instant(date)
}

/// If `last_reset` predates the current day boundary, return the boundary the
/// caller must roll forward to. `None` means the allowance is fresh.
pub fn rollover_if_stale(last_reset: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let boundary = day_start(now);
    (last_reset < boundary).then_some(boundary)
}

/// Passive generator output per day, a step function of generator level.
pub fn generator_rate(level: u8) -> i64 {
    match level {
        0 | 1 => 10,
        2 => 25,
        3 => 45,
        4 => 70,
        5 => 100,
        n => 100 + (i64::from(n) - 5) * 100,
    }
}

/// Lazily roll over every stale daily allowance on a vault. Idempotent:
/// calling twice within one day window equals calling once.
pub fn rollover_cycles(vault: Vault, now: DateTime<Utc>) -> Vault {
    let mut vault = vault;
    if let Some(boundary) = rollover_if_stale(vault.last_move_reset, now) {
        vault.moves_remaining = vault.max_moves_per_day;
        vault.move_consumptions.retain(|s| s.at >= boundary);
        vault.last_move_reset = boundary;
    }
    if let Some(boundary) = rollover_if_stale(vault.generator_last_reset, now) {
        let rate = generator_rate(vault.generator_level);
        vault.generator_pending_pp += rate;
        // Shield production is credited directly, capped at max.
        vault.shield_strength = (vault.shield_strength + rate).min(vault.max_shield_strength);
        vault.generator_last_reset = boundary;
    }
    vault
}

/// Move accrued generator income into the vault, capped at capacity.
/// Returns the vault and the amount actually collected; any surplus stays
/// pending.
pub fn collect_generator(vault: Vault) -> (Vault, i64) {
    let mut vault = vault;
    let collected = vault
        .generator_pending_pp
        .min(vault.capacity - vault.current_pp)
        .max(0);
    vault.current_pp += collected;
    vault.generator_pending_pp -= collected;
    (vault, collected)
}
