//! Day-boundary processing: folds the shortfall of elapsed days into lifetime
//! debt and starts a fresh ledger.

use crate::clock;
use crate::models::{Ledger, Statistics};
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rollover {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Calendar days between the stored day and today, at least 1.
    pub gap_days: u32,
    pub consumed_on_last_day: u32,
    pub goal: u32,
    pub debt_delta: u64,
}

impl Rollover {
    pub fn goal_met_on_last_day(&self) -> bool {
        self.consumed_on_last_day >= self.goal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverResult {
    SameDay,
    Rolled(Rollover),
}

/// Decides whether `ledger` is stale relative to `today` and what debt the
/// elapsed days add. Performs no I/O and mutates nothing.
///
/// The first gap day is charged its actual shortfall; every further skipped
/// day is charged a full goal. A stored day later than today still counts as
/// a single elapsed day.
pub fn check_rollover(today: NaiveDate, ledger: &Ledger, goal: u32) -> RolloverResult {
    if ledger.day == today {
        return RolloverResult::SameDay;
    }

    let gap_days = clock::days_between(ledger.day, today).clamp(1, i64::from(u32::MAX)) as u32;
    let consumed = ledger.cumulative_intake;
    let shortfall = u64::from(goal.saturating_sub(consumed));
    let skipped = u64::from(gap_days - 1) * u64::from(goal);

    RolloverResult::Rolled(Rollover {
        from: ledger.day,
        to: today,
        gap_days,
        consumed_on_last_day: consumed,
        goal,
        debt_delta: shortfall.saturating_add(skipped),
    })
}

/// Applies a computed rollover to statistics and resets the ledger.
///
/// Debt is only folded in when `stats` has not already processed `to`, so
/// replaying the same rollover is harmless.
pub fn apply_rollover(rollover: &Rollover, ledger: &mut Ledger, stats: &mut Statistics) {
    if stats.last_processed_day != rollover.to {
        stats.accumulated_debt = stats.accumulated_debt.saturating_add(rollover.debt_delta);
        stats
            .daily
            .insert(clock::day_key(rollover.from), rollover.consumed_on_last_day);

        if rollover.goal_met_on_last_day() {
            let extended = stats.current_streak.saturating_add(1);
            stats.best_streak = stats.best_streak.max(extended);
            stats.current_streak = if rollover.gap_days == 1 { extended } else { 0 };
        } else {
            stats.current_streak = 0;
        }
        stats.last_processed_day = rollover.to;
    }

    *ledger = Ledger::empty(rollover.to);
}
