//! Intake ledger mutations.
//!
//! These functions only touch in-memory state; [`crate::tracker::Tracker`]
//! writes the result to the store after each call.

use crate::errors::ValidationError;
use crate::models::{IntakeEvent, Ledger, Parameters, ProfileId, Statistics};
use chrono::{DateTime, Utc};

/// Appends an intake event and bumps the referenced profile's use counter.
///
/// A profile reference that no longer resolves is still recorded on the
/// event; only the counter update is skipped.
pub fn add_intake(
    ledger: &mut Ledger,
    params: &mut Parameters,
    stats: &mut Statistics,
    amount: u32,
    profile_id: Option<ProfileId>,
    at: DateTime<Utc>,
) -> Result<IntakeEvent, ValidationError> {
    if amount == 0 {
        return Err(ValidationError::InvalidNumber);
    }

    let event = IntakeEvent {
        profile_id,
        amount,
        timestamp: at,
    };
    ledger.history.push(event.clone());
    ledger.cumulative_intake = ledger.cumulative_intake.saturating_add(amount);

    if let Some(id) = profile_id {
        if let Some(profile) = params.profiles.iter_mut().find(|p| p.id == id) {
            profile.use_count = profile.use_count.saturating_add(1);
        }
    }

    stats.total_consumed = stats.total_consumed.saturating_add(u64::from(amount));
    Ok(event)
}

/// Pops the latest event. Use counters are left untouched.
pub fn undo_last(ledger: &mut Ledger, stats: &mut Statistics) -> Option<IntakeEvent> {
    let event = ledger.history.pop()?;
    ledger.cumulative_intake = ledger.cumulative_intake.saturating_sub(event.amount);
    stats.total_consumed = stats.total_consumed.saturating_sub(u64::from(event.amount));
    Some(event)
}

/// Removes every event of the day and returns the amount taken off.
pub fn undo_all(ledger: &mut Ledger, stats: &mut Statistics) -> u32 {
    let removed = ledger
        .history
        .drain(..)
        .fold(0u32, |sum, event| sum.saturating_add(event.amount));
    ledger.cumulative_intake = ledger.cumulative_intake.saturating_sub(removed);
    stats.total_consumed = stats.total_consumed.saturating_sub(u64::from(removed));
    removed
}
