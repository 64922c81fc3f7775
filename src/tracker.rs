//! The single owner of durable state.
//!
//! Every operation reads, mutates and writes back to the [`Store`] before it
//! returns, then publishes the new level for the gauge. Flushing the store to
//! disk is left to the caller (`Store::take_dirty` tells whether it is needed).

use crate::clock;
use crate::errors::ValidationError;
use crate::gauge::{LevelHandle, LevelReading};
use crate::ledger;
use crate::models::{
    smallest_available_id, HistoryEntry, IntakeEvent, Ledger, Parameters, Profile, ProfileIcon,
    ProfileId, ReminderId, ReminderRule, Statistics, StatsResponse, TodayResponse,
};
use crate::reminder::{Notifier, ReminderEvaluator, ReminderOutcome};
use crate::rollover::{self, Rollover, RolloverResult};
use crate::stats;
use crate::store::Store;
use chrono::{DateTime, Local, Utc};
use tracing::{debug, info};

const MAX_LABEL_CHARS: usize = 40;

#[derive(Debug)]
pub struct Tracker {
    store: Store,
    params: Parameters,
    ledger: Ledger,
    stats: Statistics,
    level: LevelHandle,
}

impl Tracker {
    /// Loads state from `store`, backfilling anything missing, and processes
    /// a pending day rollover.
    pub fn open(mut store: Store, now: DateTime<Local>) -> Self {
        let today = clock::day_of(now);
        let params = store.read_parameters();
        let stored = store.read_ledger();
        let existing_stats = store.read_statistics();

        let (ledger, stats) = match stored {
            None => {
                info!("first run, starting a fresh ledger");
                (Ledger::empty(today), existing_stats.unwrap_or_else(|| Statistics::fresh(today)))
            }
            Some(stored) => match stored.day {
                Some(day) => (
                    Ledger {
                        day,
                        cumulative_intake: stored.cumulative_intake,
                        history: stored.history,
                    },
                    existing_stats.unwrap_or_else(|| Statistics::fresh(day)),
                ),
                None => {
                    info!("stored ledger has no readable day, resetting");
                    (
                        Ledger::empty(today),
                        existing_stats.unwrap_or_else(|| Statistics::fresh(today)),
                    )
                }
            },
        };

        let level = LevelHandle::new(LevelReading {
            cumulative: ledger.cumulative_intake,
            goal: params.effective_goal(),
        });

        let mut tracker = Self {
            store,
            params,
            ledger,
            stats,
            level,
        };
        tracker.check_rollover(now);
        tracker.sync();
        tracker
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Whether the store changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        self.store.take_dirty()
    }

    /// Handle the gauge polls for the intake level.
    pub fn level(&self) -> LevelHandle {
        self.level.clone()
    }

    pub fn level_reading(&self) -> LevelReading {
        LevelReading {
            cumulative: self.ledger.cumulative_intake,
            goal: self.params.effective_goal(),
        }
    }

    fn sync(&mut self) {
        self.store.write_parameters(&self.params);
        self.store.write_ledger(&self.ledger);
        self.store.write_statistics(&self.stats);
        self.level.publish(self.level_reading());
    }

    /// Resets the ledger if the stored day is no longer today.
    pub fn check_rollover(&mut self, now: DateTime<Local>) -> Option<Rollover> {
        let today = clock::day_of(now);
        match rollover::check_rollover(today, &self.ledger, self.params.effective_goal()) {
            RolloverResult::SameDay => None,
            RolloverResult::Rolled(rollover) => {
                rollover::apply_rollover(&rollover, &mut self.ledger, &mut self.stats);
                self.store.clear_notified();
                info!(
                    from = %rollover.from,
                    to = %rollover.to,
                    gap_days = rollover.gap_days,
                    debt_delta = rollover.debt_delta,
                    "day rolled over"
                );
                self.sync();
                Some(rollover)
            }
        }
    }

    pub fn add_intake(
        &mut self,
        amount: u32,
        profile_id: Option<ProfileId>,
        now: DateTime<Local>,
    ) -> Result<IntakeEvent, ValidationError> {
        self.check_rollover(now);
        let event = ledger::add_intake(
            &mut self.ledger,
            &mut self.params,
            &mut self.stats,
            amount,
            profile_id,
            now.with_timezone(&Utc),
        )?;
        self.sync();
        Ok(event)
    }

    /// Adds the amount of a quick-add profile.
    pub fn quick_add(
        &mut self,
        profile_id: ProfileId,
        now: DateTime<Local>,
    ) -> Result<IntakeEvent, ValidationError> {
        let amount = self
            .params
            .profile(profile_id)
            .map(|profile| profile.amount)
            .ok_or(ValidationError::UnknownProfile)?;
        self.add_intake(amount, Some(profile_id), now)
    }

    /// Adds a free-form amount typed by the user.
    pub fn add_custom(
        &mut self,
        raw_amount: Option<&str>,
        now: DateTime<Local>,
    ) -> Result<IntakeEvent, ValidationError> {
        let amount = parse_amount(raw_amount)?;
        self.add_intake(amount, None, now)
    }

    pub fn undo_last(&mut self, now: DateTime<Local>) -> Option<IntakeEvent> {
        self.check_rollover(now);
        let event = ledger::undo_last(&mut self.ledger, &mut self.stats)?;
        self.sync();
        Some(event)
    }

    pub fn undo_all(&mut self, now: DateTime<Local>) -> u32 {
        self.check_rollover(now);
        let removed = ledger::undo_all(&mut self.ledger, &mut self.stats);
        self.sync();
        removed
    }

    pub fn set_goal(&mut self, raw: Option<&str>) -> Result<u32, ValidationError> {
        let goal = parse_amount(raw)?;
        self.params.goal = goal;
        self.sync();
        Ok(goal)
    }

    pub fn add_profile(
        &mut self,
        label: Option<&str>,
        icon: Option<ProfileIcon>,
        raw_amount: Option<&str>,
    ) -> Result<Profile, ValidationError> {
        let label = label.map(str::trim).unwrap_or_default();
        if label.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        if label.chars().count() > MAX_LABEL_CHARS {
            return Err(ValidationError::InvalidProfile);
        }
        let amount = parse_amount(raw_amount)?;

        let id = smallest_available_id(self.params.profiles.iter().map(|p| p.id.0));
        let profile = Profile {
            id: ProfileId(id),
            icon: icon.unwrap_or_default(),
            label: label.to_string(),
            amount,
            use_count: 0,
        };
        self.params.profiles.push(profile.clone());
        self.sync();
        Ok(profile)
    }

    /// Past intake events keep pointing at the removed id.
    pub fn delete_profile(&mut self, id: ProfileId) -> Result<Profile, ValidationError> {
        let index = self
            .params
            .profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or(ValidationError::UnknownProfile)?;
        let removed = self.params.profiles.remove(index);
        self.sync();
        Ok(removed)
    }

    pub fn add_reminder(
        &mut self,
        raw_amount: Option<&str>,
        raw_time: Option<&str>,
    ) -> Result<ReminderRule, ValidationError> {
        let time = raw_time.map(str::trim).unwrap_or_default();
        if time.is_empty() || raw_amount.map(str::trim).unwrap_or_default().is_empty() {
            return Err(ValidationError::MissingFields);
        }
        let amount = parse_amount(raw_amount)?;
        let deadline = clock::parse_time(time).ok_or(ValidationError::InvalidTime)?;
        if self
            .params
            .reminders
            .iter()
            .any(|rule| rule.deadline_minutes_since_midnight == deadline)
        {
            return Err(ValidationError::DuplicateTime);
        }

        let id = smallest_available_id(self.params.reminders.iter().map(|r| r.id.0));
        let rule = ReminderRule {
            id: ReminderId(id),
            threshold_amount: amount,
            deadline_minutes_since_midnight: deadline,
        };
        self.params.reminders.push(rule.clone());
        self.params.sort_reminders();
        self.sync();
        Ok(rule)
    }

    pub fn delete_reminder(&mut self, id: ReminderId) -> Result<ReminderRule, ValidationError> {
        let index = self
            .params
            .reminders
            .iter()
            .position(|r| r.id == id)
            .ok_or(ValidationError::UnknownReminder)?;
        let removed = self.params.reminders.remove(index);
        self.sync();
        Ok(removed)
    }

    /// Load/focus check: processes a day change, then re-evaluates reminders
    /// and records which rule was shown today.
    pub fn evaluate_reminders<N: Notifier>(
        &mut self,
        evaluator: &mut ReminderEvaluator<N>,
        now: DateTime<Local>,
    ) -> ReminderOutcome {
        if self.check_rollover(now).is_some() {
            evaluator.dismiss();
        }

        let today = self.ledger.day;
        let store = &self.store;
        let outcome = evaluator.evaluate(
            &self.params.reminders,
            clock::minutes_since_midnight(now),
            self.ledger.cumulative_intake,
            |rule| store.is_notified(rule, today),
        );
        if let ReminderOutcome::Issued { rule, .. } = outcome {
            self.store.mark_notified(rule, today);
        }
        debug!(?outcome, "reminders evaluated");
        outcome
    }

    /// Profiles ordered for the quick-add bar, most used first.
    pub fn profiles_by_use(&self) -> Vec<&Profile> {
        let mut profiles: Vec<&Profile> = self.params.profiles.iter().collect();
        profiles.sort_by(|a, b| b.use_count.cmp(&a.use_count));
        profiles
    }

    pub fn today(&self) -> TodayResponse {
        let goal = self.params.effective_goal();
        let history = self
            .ledger
            .history
            .iter()
            .rev()
            .map(|event| {
                let profile = event.profile_id.and_then(|id| self.params.profile(id));
                HistoryEntry {
                    icon: profile
                        .map(|p| p.icon)
                        .unwrap_or(ProfileIcon::Generic)
                        .emoji()
                        .to_string(),
                    label: profile
                        .map(|p| p.label.clone())
                        .unwrap_or_else(|| "Water".to_string()),
                    amount: event.amount,
                    time: clock::format_minutes(clock::minutes_since_midnight(
                        event.timestamp.with_timezone(&Local),
                    )),
                }
            })
            .collect();

        TodayResponse {
            date: self.ledger.day.to_string(),
            cumulative_intake: self.ledger.cumulative_intake,
            goal,
            percent: percent_of(self.ledger.cumulative_intake, goal),
            history,
        }
    }

    pub fn stats_summary(&self, now: DateTime<Local>) -> StatsResponse {
        stats::build_stats_at(
            clock::day_of(now),
            &self.stats,
            &self.ledger,
            self.params.effective_goal(),
        )
    }
}

/// Positive whole number of millilitres from raw form input.
pub fn parse_amount(raw: Option<&str>) -> Result<u32, ValidationError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidNumber);
    }
    match raw.parse::<i64>() {
        Ok(value) if value > 0 => u32::try_from(value).map_err(|_| ValidationError::InvalidNumber),
        _ => Err(ValidationError::InvalidNumber),
    }
}

/// Whole percent of `goal` reached, saturating at `u32::MAX`.
fn percent_of(cumulative: u32, goal: u32) -> u32 {
    let percent = u64::from(cumulative) * 100 / u64::from(goal.max(1));
    u32::try_from(percent).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gauge::LevelSource;
    use crate::reminder::NotificationBoard;
    use crate::store::{DAY_KEY, LEVEL_KEY, PARAMETERS_KEY, STATISTICS_KEY};
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, day, hour, minute, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, day).unwrap()
    }

    #[test]
    fn first_run_initializes_everything_for_today() {
        let mut tracker = Tracker::open(Store::new(), at(3, 8, 0));
        assert!(tracker.take_dirty());
        assert_eq!(tracker.ledger().day, date(3));
        assert_eq!(tracker.ledger().cumulative_intake, 0);
        assert_eq!(tracker.statistics().install_date, date(3));
        assert_eq!(tracker.statistics().last_processed_day, date(3));
        assert_eq!(tracker.statistics().accumulated_debt, 0);
        for key in [PARAMETERS_KEY, LEVEL_KEY, DAY_KEY, STATISTICS_KEY] {
            assert!(tracker.store().get(key).is_some(), "{key} not persisted");
        }
    }

    #[test]
    fn reopening_the_same_day_keeps_the_ledger() {
        let mut tracker = Tracker::open(Store::new(), at(3, 8, 0));
        tracker.quick_add(ProfileId(2), at(3, 9, 0)).unwrap();
        let store = Store::from_entries(tracker.store().entries().clone());

        let mut reopened = Tracker::open(store, at(3, 18, 0));
        assert!(!reopened.take_dirty());
        assert_eq!(reopened.ledger().cumulative_intake, 250);
        assert_eq!(reopened.ledger().history.len(), 1);
    }

    #[test]
    fn reopening_next_day_folds_yesterday_into_debt() {
        let mut tracker = Tracker::open(Store::new(), at(3, 8, 0));
        tracker.add_intake(1200, None, at(3, 10, 0)).unwrap();
        let store = tracker.store().clone();

        let reopened = Tracker::open(store, at(4, 7, 0));
        assert_eq!(reopened.statistics().accumulated_debt, 800);
        assert_eq!(reopened.ledger().cumulative_intake, 0);
        assert!(reopened.ledger().history.is_empty());
        assert_eq!(reopened.ledger().day, date(4));
        assert_eq!(reopened.store().get(LEVEL_KEY), Some(&json!(0)));
    }

    #[test]
    fn three_day_gap_charges_skipped_days() {
        let mut tracker = Tracker::open(Store::new(), at(3, 8, 0));
        tracker.add_intake(500, None, at(3, 10, 0)).unwrap();
        let reopened = Tracker::open(tracker.store().clone(), at(6, 9, 0));
        assert_eq!(reopened.statistics().accumulated_debt, 5500);
        assert_eq!(reopened.statistics().daily.get("2026-08-03"), Some(&500));
    }

    #[test]
    fn mutations_after_midnight_land_on_the_new_day() {
        let mut tracker = Tracker::open(Store::new(), at(3, 22, 0));
        tracker.add_intake(2000, None, at(3, 23, 0)).unwrap();
        tracker.add_intake(300, None, at(4, 0, 5)).unwrap();
        assert_eq!(tracker.ledger().day, date(4));
        assert_eq!(tracker.ledger().cumulative_intake, 300);
        assert_eq!(tracker.statistics().accumulated_debt, 0);
        assert_eq!(tracker.statistics().current_streak, 1);
        assert_eq!(tracker.statistics().total_consumed, 2300);
    }

    #[test]
    fn level_handle_follows_mutations() {
        let mut tracker = Tracker::open(Store::new(), at(3, 8, 0));
        let level = tracker.level();
        tracker.quick_add(ProfileId(4), at(3, 9, 0)).unwrap();
        assert_eq!(
            level.reading(),
            LevelReading {
                cumulative: 800,
                goal: 2000
            }
        );
        tracker.undo_last(at(3, 9, 1));
        assert_eq!(level.reading().cumulative, 0);
        tracker.set_goal(Some("2500")).unwrap();
        assert_eq!(level.reading().goal, 2500);
    }

    #[test]
    fn quick_add_counts_use_and_orders_profiles() {
        let mut tracker = Tracker::open(Store::new(), at(3, 8, 0));
        tracker.quick_add(ProfileId(3), at(3, 9, 0)).unwrap();
        tracker.quick_add(ProfileId(3), at(3, 10, 0)).unwrap();
        tracker.quick_add(ProfileId(5), at(3, 11, 0)).unwrap();
        let order: Vec<u32> = tracker.profiles_by_use().iter().map(|p| p.id.0).collect();
        assert_eq!(order, vec![3, 5, 1, 2, 4]);

        assert_eq!(
            tracker.quick_add(ProfileId(99), at(3, 12, 0)).unwrap_err(),
            ValidationError::UnknownProfile
        );
    }

    #[test]
    fn invalid_input_leaves_state_untouched() {
        let mut tracker = Tracker::open(Store::new(), at(3, 8, 0));
        tracker.take_dirty();
        let before = tracker.parameters().clone();

        assert_eq!(tracker.set_goal(Some("abc")), Err(ValidationError::InvalidNumber));
        assert_eq!(tracker.set_goal(Some("0")), Err(ValidationError::InvalidNumber));
        assert_eq!(tracker.set_goal(None), Err(ValidationError::MissingFields));
        assert_eq!(
            tracker.add_custom(Some("-250"), at(3, 9, 0)).unwrap_err(),
            ValidationError::InvalidNumber
        );
        assert_eq!(
            tracker.add_profile(Some("  "), None, Some("200")).unwrap_err(),
            ValidationError::MissingFields
        );
        assert_eq!(
            tracker.add_reminder(Some("500"), Some("25:00")).unwrap_err(),
            ValidationError::InvalidTime
        );
        assert_eq!(
            tracker.add_reminder(Some("500"), Some("09:30")).unwrap_err(),
            ValidationError::DuplicateTime
        );
        assert_eq!(
            tracker.add_reminder(None, Some("10:00")).unwrap_err(),
            ValidationError::MissingFields
        );

        assert_eq!(tracker.parameters(), &before);
        assert_eq!(tracker.ledger().cumulative_intake, 0);
        assert!(!tracker.take_dirty());
    }

    #[test]
    fn reminders_are_inserted_sorted_with_smallest_free_id() {
        let mut tracker = Tracker::open(Store::new(), at(3, 8, 0));
        tracker.delete_reminder(ReminderId(2)).unwrap();
        let rule = tracker.add_reminder(Some("700"), Some("10:15")).unwrap();
        assert_eq!(rule.id, ReminderId(2));
        let deadlines: Vec<u16> = tracker
            .parameters()
            .reminders
            .iter()
            .map(|r| r.deadline_minutes_since_midnight)
            .collect();
        assert_eq!(deadlines, vec![570, 615, 930, 1080]);
        assert_eq!(
            tracker.delete_reminder(ReminderId(42)).unwrap_err(),
            ValidationError::UnknownReminder
        );
    }

    #[test]
    fn deleted_profile_falls_back_in_history() {
        let mut tracker = Tracker::open(Store::new(), at(3, 8, 0));
        tracker.quick_add(ProfileId(1), at(3, 9, 0)).unwrap();
        tracker.delete_profile(ProfileId(1)).unwrap();
        let today = tracker.today();
        assert_eq!(today.history[0].label, "Water");
        assert_eq!(today.history[0].icon, ProfileIcon::Generic.emoji());
        assert_eq!(today.history[0].time, "9h00");
        assert_eq!(today.percent, 5);

        let added = tracker
            .add_profile(Some("Flask"), Some(ProfileIcon::Bottle), Some("600"))
            .unwrap();
        assert_eq!(added.id, ProfileId(1));
    }

    #[test]
    fn percent_saturates_for_tiny_goal_and_huge_intake() {
        let mut tracker = Tracker::open(Store::new(), at(3, 8, 0));
        tracker.set_goal(Some("1")).unwrap();
        tracker.add_intake(u32::MAX, None, at(3, 9, 0)).unwrap();
        assert_eq!(tracker.today().percent, u32::MAX);

        tracker.set_goal(Some("3")).unwrap();
        tracker.undo_all(at(3, 9, 5));
        tracker.add_intake(2, None, at(3, 9, 10)).unwrap();
        assert_eq!(tracker.today().percent, 66);
    }

    #[test]
    fn reminder_evaluation_marks_and_resets_daily() {
        let mut tracker = Tracker::open(Store::new(), at(3, 8, 0));
        let mut evaluator = ReminderEvaluator::new(NotificationBoard::default());

        // 12:30, 0 ml: the 12:00 / 1000 ml rule is the latest missed.
        let outcome = tracker.evaluate_reminders(&mut evaluator, at(3, 12, 30));
        assert_eq!(
            outcome,
            ReminderOutcome::Issued {
                rule: ReminderId(2),
                replaced: false
            }
        );
        assert!(tracker.store().is_notified(ReminderId(2), date(3)));

        // Seen today already: a fresh evaluator stays quiet.
        let mut other = ReminderEvaluator::new(NotificationBoard::default());
        assert_eq!(
            tracker.evaluate_reminders(&mut other, at(3, 12, 45)),
            ReminderOutcome::AlreadyNotified(ReminderId(2))
        );

        // Next day: markers cleared and the old notification closed.
        let next = tracker.evaluate_reminders(&mut evaluator, at(4, 10, 0));
        assert_eq!(
            next,
            ReminderOutcome::Issued {
                rule: ReminderId(1),
                replaced: false
            }
        );
        assert!(!tracker.store().is_notified(ReminderId(2), date(3)));
        assert_eq!(evaluator.notifier_mut().take_closed().len(), 1);
    }

    #[test]
    fn parse_amount_accepts_only_positive_integers() {
        assert_eq!(parse_amount(Some(" 250 ")), Ok(250));
        assert_eq!(parse_amount(Some("2.5")), Err(ValidationError::InvalidNumber));
        assert_eq!(parse_amount(Some("-")), Err(ValidationError::InvalidNumber));
        assert_eq!(parse_amount(Some("99999999999")), Err(ValidationError::InvalidNumber));
        assert_eq!(parse_amount(Some("")), Err(ValidationError::MissingFields));
    }
}
