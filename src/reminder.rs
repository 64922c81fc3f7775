//! Reminder rules: "drink X ml before HH:MM".
//!
//! Only the most recently missed milestone is ever shown, and at most one
//! reminder notification is active at a time.

use crate::clock;
use crate::models::{ReminderId, ReminderRule};
use serde::Serialize;
use tracing::{debug, info};

/// Latest rule whose deadline has passed while its amount is still unmet.
pub fn select_due(
    rules: &[ReminderRule],
    now_minutes: u16,
    cumulative: u32,
) -> Option<&ReminderRule> {
    rules
        .iter()
        .filter(|rule| rule.deadline_minutes_since_midnight < now_minutes)
        .filter(|rule| cumulative < rule.threshold_amount)
        .max_by_key(|rule| rule.deadline_minutes_since_midnight)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Reminder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub category: NotificationCategory,
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl Notification {
    pub fn for_rule(rule: &ReminderRule, cumulative: u32) -> Self {
        let missing = rule.threshold_amount.saturating_sub(cumulative);
        Self {
            category: NotificationCategory::Reminder,
            title: "Time for some water".to_string(),
            body: format!(
                "{} ml were due by {}; {} ml to go.",
                rule.threshold_amount,
                clock::format_minutes(rule.deadline_minutes_since_midnight),
                missing
            ),
            icon: "💧".to_string(),
        }
    }
}

/// Display side of notifications.
pub trait Notifier {
    type Handle: Clone + PartialEq + std::fmt::Debug;

    /// Shows `notification`; `None` when notifications are unavailable or
    /// not permitted.
    fn show(&mut self, notification: Notification) -> Option<Self::Handle>;

    fn close(&mut self, handle: &Self::Handle);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOutcome {
    /// Nothing due and nothing showing.
    Nothing,
    /// The previous notification no longer applies and was closed.
    Dismissed,
    /// The due rule is already the one on screen.
    AlreadyActive(ReminderId),
    /// The due rule was already shown earlier today.
    AlreadyNotified(ReminderId),
    Issued { rule: ReminderId, replaced: bool },
    /// A notification was due but could not be shown.
    Unavailable(ReminderId),
}

#[derive(Debug, Clone)]
struct Active<H> {
    rule: ReminderId,
    handle: H,
}

#[derive(Debug)]
pub struct ReminderEvaluator<N: Notifier> {
    notifier: N,
    active: Option<Active<N::Handle>>,
}

impl<N: Notifier> ReminderEvaluator<N> {
    pub fn new(notifier: N) -> Self {
        Self {
            notifier,
            active: None,
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn active_rule(&self) -> Option<ReminderId> {
        self.active.as_ref().map(|active| active.rule)
    }

    /// Re-checks the rules against the current intake. `already_notified`
    /// reports rules shown earlier the same day.
    pub fn evaluate(
        &mut self,
        rules: &[ReminderRule],
        now_minutes: u16,
        cumulative: u32,
        already_notified: impl Fn(ReminderId) -> bool,
    ) -> ReminderOutcome {
        let Some(rule) = select_due(rules, now_minutes, cumulative) else {
            return match self.active.take() {
                Some(active) => {
                    self.notifier.close(&active.handle);
                    debug!(rule = %active.rule, "reminder no longer due, dismissed");
                    ReminderOutcome::Dismissed
                }
                None => ReminderOutcome::Nothing,
            };
        };

        if self.active_rule() == Some(rule.id) {
            return ReminderOutcome::AlreadyActive(rule.id);
        }
        if already_notified(rule.id) {
            return ReminderOutcome::AlreadyNotified(rule.id);
        }

        let replaced = match self.active.take() {
            Some(previous) => {
                self.notifier.close(&previous.handle);
                true
            }
            None => false,
        };

        match self.notifier.show(Notification::for_rule(rule, cumulative)) {
            Some(handle) => {
                info!(rule = %rule.id, replaced, "reminder issued");
                self.active = Some(Active {
                    rule: rule.id,
                    handle,
                });
                ReminderOutcome::Issued {
                    rule: rule.id,
                    replaced,
                }
            }
            None => ReminderOutcome::Unavailable(rule.id),
        }
    }

    /// Closes whatever is showing, e.g. after a day reset.
    pub fn dismiss(&mut self) {
        if let Some(active) = self.active.take() {
            self.notifier.close(&active.handle);
        }
    }
}

/// Notifier for a page that polls for its notification: keeps the one
/// current notification plus the ids closed since the last poll.
#[derive(Debug, Clone, Default)]
pub struct NotificationBoard {
    current: Option<(u64, Notification)>,
    closed: Vec<u64>,
    next_id: u64,
    issued: u64,
}

impl NotificationBoard {
    pub fn current(&self) -> Option<(u64, &Notification)> {
        self.current.as_ref().map(|(id, n)| (*id, n))
    }

    /// Ids closed since the previous call.
    pub fn take_closed(&mut self) -> Vec<u64> {
        std::mem::take(&mut self.closed)
    }

    /// Total notifications ever shown.
    pub fn issued(&self) -> u64 {
        self.issued
    }
}

impl Notifier for NotificationBoard {
    type Handle = u64;

    fn show(&mut self, notification: Notification) -> Option<u64> {
        self.next_id += 1;
        self.issued += 1;
        self.current = Some((self.next_id, notification));
        Some(self.next_id)
    }

    fn close(&mut self, handle: &u64) {
        if self.current.as_ref().is_some_and(|(id, _)| id == handle) {
            self.current = None;
        }
        self.closed.push(*handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: u32, amount: u32, hours: u16) -> ReminderRule {
        ReminderRule {
            id: ReminderId(id),
            threshold_amount: amount,
            deadline_minutes_since_midnight: hours * 60,
        }
    }

    fn rules() -> Vec<ReminderRule> {
        vec![rule(1, 500, 9), rule(2, 1200, 12)]
    }

    #[test]
    fn selects_latest_missed_milestone() {
        let rules = rules();
        let due = select_due(&rules, 13 * 60, 800).unwrap();
        assert_eq!(due.id, ReminderId(2));
    }

    #[test]
    fn met_or_future_rules_are_skipped() {
        let rules = rules();
        assert_eq!(select_due(&rules, 13 * 60, 1200), None);
        assert_eq!(select_due(&rules, 8 * 60, 0), None);
        // Deadline must have strictly passed.
        assert_eq!(select_due(&rules, 9 * 60, 0), None);
        assert_eq!(select_due(&rules, 10 * 60, 0).unwrap().id, ReminderId(1));
        assert_eq!(select_due(&[], 10 * 60, 0), None);
    }

    #[test]
    fn issues_one_notification_and_replaces_the_previous() {
        let rules = rules();
        let mut evaluator = ReminderEvaluator::new(NotificationBoard::default());

        let first = evaluator.evaluate(&rules, 10 * 60, 300, |_| false);
        assert_eq!(
            first,
            ReminderOutcome::Issued {
                rule: ReminderId(1),
                replaced: false
            }
        );
        let (first_id, _) = evaluator.notifier().current().unwrap();

        let second = evaluator.evaluate(&rules, 13 * 60, 800, |_| false);
        assert_eq!(
            second,
            ReminderOutcome::Issued {
                rule: ReminderId(2),
                replaced: true
            }
        );
        assert_eq!(evaluator.notifier_mut().take_closed(), vec![first_id]);
        let (_, shown) = evaluator.notifier().current().unwrap();
        assert!(shown.body.starts_with("1200 ml were due by 12h00"));
        assert_eq!(evaluator.notifier().issued(), 2);
    }

    #[test]
    fn same_rule_is_not_reissued() {
        let rules = rules();
        let mut evaluator = ReminderEvaluator::new(NotificationBoard::default());
        evaluator.evaluate(&rules, 13 * 60, 800, |_| false);
        assert_eq!(
            evaluator.evaluate(&rules, 13 * 60 + 5, 800, |_| false),
            ReminderOutcome::AlreadyActive(ReminderId(2))
        );
        assert_eq!(evaluator.notifier().issued(), 1);
    }

    #[test]
    fn already_notified_rules_stay_quiet() {
        let rules = rules();
        let mut evaluator = ReminderEvaluator::new(NotificationBoard::default());
        let outcome = evaluator.evaluate(&rules, 13 * 60, 800, |id| id == ReminderId(2));
        assert_eq!(outcome, ReminderOutcome::AlreadyNotified(ReminderId(2)));
        assert!(evaluator.notifier().current().is_none());
    }

    #[test]
    fn catching_up_dismisses_the_active_reminder() {
        let rules = rules();
        let mut evaluator = ReminderEvaluator::new(NotificationBoard::default());
        evaluator.evaluate(&rules, 13 * 60, 800, |_| false);
        assert_eq!(
            evaluator.evaluate(&rules, 13 * 60, 1300, |_| false),
            ReminderOutcome::Dismissed
        );
        assert!(evaluator.notifier().current().is_none());
        assert_eq!(evaluator.active_rule(), None);
    }

    struct Denied;

    impl Notifier for Denied {
        type Handle = ();

        fn show(&mut self, _: Notification) -> Option<()> {
            None
        }

        fn close(&mut self, _: &()) {}
    }

    #[test]
    fn denied_permission_degrades_silently() {
        let rules = rules();
        let mut evaluator = ReminderEvaluator::new(Denied);
        assert_eq!(
            evaluator.evaluate(&rules, 13 * 60, 0, |_| false),
            ReminderOutcome::Unavailable(ReminderId(2))
        );
        assert_eq!(evaluator.active_rule(), None);
    }
}
