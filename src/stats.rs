use crate::clock::{self, day_key};
use crate::models::{
    DailyPoint, Ledger, Statistics, StatsResponse, WeeklyAveragePoint, WeeklyPoint,
};
use chrono::{Datelike, Duration, NaiveDate};

pub fn build_stats_at(
    today: NaiveDate,
    stats: &Statistics,
    ledger: &Ledger,
    goal: u32,
) -> StatsResponse {
    const WEEK_COUNT: usize = 8;

    let consumed_on = |date: NaiveDate| -> u32 {
        if date == ledger.day {
            ledger.cumulative_intake
        } else {
            stats.daily.get(&day_key(date)).copied().unwrap_or_default()
        }
    };

    let mut last_7_days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = today - Duration::days(offset as i64);
        let consumed = consumed_on(date);
        last_7_days.push(DailyPoint {
            date: date.to_string(),
            consumed,
            goal_met: consumed >= goal,
        });
    }

    let current_week_start = week_start(today);
    let mut weekly_totals = Vec::with_capacity(WEEK_COUNT);
    let mut weekly_averages = Vec::with_capacity(WEEK_COUNT);

    for offset in (0..WEEK_COUNT).rev() {
        let start = current_week_start - Duration::weeks(offset as i64);
        let end = start + Duration::days(6);

        let mut sum = 0u64;
        for day_offset in 0..7 {
            sum = sum.saturating_add(u64::from(consumed_on(start + Duration::days(day_offset))));
        }

        let days_counted = if today < start {
            0
        } else if today > end {
            7
        } else {
            (today - start).num_days() as u8 + 1
        };

        let denom = if days_counted == 0 {
            1.0
        } else {
            f64::from(days_counted)
        };

        weekly_totals.push(WeeklyPoint {
            week: week_label(start),
            start_date: start.to_string(),
            end_date: end.to_string(),
            consumed: sum,
        });

        weekly_averages.push(WeeklyAveragePoint {
            week: week_label(start),
            days_counted,
            avg_consumed: sum as f64 / denom,
        });
    }

    StatsResponse {
        total_consumed: stats.total_consumed,
        accumulated_debt: stats.accumulated_debt,
        install_date: stats.install_date.to_string(),
        days_since_install: clock::days_between(stats.install_date, today).max(0),
        current_streak: stats.current_streak,
        best_streak: stats.best_streak,
        last_7_days,
        weekly_totals,
        weekly_averages,
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_7_days_mixes_archive_and_live_ledger() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let two_days_ago = today - Duration::days(2);
        let mut stats = Statistics::fresh(today - Duration::days(30));
        stats.daily.insert(day_key(two_days_ago), 2200);
        let mut ledger = Ledger::empty(today);
        ledger.cumulative_intake = 600;

        let summary = build_stats_at(today, &stats, &ledger, 2000);
        assert_eq!(summary.last_7_days.len(), 7);

        let point = summary
            .last_7_days
            .iter()
            .find(|day| day.date == two_days_ago.to_string())
            .expect("missing day");
        assert_eq!(point.consumed, 2200);
        assert!(point.goal_met);

        let last = summary.last_7_days.last().unwrap();
        assert_eq!(last.date, today.to_string());
        assert_eq!(last.consumed, 600);
        assert!(!last.goal_met);
        assert_eq!(summary.days_since_install, 30);
    }

    #[test]
    fn weekly_series_lengths_and_current_week_average() {
        // 2026-01-07 is a Wednesday: three days of the current week counted.
        let today = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        let stats = Statistics::fresh(today);
        let mut ledger = Ledger::empty(today);
        ledger.cumulative_intake = 1500;

        let summary = build_stats_at(today, &stats, &ledger, 2000);
        assert_eq!(summary.weekly_totals.len(), 8);
        assert_eq!(summary.weekly_averages.len(), 8);

        let current = summary.weekly_averages.last().unwrap();
        assert_eq!(current.days_counted, 3);
        assert_eq!(current.avg_consumed, 500.0);
        assert_eq!(summary.weekly_totals.last().unwrap().week, "2026-W02");
    }
}
