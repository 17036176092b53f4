//! Daily demand series and train/validation windows
//!
//! The series is anchored on a fixed calendar, not on the data: every day
//! between `start` and `end` gets exactly one point, and days without
//! deliveries are explicit zeros. Weekends are removed only when splitting,
//! so they never enter the model as zero-demand days.

use crate::models::DeliveryRecord;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Number of trailing days held out for validation.
pub const DEFAULT_VALIDATION_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub count: f64,
}

/// Weekday-only training and validation windows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainValidationSplit {
    pub cutoff: Option<NaiveDate>,
    pub train: Vec<DailyPoint>,
    pub validation: Vec<DailyPoint>,
}

impl TrainValidationSplit {
    pub fn is_empty(&self) -> bool {
        self.train.is_empty() && self.validation.is_empty()
    }
}

pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Every day from `start` to `end`, inclusive. Empty when `start > end`.
pub fn calendar(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .collect()
}

/// Count records per delivery date.
pub fn daily_counts(records: &[DeliveryRecord]) -> HashMap<NaiveDate, usize> {
    let mut counts = HashMap::new();
    for r in records {
        *counts.entry(r.delivery_date).or_insert(0) += 1;
    }
    counts
}

/// One point per calendar day, zero-filled where no record exists.
pub fn daily_series(records: &[DeliveryRecord], start: NaiveDate, end: NaiveDate) -> Vec<DailyPoint> {
    let counts = daily_counts(records);
    calendar(start, end)
        .into_iter()
        .map(|date| DailyPoint {
            date,
            count: counts.get(&date).copied().unwrap_or(0) as f64,
        })
        .collect()
}

/// Hold out the last `validation_days` and drop weekends from both sides.
pub fn split_series(series: &[DailyPoint], validation_days: i64) -> TrainValidationSplit {
    let Some(max_date) = series.iter().map(|p| p.date).max() else {
        return TrainValidationSplit::default();
    };
    let cutoff = max_date - Duration::days(validation_days);

    let (train, validation): (Vec<DailyPoint>, Vec<DailyPoint>) = series
        .iter()
        .copied()
        .filter(|p| is_weekday(p.date))
        .partition(|p| p.date <= cutoff);

    TrainValidationSplit {
        cutoff: Some(cutoff),
        train,
        validation,
    }
}

/// Build the calendar-anchored series for a cohort and split it.
pub fn prepare_forecast_data(
    records: &[DeliveryRecord],
    start: NaiveDate,
    end: NaiveDate,
    validation_days: i64,
) -> TrainValidationSplit {
    let series = daily_series(records, start, end);
    let split = split_series(&series, validation_days);
    info!(
        "Prepared {} calendar days: {} training weekdays, {} validation weekdays",
        series.len(),
        split.train.len(),
        split.validation.len()
    );
    split
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn records_on(dates: &[NaiveDate]) -> Vec<DeliveryRecord> {
        dates.iter().map(|d| DeliveryRecord::on(*d)).collect()
    }

    #[test]
    fn test_series_has_one_point_per_day_with_zero_fill() {
        let start = ymd(2024, 1, 1);
        let end = ymd(2024, 1, 31);
        let records = records_on(&[ymd(2024, 1, 3), ymd(2024, 1, 3), ymd(2024, 1, 10)]);

        let series = daily_series(&records, start, end);
        assert_eq!(series.len(), 31);
        assert!(series.windows(2).all(|w| w[1].date - w[0].date == Duration::days(1)));
        assert_eq!(series.first().unwrap().date, start);
        assert_eq!(series.last().unwrap().date, end);

        let on = |d: NaiveDate| series.iter().find(|p| p.date == d).unwrap().count;
        assert_eq!(on(ymd(2024, 1, 3)), 2.0);
        assert_eq!(on(ymd(2024, 1, 10)), 1.0);
        assert_eq!(on(ymd(2024, 1, 4)), 0.0);
        assert_eq!(series.iter().filter(|p| p.count == 0.0).count(), 29);
    }

    #[test]
    fn test_records_outside_calendar_are_ignored() {
        let records = records_on(&[ymd(2023, 12, 31), ymd(2024, 2, 1)]);
        let series = daily_series(&records, ymd(2024, 1, 1), ymd(2024, 1, 31));
        assert!(series.iter().all(|p| p.count == 0.0));
    }

    #[test]
    fn test_split_is_disjoint_and_weekday_only() {
        let start = ymd(2024, 1, 1);
        let end = ymd(2024, 6, 30);
        let days = calendar(start, end);
        let records = records_on(&days);

        let split = prepare_forecast_data(&records, start, end, DEFAULT_VALIDATION_DAYS);
        let cutoff = split.cutoff.unwrap();
        assert_eq!(cutoff, ymd(2024, 5, 31));

        assert!(split.train.iter().all(|p| is_weekday(p.date) && p.date <= cutoff));
        assert!(split.validation.iter().all(|p| is_weekday(p.date) && p.date > cutoff));

        let last_train = split.train.iter().map(|p| p.date).max().unwrap();
        let first_val = split.validation.iter().map(|p| p.date).min().unwrap();
        assert!(last_train < first_val);

        let weekdays = days.iter().filter(|d| is_weekday(**d)).count();
        assert_eq!(split.train.len() + split.validation.len(), weekdays);
    }

    #[test]
    fn test_weekends_are_dropped_not_zero_filled() {
        let start = ymd(2024, 1, 1);
        let end = ymd(2024, 3, 31);
        let split = prepare_forecast_data(&[], start, end, DEFAULT_VALIDATION_DAYS);
        assert!(split
            .train
            .iter()
            .chain(split.validation.iter())
            .all(|p| is_weekday(p.date)));
    }

    #[test]
    fn test_empty_range_gives_empty_split() {
        let split = prepare_forecast_data(&[], ymd(2024, 2, 1), ymd(2024, 1, 1), 30);
        assert!(split.is_empty());
        assert!(split.cutoff.is_none());
    }

    #[test]
    fn test_weekend_only_range_gives_empty_split() {
        // 2024-01-06 is a Saturday
        let split = prepare_forecast_data(&[], ymd(2024, 1, 6), ymd(2024, 1, 7), 30);
        assert!(split.is_empty());
    }
}
