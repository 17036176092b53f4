//! Record filtering and morning/afternoon segmentation

use crate::models::{DeliveryRecord, TimeOfDay};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Latest delivery time assumed when the export leaves it blank.
pub const DEFAULT_LATEST_DELIVERY_TIME: &str = "14:00";

/// Hour (exclusive) separating morning from afternoon deliveries.
pub const MORNING_CUTOFF_HOUR: u32 = 12;

/// Order types the dashboard forecasts on.
pub const DEFAULT_ORDER_TYPES: [&str; 3] = ["S", "W", "T"];

/// Keep records of `year` (if given) whose order type is in `order_types` (if given).
pub fn filter(
    records: &[DeliveryRecord],
    year: Option<i32>,
    order_types: Option<&[&str]>,
) -> Vec<DeliveryRecord> {
    records
        .iter()
        .filter(|r| year.map_or(true, |y| r.delivery_date.year() == y))
        .filter(|r| {
            order_types.map_or(true, |types| {
                r.order_type
                    .as_deref()
                    .map_or(false, |t| types.contains(&t))
            })
        })
        .cloned()
        .collect()
}

/// Morning iff the hour of the latest delivery time is before noon.
pub fn classify_time_of_day(record: &DeliveryRecord) -> TimeOfDay {
    let raw = record
        .latest_delivery_time
        .as_deref()
        .unwrap_or(DEFAULT_LATEST_DELIVERY_TIME);
    classify_delivery_time(raw)
}

/// Classify a raw `HH:MM[:SS]` string. An unreadable hour counts as afternoon.
pub fn classify_delivery_time(raw: &str) -> TimeOfDay {
    let hour = raw.split(':').next().unwrap_or("").trim();
    match hour.parse::<u32>() {
        Ok(h) if h < MORNING_CUTOFF_HOUR => TimeOfDay::Morning,
        _ => TimeOfDay::Afternoon,
    }
}

/// Partition into (morning, afternoon) cohorts.
pub fn split_by_time_of_day(
    records: &[DeliveryRecord],
) -> (Vec<DeliveryRecord>, Vec<DeliveryRecord>) {
    records
        .iter()
        .cloned()
        .partition(|r| classify_time_of_day(r) == TimeOfDay::Morning)
}

/// Drop-down choice: everything, or a single value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// Parse a query value; missing, empty or "All" select everything.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Selection::All,
            Some(v) if v.eq_ignore_ascii_case("all") => Selection::All,
            Some(v) => Selection::Only(v.to_string()),
        }
    }

    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => value == Some(wanted.as_str()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Selection::All => "All",
            Selection::Only(v) => v,
        }
    }
}

/// Apply the container-type and hub drop-downs.
pub fn select(
    records: &[DeliveryRecord],
    container: &Selection,
    hub: &Selection,
) -> Vec<DeliveryRecord> {
    records
        .iter()
        .filter(|r| container.matches(r.container_type.as_deref()))
        .filter(|r| hub.matches(r.hub_location.as_deref()))
        .cloned()
        .collect()
}

/// Drop-down contents for a cohort, "All" first, then values in first-seen order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FilterOptions {
    pub container_types: Vec<String>,
    pub hub_locations: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[DeliveryRecord]) -> Self {
        Self {
            container_types: distinct_with_all(records.iter().map(|r| r.container_type.as_deref())),
            hub_locations: distinct_with_all(records.iter().map(|r| r.hub_location.as_deref())),
        }
    }
}

fn distinct_with_all<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut out = vec!["All".to_string()];
    for v in values.flatten() {
        if !out[1..].iter().any(|seen| seen == v) {
            out.push(v.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(date: (i32, u32, u32), order: &str, latest: Option<&str>) -> DeliveryRecord {
        let mut r = DeliveryRecord::on(NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap());
        r.order_type = Some(order.to_string());
        r.latest_delivery_time = latest.map(str::to_string);
        r
    }

    #[test]
    fn test_classify_threshold_is_strict() {
        assert_eq!(classify_delivery_time("11:59"), TimeOfDay::Morning);
        assert_eq!(classify_delivery_time("00:00"), TimeOfDay::Morning);
        assert_eq!(classify_delivery_time("7:30:00"), TimeOfDay::Morning);
        assert_eq!(classify_delivery_time("12:00"), TimeOfDay::Afternoon);
        assert_eq!(classify_delivery_time("16:45"), TimeOfDay::Afternoon);
    }

    #[test]
    fn test_missing_time_defaults_to_afternoon() {
        let r = record((2024, 1, 2), "S", None);
        assert_eq!(classify_time_of_day(&r), TimeOfDay::Afternoon);
    }

    #[test]
    fn test_unreadable_hour_is_afternoon() {
        assert_eq!(classify_delivery_time("morning"), TimeOfDay::Afternoon);
        assert_eq!(classify_delivery_time(""), TimeOfDay::Afternoon);
    }

    #[test]
    fn test_classify_matches_hour_for_every_hour() {
        for h in 0..24u32 {
            let expected = if h < 12 { TimeOfDay::Morning } else { TimeOfDay::Afternoon };
            assert_eq!(classify_delivery_time(&format!("{:02}:15", h)), expected, "hour {}", h);
        }
    }

    #[test]
    fn test_filter_without_arguments_keeps_everything() {
        let records = vec![
            record((2023, 5, 1), "S", None),
            record((2024, 5, 1), "X", None),
        ];
        assert_eq!(filter(&records, None, None).len(), 2);
    }

    #[test]
    fn test_filter_by_year_and_order_type() {
        let records = vec![
            record((2023, 5, 1), "S", None),
            record((2024, 5, 1), "S", None),
            record((2024, 5, 2), "X", None),
            record((2024, 5, 3), "T", None),
        ];
        let filtered = filter(&records, Some(2024), Some(&DEFAULT_ORDER_TYPES));
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| r.delivery_date.year() == 2024));
        assert!(filtered.iter().all(|r| r.order_type.as_deref() != Some("X")));
    }

    #[test]
    fn test_split_partitions_all_records() {
        let records = vec![
            record((2024, 1, 2), "S", Some("09:00")),
            record((2024, 1, 2), "S", Some("13:00")),
            record((2024, 1, 2), "S", None),
            record((2024, 1, 3), "S", Some("11:30")),
        ];
        let (morning, afternoon) = split_by_time_of_day(&records);
        assert_eq!(morning.len(), 2);
        assert_eq!(afternoon.len(), 2);
    }

    #[test]
    fn test_select_and_options() {
        let mut a = record((2024, 1, 2), "S", Some("09:00"));
        a.container_type = Some("ABR10".into());
        a.hub_location = Some("Nord".into());
        let mut b = record((2024, 1, 2), "S", Some("09:00"));
        b.container_type = Some("MUL7".into());
        b.hub_location = Some("Nord".into());
        let mut c = record((2024, 1, 3), "S", Some("09:00"));
        c.container_type = Some("ABR10".into());
        c.hub_location = Some("Sued".into());
        let records = vec![a, b, c];

        let options = FilterOptions::from_records(&records);
        assert_eq!(options.container_types, vec!["All", "ABR10", "MUL7"]);
        assert_eq!(options.hub_locations, vec!["All", "Nord", "Sued"]);

        let picked = select(&records, &Selection::Only("ABR10".into()), &Selection::All);
        assert_eq!(picked.len(), 2);
        let picked = select(
            &records,
            &Selection::Only("ABR10".into()),
            &Selection::Only("Sued".into()),
        );
        assert_eq!(picked.len(), 1);
    }

    #[test]
    fn test_selection_parse() {
        assert_eq!(Selection::parse(None), Selection::All);
        assert_eq!(Selection::parse(Some("ALL")), Selection::All);
        assert_eq!(Selection::parse(Some(" ")), Selection::All);
        assert_eq!(Selection::parse(Some("ABR10")), Selection::Only("ABR10".into()));
    }
}
