//! Descriptive statistics for the overview charts

use crate::models::DeliveryRecord;
use crate::segment::classify_time_of_day;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Label used for records without a value in a grouped column.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliverySummary {
    pub total_records: usize,
    pub first_date: Option<chrono::NaiveDate>,
    pub last_date: Option<chrono::NaiveDate>,
    /// Keyed by `YYYY-MM`.
    pub by_month: BTreeMap<String, usize>,
    pub by_order_type: BTreeMap<String, usize>,
    pub by_hub: BTreeMap<String, usize>,
    pub by_container_type: BTreeMap<String, usize>,
    pub by_time_of_day: BTreeMap<String, usize>,
    pub containers_delivered: f64,
    pub containers_picked_up: f64,
}

fn bump(map: &mut BTreeMap<String, usize>, key: Option<&str>) {
    let key = key.filter(|k| !k.is_empty()).unwrap_or(UNKNOWN);
    *map.entry(key.to_string()).or_insert(0) += 1;
}

impl DeliverySummary {
    pub fn from_records(records: &[DeliveryRecord]) -> Self {
        let mut summary = DeliverySummary {
            total_records: records.len(),
            ..Default::default()
        };

        for r in records {
            let month = r.delivery_date.format("%Y-%m").to_string();
            *summary.by_month.entry(month).or_insert(0) += 1;
            bump(&mut summary.by_order_type, r.order_type.as_deref());
            bump(&mut summary.by_hub, r.hub_location.as_deref());
            bump(&mut summary.by_container_type, r.container_type.as_deref());
            *summary
                .by_time_of_day
                .entry(classify_time_of_day(r).to_string())
                .or_insert(0) += 1;

            summary.containers_delivered += r.containers_delivered.unwrap_or(0.0);
            summary.containers_picked_up += r.containers_picked_up.unwrap_or(0.0);
        }

        summary.first_date = records.iter().map(|r| r.delivery_date).min();
        summary.last_date = records.iter().map(|r| r.delivery_date).max();

        info!(
            "Summarised {} records over {} months",
            summary.total_records,
            summary.by_month.len()
        );
        summary
    }

    /// The `n` busiest keys of a grouping, largest first.
    pub fn top(map: &BTreeMap<String, usize>, n: usize) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize)> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        entries.truncate(n);
        entries
    }
}
