//! Dashboard report assembly
//!
//! Runs the whole pipeline for one container/hub selection and packages the
//! result for a front end: chart series, forecast band, accuracy metrics and
//! the next-day breakdown. Nothing here fails; a selection that cannot be
//! forecast still yields a report with a "cannot forecast" headline.

use crate::attribution::{self, DemandBreakdown};
use crate::config::PipelineConfig;
use crate::forecast::{AccuracyReport, ForecastError, ForecastFrame, Forecaster};
use crate::holidays::holiday_schedule;
use crate::models::{DeliveryRecord, TimeOfDay};
use crate::prepare::{prepare_forecast_data, DailyPoint, TrainValidationSplit};
use crate::segment::{self, Selection};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Placeholder for metrics that cannot be computed.
pub const NOT_AVAILABLE: &str = "N/A";

/// Chart title for a drop-down selection.
pub fn chart_title(container: &Selection, hub: &Selection) -> String {
    match (container, hub) {
        (Selection::All, Selection::All) => "Forecast for All Container Types and Hubs".to_string(),
        (Selection::All, Selection::Only(h)) => format!("Forecast for All Container Types at {}", h),
        (Selection::Only(c), Selection::All) => format!("Forecast for {} at All Hubs", c),
        (Selection::Only(c), Selection::Only(h)) => format!("Forecast for {} at {}", c, h),
    }
}

/// One forecast point as plotted: clipped values plus the raw prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub raw_yhat: f64,
}

/// Metric tiles, pre-formatted, with the underlying report when there is one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyView {
    pub mape: String,
    pub rmse: String,
    pub details: Option<AccuracyReport>,
}

impl AccuracyView {
    pub fn from_report(report: Option<AccuracyReport>) -> Self {
        match report {
            Some(r) => Self {
                mape: r
                    .mape
                    .percent()
                    .map(|p| format!("{:.2}%", p))
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                rmse: format!("{:.2}", r.rmse),
                details: Some(r),
            },
            None => Self::unavailable(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            mape: NOT_AVAILABLE.to_string(),
            rmse: NOT_AVAILABLE.to_string(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Headline {
    Forecast {
        date: NaiveDate,
        containers: i64,
        trucks: u64,
    },
    Unavailable {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub title: String,
    pub container: String,
    pub hub: String,
    pub cohort: TimeOfDay,
    pub cohort_records: usize,
    pub selected_records: usize,
    pub cutoff: Option<NaiveDate>,
    pub train: Vec<DailyPoint>,
    pub validation: Vec<DailyPoint>,
    pub forecast: Vec<ForecastPoint>,
    pub accuracy: AccuracyView,
    pub headline: Headline,
    pub breakdown: Option<DemandBreakdown>,
    pub narrative: String,
}

impl DashboardReport {
    pub fn is_forecast_available(&self) -> bool {
        matches!(self.headline, Headline::Forecast { .. })
    }
}

/// Records of the configured order types and cohort.
pub fn cohort_records(records: &[DeliveryRecord], config: &PipelineConfig) -> Vec<DeliveryRecord> {
    let order_types = config.order_type_refs();
    let filtered = segment::filter(records, None, Some(&order_types));
    let (morning, afternoon) = segment::split_by_time_of_day(&filtered);
    info!(
        "{} records of order types {:?}: {} morning, {} afternoon",
        filtered.len(),
        config.order_types,
        morning.len(),
        afternoon.len()
    );
    match config.cohort {
        TimeOfDay::Morning => morning,
        TimeOfDay::Afternoon => afternoon,
    }
}

/// Date the headline is about: first forecast day after the validation window.
pub fn target_date(split: &TrainValidationSplit, frame: &ForecastFrame) -> Option<NaiveDate> {
    let anchor = split
        .validation
        .iter()
        .chain(split.train.iter())
        .map(|p| p.date)
        .max()?;
    frame.first_after(anchor).map(|r| r.date)
}

/// Build the full report for one selection over the shared record table.
pub fn build_report(
    records: &[DeliveryRecord],
    config: &PipelineConfig,
    container: &Selection,
    hub: &Selection,
) -> DashboardReport {
    let cohort = cohort_records(records, config);
    build_cohort_report(&cohort, config, container, hub)
}

/// Same as [`build_report`] for records already reduced to the cohort.
pub fn build_cohort_report(
    cohort: &[DeliveryRecord],
    config: &PipelineConfig,
    container: &Selection,
    hub: &Selection,
) -> DashboardReport {
    let selected = segment::select(cohort, container, hub);
    let split = prepare_forecast_data(
        &selected,
        config.calendar_start,
        config.calendar_end,
        config.validation_days,
    );

    let mut report = DashboardReport {
        title: chart_title(container, hub),
        container: container.label().to_string(),
        hub: hub.label().to_string(),
        cohort: config.cohort,
        cohort_records: cohort.len(),
        selected_records: selected.len(),
        cutoff: split.cutoff,
        train: split.train.clone(),
        validation: split.validation.clone(),
        forecast: Vec::new(),
        accuracy: AccuracyView::unavailable(),
        headline: Headline::Unavailable {
            reason: String::new(),
        },
        breakdown: None,
        narrative: attribution::generic_narrative(config.containers_per_truck),
    };

    let mut forecaster: Forecaster =
        Forecaster::new(config.model.clone(), holiday_schedule(config.holiday_years.iter().copied()));

    let frame = match forecaster
        .fit(&split.train)
        .and_then(|_| forecaster.forecast(config.horizon_days).cloned())
    {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Cannot forecast {}: {}", report.title, e);
            report.headline = Headline::Unavailable {
                reason: unavailable_reason(&e),
            };
            return report;
        }
    };

    report.forecast = frame
        .rows
        .iter()
        .map(|r| ForecastPoint {
            date: r.date,
            yhat: r.display_yhat(),
            yhat_lower: r.display_lower(),
            yhat_upper: r.display_upper(),
            raw_yhat: r.yhat,
        })
        .collect();
    report.accuracy = AccuracyView::from_report(forecaster.accuracy(&split.validation));

    let Some(row) = target_date(&split, &frame).and_then(|d| frame.row(d)) else {
        warn!("Forecast horizon ends before the next business day");
        report.headline = Headline::Unavailable {
            reason: "Forecast horizon does not reach the next business day".to_string(),
        };
        return report;
    };

    let breakdown = attribution::attribute(row, config.containers_per_truck);
    info!(
        "{}: {} containers, {} trucks on {}",
        report.title, breakdown.total_containers, breakdown.trucks, breakdown.date
    );
    report.headline = Headline::Forecast {
        date: breakdown.date,
        containers: breakdown.total_containers,
        trucks: breakdown.trucks,
    };
    report.narrative = attribution::narrative(&breakdown);
    report.breakdown = Some(breakdown);
    report
}

fn unavailable_reason(e: &ForecastError) -> String {
    match e {
        ForecastError::InsufficientData { .. } => {
            format!("Not enough history for this selection. {}", e)
        }
        _ => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare::calendar;
    use chrono::{Datelike, Weekday};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn morning(date: NaiveDate, container: &str, hub: &str) -> DeliveryRecord {
        let mut r = DeliveryRecord::on(date);
        r.order_type = Some("S".into());
        r.latest_delivery_time = Some("10:00".into());
        r.container_type = Some(container.into());
        r.hub_location = Some(hub.into());
        r
    }

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            calendar_start: ymd(2024, 1, 1),
            calendar_end: ymd(2024, 6, 30),
            holiday_years: vec![2024],
            ..PipelineConfig::default()
        }
    }

    fn steady_table() -> Vec<DeliveryRecord> {
        let mut out = Vec::new();
        for day in calendar(ymd(2024, 1, 1), ymd(2024, 6, 30)) {
            if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }
            for _ in 0..5 {
                out.push(morning(day, "ABR10", "Nord"));
            }
            // afternoon and wrong order type are filtered away
            let mut late = morning(day, "ABR10", "Nord");
            late.latest_delivery_time = Some("15:00".into());
            out.push(late);
            let mut other = morning(day, "ABR10", "Nord");
            other.order_type = Some("X".into());
            out.push(other);
        }
        out
    }

    #[test]
    fn test_chart_titles() {
        let all = Selection::All;
        let c = Selection::Only("ABR10".into());
        let h = Selection::Only("Nord".into());
        assert_eq!(chart_title(&all, &all), "Forecast for All Container Types and Hubs");
        assert_eq!(chart_title(&all, &h), "Forecast for All Container Types at Nord");
        assert_eq!(chart_title(&c, &all), "Forecast for ABR10 at All Hubs");
        assert_eq!(chart_title(&c, &h), "Forecast for ABR10 at Nord");
    }

    #[test]
    fn test_accuracy_view_formats() {
        assert_eq!(AccuracyView::unavailable().mape, "N/A");
        assert_eq!(AccuracyView::from_report(None).rmse, "N/A");
    }

    #[test]
    fn test_report_for_steady_demand() {
        let config = small_config();
        let report = build_report(&steady_table(), &config, &Selection::All, &Selection::All);

        assert!(report.is_forecast_available());
        assert_eq!(report.title, "Forecast for All Container Types and Hubs");
        assert!(report.train.iter().all(|p| p.count == 5.0));
        assert!(report.forecast.iter().all(|p| p.yhat >= 0.0 && p.yhat_lower >= 0.0));

        let breakdown = report.breakdown.as_ref().unwrap();
        // 2024-06-28 is the last weekday in the calendar; Saturday follows
        assert_eq!(breakdown.date, ymd(2024, 6, 29));
        assert_eq!(breakdown.displayed_sum(), breakdown.total_containers);
        assert_eq!(
            breakdown.trucks,
            attribution::trucks_needed(breakdown.total_containers, 4)
        );
        assert!(report.narrative.starts_with("For **2024-06-29**"));
        assert_ne!(report.accuracy.rmse, "N/A");
    }

    #[test]
    fn test_empty_selection_forecasts_zero_demand() {
        let config = small_config();
        let report = build_report(
            &steady_table(),
            &config,
            &Selection::Only("NOPE".into()),
            &Selection::All,
        );
        // an all-zero history still fits and predicts nothing
        assert_eq!(report.selected_records, 0);
        assert!(report.train.iter().all(|p| p.count == 0.0));
        match report.headline {
            Headline::Forecast { containers, trucks, .. } => {
                assert_eq!(containers, 0);
                assert_eq!(trucks, 0);
            }
            other => panic!("unexpected headline {:?}", other),
        }
    }

    #[test]
    fn test_empty_calendar_reports_unavailable() {
        let config = PipelineConfig {
            calendar_start: ymd(2024, 2, 1),
            calendar_end: ymd(2024, 1, 1),
            ..small_config()
        };
        let report = build_report(&steady_table(), &config, &Selection::All, &Selection::All);
        assert!(!report.is_forecast_available());
        assert!(report.breakdown.is_none());
        assert!(report.narrative.contains("Which day of the week"));
        assert_eq!(report.accuracy.mape, "N/A");
        match report.headline {
            Headline::Unavailable { reason } => assert!(reason.contains("Not enough history")),
            other => panic!("unexpected headline {:?}", other),
        }
    }

    #[test]
    fn test_cohort_keeps_configured_time_of_day() {
        let table = steady_table();
        let config = small_config();
        let morning = cohort_records(&table, &config);
        assert!(morning.iter().all(|r| r.latest_delivery_time.as_deref() == Some("10:00")));
        assert!(morning.iter().all(|r| r.order_type.as_deref() == Some("S")));

        let afternoon = cohort_records(
            &table,
            &PipelineConfig {
                cohort: TimeOfDay::Afternoon,
                ..small_config()
            },
        );
        assert!(afternoon.iter().all(|r| r.latest_delivery_time.as_deref() == Some("15:00")));
    }
}
