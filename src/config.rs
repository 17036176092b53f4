//! Pipeline and model settings
//!
//! Defaults reproduce the dashboard's production constants. Binaries expose
//! them through clap arguments that can also be set from the environment.

use crate::holidays::{years_between, DEFAULT_HOLIDAY_YEARS};
use crate::models::TimeOfDay;
use crate::prepare::DEFAULT_VALIDATION_DAYS;
use crate::segment::DEFAULT_ORDER_TYPES;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_DATA_PATH: &str = "data/combined.csv";
pub const DEFAULT_HORIZON_DAYS: usize = 45;
pub const CONTAINERS_PER_TRUCK: u64 = 4;

/// How the trend evolves between and beyond observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrowthMode {
    Linear,
    /// Saturating trend between `floor` and `cap_multiplier × max(y)`.
    Logistic,
}

/// How seasonal and holiday effects combine with the trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeasonalityMode {
    Additive,
    /// Effects scale with the trend level.
    Multiplicative,
}

impl std::fmt::Display for SeasonalityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeasonalityMode::Additive => write!(f, "additive"),
            SeasonalityMode::Multiplicative => write!(f, "multiplicative"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub growth: GrowthMode,
    pub cap_multiplier: f64,
    pub floor: f64,
    pub seasonality_mode: SeasonalityMode,
    /// Fourier order per seasonality; `None` disables it.
    pub yearly_order: Option<usize>,
    pub weekly_order: Option<usize>,
    pub daily_order: Option<usize>,
    pub n_changepoints: usize,
    /// Share of the history in which changepoints may be placed.
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    /// Coverage of the uncertainty band.
    pub interval_width: f64,
    pub min_observations: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            growth: GrowthMode::Logistic,
            cap_multiplier: 1.5,
            floor: 0.0,
            seasonality_mode: SeasonalityMode::Multiplicative,
            yearly_order: Some(10),
            weekly_order: Some(3),
            daily_order: Some(4),
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.01,
            seasonality_prior_scale: 10.0,
            interval_width: 0.8,
            min_observations: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub data_path: PathBuf,
    pub calendar_start: NaiveDate,
    pub calendar_end: NaiveDate,
    pub validation_days: i64,
    pub horizon_days: usize,
    pub order_types: Vec<String>,
    pub cohort: TimeOfDay,
    pub holiday_years: Vec<i32>,
    pub containers_per_truck: u64,
    pub model: ModelSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            calendar_start: NaiveDate::from_ymd_opt(2021, 1, 4).unwrap_or_default(),
            calendar_end: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap_or_default(),
            validation_days: DEFAULT_VALIDATION_DAYS,
            horizon_days: DEFAULT_HORIZON_DAYS,
            order_types: DEFAULT_ORDER_TYPES.iter().map(|s| s.to_string()).collect(),
            cohort: TimeOfDay::Morning,
            holiday_years: DEFAULT_HOLIDAY_YEARS.collect(),
            containers_per_truck: CONTAINERS_PER_TRUCK,
            model: ModelSettings::default(),
        }
    }
}

impl PipelineConfig {
    pub fn order_type_refs(&self) -> Vec<&str> {
        self.order_types.iter().map(String::as_str).collect()
    }
}

fn parse_cohort(raw: &str) -> Result<TimeOfDay, String> {
    match raw.to_ascii_lowercase().as_str() {
        "morning" | "am" => Ok(TimeOfDay::Morning),
        "afternoon" | "pm" => Ok(TimeOfDay::Afternoon),
        other => Err(format!("unknown cohort '{}', expected morning or afternoon", other)),
    }
}

/// Command line / environment overrides shared by the binaries.
#[derive(Debug, Clone, clap::Args)]
pub struct PipelineArgs {
    /// Delivery CSV export
    #[arg(long = "data", env = "DEPOT_DATA_PATH", default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// First day of the forecast calendar
    #[arg(long, env = "DEPOT_CALENDAR_START", default_value = "2021-01-04")]
    pub calendar_start: NaiveDate,

    /// Last day of the forecast calendar
    #[arg(long, env = "DEPOT_CALENDAR_END", default_value = "2025-03-31")]
    pub calendar_end: NaiveDate,

    #[arg(long, env = "DEPOT_VALIDATION_DAYS", default_value_t = DEFAULT_VALIDATION_DAYS)]
    pub validation_days: i64,

    #[arg(long, env = "DEPOT_HORIZON_DAYS", default_value_t = DEFAULT_HORIZON_DAYS)]
    pub horizon_days: usize,

    /// Order types to forecast, comma separated
    #[arg(long, env = "DEPOT_ORDER_TYPES", value_delimiter = ',', default_value = "S,W,T")]
    pub order_types: Vec<String>,

    /// Delivery window cohort (morning or afternoon)
    #[arg(long, env = "DEPOT_COHORT", default_value = "morning", value_parser = parse_cohort)]
    pub cohort: TimeOfDay,

    /// Coverage of the forecast band
    #[arg(long, env = "DEPOT_INTERVAL_WIDTH", default_value_t = 0.8)]
    pub interval_width: f64,

    #[arg(long, env = "DEPOT_CONTAINERS_PER_TRUCK", default_value_t = CONTAINERS_PER_TRUCK)]
    pub containers_per_truck: u64,
}

impl PipelineArgs {
    pub fn into_config(self) -> PipelineConfig {
        // the default span plus every year the calendar and horizon touch
        let horizon_end = self.calendar_end + Duration::days(self.horizon_days as i64);
        let mut holiday_years: Vec<i32> = DEFAULT_HOLIDAY_YEARS
            .chain(years_between(self.calendar_start, horizon_end))
            .collect();
        holiday_years.sort_unstable();
        holiday_years.dedup();

        PipelineConfig {
            data_path: self.data_path,
            calendar_start: self.calendar_start,
            calendar_end: self.calendar_end,
            validation_days: self.validation_days,
            horizon_days: self.horizon_days,
            order_types: self.order_types,
            cohort: self.cohort,
            holiday_years,
            containers_per_truck: self.containers_per_truck,
            model: ModelSettings {
                interval_width: self.interval_width,
                ..ModelSettings::default()
            },
        }
    }
}
