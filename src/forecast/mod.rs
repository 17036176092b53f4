//! Demand forecaster
//!
//! [`Forecaster`] owns one fitted model and its latest forecast for a single
//! report. It is built per request and never shared, so fitting again simply
//! replaces both.

pub mod model;

use crate::config::ModelSettings;
use crate::holidays::Holiday;
use crate::prepare::DailyPoint;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

pub use model::{DemandModel, SeasonalModel};

#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("No model has been fitted yet")]
    NotFitted,

    #[error("Model fitting failed: {0}")]
    Solver(String),
}

/// Named additive contributions to a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Trend,
    Weekly,
    Yearly,
    Daily,
    Holidays,
}

/// Prediction for one date. Components are in containers and sum to `yhat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub components: BTreeMap<Component, f64>,
}

impl ForecastRow {
    /// A component the active model configuration produces, if any.
    pub fn component(&self, which: Component) -> Option<f64> {
        self.components.get(&which).copied()
    }

    /// Prediction clipped at zero; negative demand is not displayed.
    pub fn display_yhat(&self) -> f64 {
        self.yhat.max(0.0)
    }

    pub fn display_lower(&self) -> f64 {
        self.yhat_lower.max(0.0)
    }

    pub fn display_upper(&self) -> f64 {
        self.yhat_upper.max(0.0)
    }
}

/// Rows for the history plus the requested horizon, in date order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastFrame {
    pub last_training_date: Option<NaiveDate>,
    pub rows: Vec<ForecastRow>,
}

impl ForecastFrame {
    pub fn row(&self, date: NaiveDate) -> Option<&ForecastRow> {
        self.rows
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// First row strictly after `date`.
    pub fn first_after(&self, date: NaiveDate) -> Option<&ForecastRow> {
        self.rows.iter().find(|r| r.date > date)
    }
}

/// Mean absolute percentage error, undefined when any actual is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Mape {
    Defined { percent: f64 },
    Undefined { zero_actual_dates: Vec<NaiveDate> },
}

impl Mape {
    pub fn percent(&self) -> Option<f64> {
        match self {
            Mape::Defined { percent } => Some(*percent),
            Mape::Undefined { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointError {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
    /// `None` when the actual is zero.
    pub abs_pct_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub points: usize,
    pub mape: Mape,
    pub rmse: f64,
    pub point_errors: Vec<PointError>,
}

/// Score forecast rows against validation points sharing their dates.
pub fn evaluate(rows: &[ForecastRow], validation: &[DailyPoint]) -> Option<AccuracyReport> {
    if rows.is_empty() || validation.is_empty() {
        return None;
    }
    let predicted: HashMap<NaiveDate, f64> = rows.iter().map(|r| (r.date, r.yhat)).collect();

    let point_errors: Vec<PointError> = validation
        .iter()
        .filter_map(|p| {
            predicted.get(&p.date).map(|&yhat| PointError {
                date: p.date,
                actual: p.count,
                predicted: yhat,
                abs_pct_error: if p.count == 0.0 {
                    None
                } else {
                    Some(((p.count - yhat) / p.count).abs())
                },
            })
        })
        .collect();

    if point_errors.is_empty() {
        return None;
    }

    let n = point_errors.len() as f64;
    let rmse = (point_errors
        .iter()
        .map(|e| (e.actual - e.predicted).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    let zero_actual_dates: Vec<NaiveDate> = point_errors
        .iter()
        .filter(|e| e.abs_pct_error.is_none())
        .map(|e| e.date)
        .collect();
    let mape = if zero_actual_dates.is_empty() {
        let total: f64 = point_errors.iter().filter_map(|e| e.abs_pct_error).sum();
        Mape::Defined {
            percent: total / n * 100.0,
        }
    } else {
        Mape::Undefined { zero_actual_dates }
    };

    Some(AccuracyReport {
        points: point_errors.len(),
        mape,
        rmse,
        point_errors,
    })
}

/// Per-report forecaster over a [`DemandModel`].
pub struct Forecaster<M: DemandModel = SeasonalModel> {
    settings: ModelSettings,
    holidays: Vec<Holiday>,
    model: Option<M>,
    forecast: Option<ForecastFrame>,
}

impl<M: DemandModel> Forecaster<M> {
    pub fn new(settings: ModelSettings, holidays: Vec<Holiday>) -> Self {
        Self {
            settings,
            holidays,
            model: None,
            forecast: None,
        }
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    /// Fit on weekday training points. Replaces any earlier model and forecast.
    pub fn fit(&mut self, training: &[DailyPoint]) -> Result<(), ForecastError> {
        self.model = None;
        self.forecast = None;

        if training.len() < self.settings.min_observations {
            warn!(
                "Cannot fit on {} observations (minimum {})",
                training.len(),
                self.settings.min_observations
            );
            return Err(ForecastError::InsufficientData {
                required: self.settings.min_observations,
                actual: training.len(),
            });
        }

        let model = M::fit(&self.settings, training, &self.holidays)?;
        info!(
            "Fitted {} model on {} observations with {} holidays",
            self.settings.seasonality_mode,
            training.len(),
            self.holidays.len()
        );
        self.model = Some(model);
        Ok(())
    }

    /// Predict every history date plus `horizon_days` calendar days beyond the last one.
    pub fn forecast(&mut self, horizon_days: usize) -> Result<&ForecastFrame, ForecastError> {
        let model = self.model.as_ref().ok_or(ForecastError::NotFitted)?;

        let mut dates = model.history_dates();
        let last = dates.last().copied();
        if let Some(last) = last {
            dates.extend((1..=horizon_days as i64).map(|d| last + Duration::days(d)));
        }

        let rows = model.predict(&dates);
        info!("Forecast {} rows ({} beyond history)", rows.len(), horizon_days);
        Ok(&*self.forecast.insert(ForecastFrame {
            last_training_date: last,
            rows,
        }))
    }

    /// Accuracy of the latest forecast on `validation`; `None` when either is missing.
    pub fn accuracy(&self, validation: &[DailyPoint]) -> Option<AccuracyReport> {
        let frame = self.forecast.as_ref()?;
        evaluate(&frame.rows, validation)
    }
}
