//! Decomposable demand model
//!
//! `y(t) = g(t) + s(t)` in additive mode and `y(t) = g(t) · (1 + s(t))` in
//! multiplicative mode, where `g` is a piecewise-linear or logistic trend and
//! `s` stacks Fourier seasonalities and holiday indicators. Priors on the
//! coefficients are Gaussian, which turns every fit into a ridge regression
//! solved through the normal equations.
//!
//! Fitting happens in two passes. The first regresses the scaled series on
//! trend and seasonal features jointly, which yields the piecewise-linear
//! trend. For logistic growth that trend is mapped through the logit of its
//! position between floor and cap and refitted as a line. The second pass
//! regresses what the trend leaves over on the seasonal features, scaled by
//! the trend in multiplicative mode.

use super::{Component, ForecastError, ForecastRow};
use crate::config::{GrowthMode, ModelSettings, SeasonalityMode};
use crate::holidays::Holiday;
use crate::prepare::DailyPoint;
use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use tracing::debug;

const YEARLY_PERIOD: f64 = 365.25;
const WEEKLY_PERIOD: f64 = 7.0;
const DAILY_PERIOD: f64 = 1.0;

/// Ridge weight on intercept and slope; keeps the system positive definite.
const FREE_PARAMETER_PENALTY: f64 = 1e-8;

/// Logistic trend ratios are clamped away from 0 and 1 before taking the logit.
const LOGIT_EPSILON: f64 = 1e-3;

/// A fitted model that predicts dated rows with named components.
pub trait DemandModel: Sized {
    fn fit(
        settings: &ModelSettings,
        history: &[DailyPoint],
        holidays: &[Holiday],
    ) -> Result<Self, ForecastError>;

    /// Dates the model was fitted on, ascending.
    fn history_dates(&self) -> Vec<NaiveDate>;

    fn predict(&self, dates: &[NaiveDate]) -> Vec<ForecastRow>;
}

#[derive(Debug, Clone)]
enum BlockKind {
    Fourier { period: f64, order: usize },
    Holidays { names: Vec<String> },
}

/// Contiguous group of seasonal columns reported as one component.
#[derive(Debug, Clone)]
struct FeatureBlock {
    component: Component,
    kind: BlockKind,
    prior_scale: Vec<f64>,
}

impl FeatureBlock {
    fn width(&self) -> usize {
        match &self.kind {
            BlockKind::Fourier { order, .. } => 2 * order,
            BlockKind::Holidays { names } => names.len(),
        }
    }

    fn features(&self, date: NaiveDate, holidays: &[Holiday], out: &mut Vec<f64>) {
        match &self.kind {
            BlockKind::Fourier { period, order } => {
                let day = days_since_epoch(date);
                for k in 1..=*order {
                    let angle = 2.0 * PI * k as f64 * day / period;
                    out.push(angle.sin());
                    out.push(angle.cos());
                }
            }
            BlockKind::Holidays { names } => {
                for name in names {
                    let active = holidays.iter().any(|h| &h.name == name && h.covers(date));
                    out.push(if active { 1.0 } else { 0.0 });
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LogisticTrend {
    cap: f64,
    floor: f64,
    rate: f64,
    offset: f64,
}

impl LogisticTrend {
    fn at(&self, t: f64) -> f64 {
        self.floor + (self.cap - self.floor) / (1.0 + (-(self.rate * t + self.offset)).exp())
    }
}

/// Decomposable regression with trend, Fourier seasonalities and holidays.
#[derive(Debug, Clone)]
pub struct SeasonalModel {
    mode: SeasonalityMode,
    start: NaiveDate,
    span_days: f64,
    y_scale: f64,
    history: Vec<NaiveDate>,
    holidays: Vec<Holiday>,
    blocks: Vec<FeatureBlock>,
    changepoints: Vec<f64>,
    /// Intercept, slope and one rate change per changepoint (scaled units).
    linear_trend: Vec<f64>,
    logistic: Option<LogisticTrend>,
    seasonal_beta: Vec<f64>,
    sigma: f64,
    z_score: f64,
}

fn days_since_epoch(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as f64
}

/// Solve `(XᵀX + diag(penalties)) β = Xᵀy`.
fn ridge_solve(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    penalties: &[f64],
) -> Result<DVector<f64>, ForecastError> {
    let mut gram = x.transpose() * x;
    for (j, p) in penalties.iter().enumerate() {
        gram[(j, j)] += p;
    }
    let rhs = x.transpose() * y;

    if let Some(chol) = gram.clone().cholesky() {
        return Ok(chol.solve(&rhs));
    }
    debug!("Cholesky failed, falling back to LU");
    gram.lu()
        .solve(&rhs)
        .ok_or_else(|| ForecastError::Solver("normal equations are singular".to_string()))
}

/// Changepoint locations in scaled time, spread over the first `range` of history.
fn place_changepoints(t: &[f64], requested: usize, range: f64) -> Vec<f64> {
    let hist_size = (t.len() as f64 * range).floor() as usize;
    if hist_size < 2 || requested == 0 {
        return Vec::new();
    }
    let n = requested.min(hist_size - 1);
    (1..=n)
        .map(|i| {
            let idx = (i as f64 * (hist_size - 1) as f64 / n as f64).round() as usize;
            t[idx.min(t.len() - 1)]
        })
        .collect()
}

fn build_blocks(settings: &ModelSettings, holidays: &[Holiday]) -> Vec<FeatureBlock> {
    let mut blocks = Vec::new();
    let seasonal = [
        (Component::Yearly, YEARLY_PERIOD, settings.yearly_order),
        (Component::Weekly, WEEKLY_PERIOD, settings.weekly_order),
        (Component::Daily, DAILY_PERIOD, settings.daily_order),
    ];
    for (component, period, order) in seasonal {
        if let Some(order) = order.filter(|o| *o > 0) {
            blocks.push(FeatureBlock {
                component,
                kind: BlockKind::Fourier { period, order },
                prior_scale: vec![settings.seasonality_prior_scale; 2 * order],
            });
        }
    }

    let mut names: Vec<String> = Vec::new();
    let mut scales: Vec<f64> = Vec::new();
    for h in holidays {
        if !names.contains(&h.name) {
            names.push(h.name.clone());
            scales.push(h.prior_scale);
        }
    }
    if !names.is_empty() {
        blocks.push(FeatureBlock {
            component: Component::Holidays,
            kind: BlockKind::Holidays { names },
            prior_scale: scales,
        });
    }
    blocks
}

impl SeasonalModel {
    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span_days
    }

    fn seasonal_width(&self) -> usize {
        self.blocks.iter().map(FeatureBlock::width).sum()
    }

    fn seasonal_features(&self, date: NaiveDate) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.seasonal_width());
        for block in &self.blocks {
            block.features(date, &self.holidays, &mut row);
        }
        row
    }

    fn linear_trend_at(&self, t: f64) -> f64 {
        let mut value = self.linear_trend[0] + self.linear_trend[1] * t;
        for (s, delta) in self.changepoints.iter().zip(&self.linear_trend[2..]) {
            if t > *s {
                value += delta * (t - s);
            }
        }
        value
    }

    fn trend_at(&self, t: f64) -> f64 {
        match &self.logistic {
            Some(logistic) => logistic.at(t),
            None => self.linear_trend_at(t),
        }
    }

    fn trend_features(&self, t: f64) -> Vec<f64> {
        let mut row = Vec::with_capacity(2 + self.changepoints.len());
        row.push(1.0);
        row.push(t);
        for s in &self.changepoints {
            row.push((t - s).max(0.0));
        }
        row
    }

    /// Seasonal multiplier applied to the features of one row.
    fn feature_weight(&self, trend: f64) -> f64 {
        match self.mode {
            SeasonalityMode::Additive => 1.0,
            SeasonalityMode::Multiplicative => trend,
        }
    }

    /// Per-component contributions in scaled units.
    fn decompose(&self, date: NaiveDate) -> (f64, Vec<(Component, f64)>) {
        let trend = self.trend_at(self.scaled_time(date));
        let weight = self.feature_weight(trend);
        let features = self.seasonal_features(date);

        let mut parts = Vec::with_capacity(self.blocks.len());
        let mut col = 0;
        for block in &self.blocks {
            let width = block.width();
            let effect: f64 = features[col..col + width]
                .iter()
                .zip(&self.seasonal_beta[col..col + width])
                .map(|(x, b)| x * b)
                .sum();
            parts.push((block.component, weight * effect));
            col += width;
        }
        (trend, parts)
    }

    fn fit_logistic(&self, t: &[f64], settings: &ModelSettings, max_y: f64) -> Option<LogisticTrend> {
        let cap = settings.cap_multiplier * max_y / self.y_scale;
        let floor = settings.floor / self.y_scale;
        if !cap.is_finite() || cap <= floor {
            debug!("Logistic cap {} not above floor {}, using linear trend", cap, floor);
            return None;
        }

        let z: Vec<f64> = t
            .iter()
            .map(|&ti| {
                let ratio = ((self.linear_trend_at(ti) - floor) / (cap - floor))
                    .clamp(LOGIT_EPSILON, 1.0 - LOGIT_EPSILON);
                (ratio / (1.0 - ratio)).ln()
            })
            .collect();

        let n = t.len() as f64;
        let t_mean = t.iter().sum::<f64>() / n;
        let z_mean = z.iter().sum::<f64>() / n;
        let sxx: f64 = t.iter().map(|ti| (ti - t_mean).powi(2)).sum();
        let sxz: f64 = t.iter().zip(&z).map(|(ti, zi)| (ti - t_mean) * (zi - z_mean)).sum();
        let rate = if sxx > 1e-12 { sxz / sxx } else { 0.0 };

        Some(LogisticTrend {
            cap,
            floor,
            rate,
            offset: z_mean - rate * t_mean,
        })
    }
}

impl DemandModel for SeasonalModel {
    fn fit(
        settings: &ModelSettings,
        history: &[DailyPoint],
        holidays: &[Holiday],
    ) -> Result<Self, ForecastError> {
        let required = settings.min_observations.max(1);
        if history.len() < required {
            return Err(ForecastError::InsufficientData {
                required,
                actual: history.len(),
            });
        }

        let mut points = history.to_vec();
        points.sort_by_key(|p| p.date);
        let start = points[0].date;
        let end = points[points.len() - 1].date;
        let span_days = ((end - start).num_days() as f64).max(1.0);

        let max_y = points.iter().map(|p| p.count).fold(f64::NEG_INFINITY, f64::max);
        let max_abs = points.iter().map(|p| p.count.abs()).fold(0.0, f64::max);
        let y_scale = if max_abs > 0.0 { max_abs } else { 1.0 };

        let z_score = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::Solver(e.to_string()))?
            .inverse_cdf(0.5 + settings.interval_width.clamp(0.0, 0.999) / 2.0);

        let mut model = SeasonalModel {
            mode: settings.seasonality_mode,
            start,
            span_days,
            y_scale,
            history: points.iter().map(|p| p.date).collect(),
            holidays: holidays.to_vec(),
            blocks: build_blocks(settings, holidays),
            changepoints: Vec::new(),
            linear_trend: vec![0.0, 0.0],
            logistic: None,
            seasonal_beta: Vec::new(),
            sigma: 0.0,
            z_score,
        };

        let t: Vec<f64> = model.history.iter().map(|d| model.scaled_time(*d)).collect();
        let y = DVector::from_iterator(points.len(), points.iter().map(|p| p.count / y_scale));
        model.changepoints =
            place_changepoints(&t, settings.n_changepoints, settings.changepoint_range);

        let n = points.len();
        let trend_width = 2 + model.changepoints.len();
        let seasonal_width = model.seasonal_width();
        let seasonal_rows: Vec<Vec<f64>> = model
            .history
            .iter()
            .map(|d| model.seasonal_features(*d))
            .collect();
        let seasonal_penalties: Vec<f64> = model
            .blocks
            .iter()
            .flat_map(|b| b.prior_scale.iter().map(|s| 1.0 / (s * s)))
            .collect();

        // Pass 1: joint fit for the piecewise-linear trend
        let joint = DMatrix::from_fn(n, trend_width + seasonal_width, |i, j| {
            if j < trend_width {
                model.trend_features(t[i])[j]
            } else {
                seasonal_rows[i][j - trend_width]
            }
        });
        let mut penalties = vec![FREE_PARAMETER_PENALTY, FREE_PARAMETER_PENALTY];
        let cp_penalty = 1.0 / settings.changepoint_prior_scale.powi(2);
        penalties.extend(std::iter::repeat(cp_penalty).take(model.changepoints.len()));
        penalties.extend(seasonal_penalties.iter().copied());

        let beta = ridge_solve(&joint, &y, &penalties)?;
        model.linear_trend = beta.iter().take(trend_width).copied().collect();

        if settings.growth == GrowthMode::Logistic {
            model.logistic = model.fit_logistic(&t, settings, max_y);
        }

        // Pass 2: seasonal and holiday effects around the final trend
        let trend: Vec<f64> = t.iter().map(|ti| model.trend_at(*ti)).collect();
        if seasonal_width > 0 {
            let design = DMatrix::from_fn(n, seasonal_width, |i, j| {
                model.feature_weight(trend[i]) * seasonal_rows[i][j]
            });
            let target = DVector::from_iterator(n, (0..n).map(|i| y[i] - trend[i]));
            model.seasonal_beta = ridge_solve(&design, &target, &seasonal_penalties)?
                .iter()
                .copied()
                .collect();
        }

        let sse: f64 = model
            .history
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let (trend, parts) = model.decompose(*d);
                let fitted = trend + parts.iter().map(|(_, v)| v).sum::<f64>();
                (y[i] - fitted).powi(2)
            })
            .sum();
        model.sigma = (sse / n as f64).sqrt();

        debug!(
            "Model fitted: {} changepoints, {} seasonal columns, logistic={}, sigma={:.4}",
            model.changepoints.len(),
            seasonal_width,
            model.logistic.is_some(),
            model.sigma * y_scale
        );
        Ok(model)
    }

    fn history_dates(&self) -> Vec<NaiveDate> {
        self.history.clone()
    }

    fn predict(&self, dates: &[NaiveDate]) -> Vec<ForecastRow> {
        let last = self.history.last().copied().unwrap_or(self.start);
        let n = self.history.len().max(1) as f64;

        dates
            .iter()
            .map(|&date| {
                let (trend, parts) = self.decompose(date);
                let mut components = BTreeMap::new();
                components.insert(Component::Trend, trend * self.y_scale);
                let mut yhat = trend;
                for (component, value) in parts {
                    yhat += value;
                    *components.entry(component).or_insert(0.0) += value * self.y_scale;
                }
                let yhat = yhat * self.y_scale;

                let ahead = (date - last).num_days().max(0) as f64;
                let half_width = self.z_score * self.sigma * self.y_scale * (1.0 + ahead / n).sqrt();

                ForecastRow {
                    date,
                    yhat,
                    yhat_lower: yhat - half_width,
                    yhat_upper: yhat + half_width,
                    components,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare::{calendar, is_weekday};
    use chrono::{Datelike, Duration, Weekday};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// 180 days: 10 on weekdays, 20 on Wednesdays, weekends dropped.
    fn wednesday_peak_series() -> Vec<DailyPoint> {
        let start = ymd(2024, 1, 1);
        calendar(start, start + Duration::days(179))
            .into_iter()
            .filter(|d| is_weekday(*d))
            .map(|date| DailyPoint {
                date,
                count: if date.weekday() == Weekday::Wed { 20.0 } else { 10.0 },
            })
            .collect()
    }

    fn weekly_by_day(model: &SeasonalModel, from: NaiveDate) -> BTreeMap<u32, f64> {
        let dates: Vec<NaiveDate> = (1..=7).map(|d| from + Duration::days(d)).collect();
        model
            .predict(&dates)
            .into_iter()
            .filter(|r| is_weekday(r.date))
            .map(|r| (r.date.weekday().num_days_from_monday(), r.component(Component::Weekly).unwrap()))
            .collect()
    }

    fn assert_wednesday_peak(model: &SeasonalModel, from: NaiveDate) {
        let weekly = weekly_by_day(model, from);
        assert_eq!(weekly.len(), 5);
        let wednesday = weekly[&2];
        assert!(wednesday > 0.0, "wednesday effect {}", wednesday);
        for (day, value) in &weekly {
            if *day != 2 {
                assert!(wednesday > *value, "day {} effect {} >= wednesday {}", day, value, wednesday);
            }
        }
    }

    #[test]
    fn test_weekly_component_finds_wednesday_peak() {
        let history = wednesday_peak_series();
        let model = SeasonalModel::fit(&ModelSettings::default(), &history, &[]).unwrap();
        assert_wednesday_peak(&model, history.last().unwrap().date);
    }

    #[test]
    fn test_weekly_peak_in_additive_linear_mode() {
        let settings = ModelSettings {
            growth: GrowthMode::Linear,
            seasonality_mode: SeasonalityMode::Additive,
            ..ModelSettings::default()
        };
        let history = wednesday_peak_series();
        let model = SeasonalModel::fit(&settings, &history, &[]).unwrap();
        assert_wednesday_peak(&model, history.last().unwrap().date);
    }

    #[test]
    fn test_in_sample_fit_tracks_weekly_pattern() {
        let history = wednesday_peak_series();
        let model = SeasonalModel::fit(&ModelSettings::default(), &history, &[]).unwrap();
        let dates: Vec<NaiveDate> = history.iter().map(|p| p.date).collect();
        let rows = model.predict(&dates);
        for (row, point) in rows.iter().zip(&history) {
            assert!((row.yhat - point.count).abs() < 2.0, "{}: {} vs {}", row.date, row.yhat, point.count);
        }
    }

    #[test]
    fn test_components_sum_to_prediction() {
        let history = wednesday_peak_series();
        let holidays = vec![Holiday::new(ymd(2024, 4, 1), "Ostermontag")];
        let model = SeasonalModel::fit(&ModelSettings::default(), &history, &holidays).unwrap();
        let rows = model.predict(&[ymd(2024, 4, 1), ymd(2024, 7, 3)]);
        for row in rows {
            let total: f64 = row.components.values().sum();
            assert!((total - row.yhat).abs() < 1e-9);
            assert!(row.yhat_lower <= row.yhat && row.yhat <= row.yhat_upper);
            assert!(row.component(Component::Holidays).is_some());
        }
    }

    #[test]
    fn test_disabled_seasonality_is_not_reported() {
        let settings = ModelSettings {
            weekly_order: None,
            ..ModelSettings::default()
        };
        let model = SeasonalModel::fit(&settings, &wednesday_peak_series(), &[]).unwrap();
        let row = &model.predict(&[ymd(2024, 7, 3)])[0];
        assert!(row.component(Component::Weekly).is_none());
        assert!(row.component(Component::Yearly).is_some());
        assert!(row.component(Component::Holidays).is_none());
    }

    #[test]
    fn test_holiday_dip_is_learned() {
        let start = ymd(2023, 1, 2);
        let holidays = crate::holidays::holidays_for_year(2023);
        let history: Vec<DailyPoint> = calendar(start, ymd(2023, 12, 29))
            .into_iter()
            .filter(|d| is_weekday(*d))
            .map(|date| DailyPoint {
                date,
                count: if holidays.iter().any(|h| h.covers(date)) { 0.0 } else { 10.0 },
            })
            .collect();
        let model = SeasonalModel::fit(&ModelSettings::default(), &history, &holidays).unwrap();
        let row = &model.predict(&[ymd(2023, 10, 3)])[0];
        assert!(row.component(Component::Holidays).unwrap() < -5.0);
        assert!(row.yhat < 5.0);
    }

    #[test]
    fn test_uncertainty_widens_with_horizon() {
        let mut history = wednesday_peak_series();
        // some noise so the band is not degenerate
        for (i, p) in history.iter_mut().enumerate() {
            p.count += if i % 3 == 0 { 1.0 } else { -0.5 };
        }
        let model = SeasonalModel::fit(&ModelSettings::default(), &history, &[]).unwrap();
        let last = history.last().unwrap().date;
        let rows = model.predict(&[last, last + Duration::days(60)]);
        let near = rows[0].yhat_upper - rows[0].yhat_lower;
        let far = rows[1].yhat_upper - rows[1].yhat_lower;
        assert!(near > 0.0);
        assert!(far > near);
    }

    #[test]
    fn test_all_zero_history_predicts_zero() {
        let start = ymd(2024, 1, 1);
        let history: Vec<DailyPoint> = calendar(start, start + Duration::days(40))
            .into_iter()
            .filter(|d| is_weekday(*d))
            .map(|date| DailyPoint { date, count: 0.0 })
            .collect();
        let model = SeasonalModel::fit(&ModelSettings::default(), &history, &[]).unwrap();
        let row = &model.predict(&[start + Duration::days(45)])[0];
        assert!(row.yhat.abs() < 1e-6);
    }

    #[test]
    fn test_changepoints_stay_in_range() {
        let t: Vec<f64> = (0..100).map(|i| i as f64 / 99.0).collect();
        let cps = place_changepoints(&t, 25, 0.8);
        assert_eq!(cps.len(), 25);
        assert!(cps.iter().all(|c| *c > 0.0 && *c <= 0.8));
        assert!(cps.windows(2).all(|w| w[0] < w[1]));

        let short: Vec<f64> = (0..5).map(|i| i as f64 / 4.0).collect();
        assert_eq!(place_changepoints(&short, 25, 0.8).len(), 3);
    }
}
