//! Next-day demand attribution
//!
//! Turns one forecast row into the four figures shown to dispatchers:
//! regular demand, weekday effect, seasonal demand and holiday impact. The
//! effects are rounded one by one and regular demand takes whatever is left,
//! so the four lines always add up to the headline container count.

use crate::forecast::{Component, ForecastRow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Effects smaller than this (in containers) are reported as zero.
pub const MATERIALITY_FLOOR: f64 = 0.01;

/// Minimum weekday effect as a share of the trend.
pub const WEEKDAY_TREND_SHARE: f64 = 0.01;

/// Component values as read from the forecast, before rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawComponents {
    pub yhat: f64,
    pub trend: f64,
    pub weekly: f64,
    pub yearly: f64,
    pub holidays: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandBreakdown {
    pub date: NaiveDate,
    pub weekday: String,
    pub total_containers: i64,
    pub regular_demand: i64,
    pub weekday_effect: i64,
    pub seasonal_effect: i64,
    pub holiday_effect: i64,
    pub trucks: u64,
    /// Weekday effect was inferred as the residual, not read from the model.
    pub weekday_effect_inferred: bool,
    pub raw: RawComponents,
}

impl DemandBreakdown {
    /// Sum of the four displayed lines; equals `total_containers`.
    pub fn displayed_sum(&self) -> i64 {
        self.regular_demand + self.weekday_effect + self.seasonal_effect + self.holiday_effect
    }
}

/// Round half to even, as the dashboard always has.
pub fn round_display(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// Trucks for a container count; a partly filled truck still counts.
pub fn trucks_needed(containers: i64, containers_per_truck: u64) -> u64 {
    if containers <= 0 || containers_per_truck == 0 {
        return 0;
    }
    (containers as u64).div_ceil(containers_per_truck)
}

fn material(value: f64) -> f64 {
    if value.abs() < MATERIALITY_FLOOR {
        0.0
    } else {
        value
    }
}

/// Break a forecast row down into displayable demand lines.
pub fn attribute(row: &ForecastRow, containers_per_truck: u64) -> DemandBreakdown {
    let yhat = row.yhat;
    let trend = row.component(Component::Trend).unwrap_or(0.0);
    let yearly = row.component(Component::Yearly).unwrap_or(0.0);
    let holidays = row.component(Component::Holidays).unwrap_or(0.0);

    let (mut weekly, inferred) = match row.component(Component::Weekly) {
        Some(w) if w != 0.0 => (w, false),
        _ => (yhat - trend - yearly - holidays, true),
    };

    weekly = material(weekly);
    let yearly = material(yearly);
    let holidays = material(holidays);

    if weekly.abs() < WEEKDAY_TREND_SHARE * trend {
        weekly = if trend > 0.0 { WEEKDAY_TREND_SHARE * trend } else { 1.0 };
    }

    let total_containers = round_display(yhat.max(0.0));
    let weekday_effect = round_display(weekly);
    let seasonal_effect = round_display(yearly);
    let holiday_effect = round_display(holidays);
    let regular_demand = total_containers - (weekday_effect + seasonal_effect + holiday_effect);

    DemandBreakdown {
        date: row.date,
        weekday: row.date.format("%A").to_string(),
        total_containers,
        regular_demand,
        weekday_effect,
        seasonal_effect,
        holiday_effect,
        trucks: trucks_needed(total_containers, containers_per_truck),
        weekday_effect_inferred: inferred,
        raw: RawComponents {
            yhat,
            trend,
            weekly,
            yearly,
            holidays,
        },
    }
}

fn signed(value: i64) -> String {
    if value >= 0 {
        format!("+{}", value)
    } else {
        value.to_string()
    }
}

/// Markdown explanation of a breakdown.
pub fn narrative(b: &DemandBreakdown) -> String {
    let mut text = format!(
        "For **{}** ({}), we expect **{} containers** based on:\n\
         - **Regular demand**: {} containers\n\
         - **{} effect**: {} containers\n\
         - **Seasonal demand**: {} containers\n\
         - **Holiday impact**: {} containers\n\n\
         This means you'll need **{} trucks**. ",
        b.date.format("%Y-%m-%d"),
        b.weekday,
        b.total_containers,
        b.regular_demand,
        b.weekday,
        signed(b.weekday_effect),
        signed(b.seasonal_effect),
        signed(b.holiday_effect),
        b.trucks,
    );
    if b.weekday_effect > 0 {
        text.push_str(&format!(
            "The {} effect shows that deliveries are typically higher on this day of the week.",
            b.weekday
        ));
    }
    if b.weekday_effect_inferred {
        text.push_str(&format!(
            "\n\n_The {} effect is estimated as what remains after trend, seasonal and holiday effects, so it is an approximation._",
            b.weekday
        ));
    }
    text
}

/// Explanation shown when no numeric forecast is available.
pub fn generic_narrative(containers_per_truck: u64) -> String {
    format!(
        "The forecast considers:\n\
         - Which day of the week it is (some days have more deliveries)\n\
         - Time of year (seasonal patterns in container usage)\n\
         - Holidays (which can reduce or increase demand)\n\n\
         Each truck can carry up to {} containers, and we always round up to ensure you have enough trucks.",
        containers_per_truck
    )
}
