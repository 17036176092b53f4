//! Nationwide German public holidays, in the shape the forecast model consumes

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Prior scale given to every holiday; large so holidays act as sharp shifts.
pub const HOLIDAY_PRIOR_SCALE: f64 = 10.0;

/// Years covered when the caller does not ask for specific ones.
pub const DEFAULT_HOLIDAY_YEARS: std::ops::RangeInclusive<i32> = 2020..=2025;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
    /// Days before `date` that also carry the effect (non-positive).
    pub lower_window: i64,
    /// Days after `date` that also carry the effect.
    pub upper_window: i64,
    pub prior_scale: f64,
}

impl Holiday {
    pub fn new(date: NaiveDate, name: &str) -> Self {
        Self {
            date,
            name: name.to_string(),
            lower_window: 0,
            upper_window: 0,
            prior_scale: HOLIDAY_PRIOR_SCALE,
        }
    }

    /// Whether `day` falls inside this holiday's effect window.
    pub fn covers(&self, day: NaiveDate) -> bool {
        let offset = (day - self.date).num_days();
        offset >= self.lower_window && offset <= self.upper_window
    }
}

/// Easter Sunday (Gregorian calendar, anonymous computus).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Holidays for one year, sorted by date.
pub fn holidays_for_year(year: i32) -> Vec<Holiday> {
    let fixed = |m: u32, d: u32| NaiveDate::from_ymd_opt(year, m, d);
    let mut out = Vec::with_capacity(10);

    let mut push = |date: Option<NaiveDate>, name: &str| {
        if let Some(date) = date {
            out.push(Holiday::new(date, name));
        }
    };

    push(fixed(1, 1), "Neujahr");
    if let Some(easter) = easter_sunday(year) {
        push(Some(easter - Duration::days(2)), "Karfreitag");
        push(Some(easter + Duration::days(1)), "Ostermontag");
        push(Some(easter + Duration::days(39)), "Christi Himmelfahrt");
        push(Some(easter + Duration::days(50)), "Pfingstmontag");
    }
    push(fixed(5, 1), "Erster Mai");
    push(fixed(10, 3), "Tag der Deutschen Einheit");
    if year == 2017 {
        // 500th anniversary of the Reformation, nationwide once
        push(fixed(10, 31), "Reformationstag");
    }
    push(fixed(12, 25), "Erster Weihnachtstag");
    push(fixed(12, 26), "Zweiter Weihnachtstag");

    out.sort_by_key(|h| h.date);
    out
}

/// Holidays for every year in `years`, sorted by date.
pub fn holiday_schedule(years: impl IntoIterator<Item = i32>) -> Vec<Holiday> {
    let mut out: Vec<Holiday> = years.into_iter().flat_map(holidays_for_year).collect();
    out.sort_by_key(|h| h.date);
    out.dedup_by(|a, b| a.date == b.date && a.name == b.name);
    out
}

/// Years spanned by a date range, for sizing a schedule to a calendar.
pub fn years_between(start: NaiveDate, end: NaiveDate) -> Vec<i32> {
    if start > end {
        return Vec::new();
    }
    (start.year()..=end.year()).collect()
}
