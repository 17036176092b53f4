use chrono::{Datelike, NaiveDate, Weekday};
use depot_forecast::attribution::trucks_needed;
use depot_forecast::config::PipelineConfig;
use depot_forecast::forecast::{Component, Forecaster};
use depot_forecast::holidays::holiday_schedule;
use depot_forecast::loader::{load_deliveries, LoadError};
use depot_forecast::models::CsvRecord;
use depot_forecast::prepare::{is_weekday, prepare_forecast_data};
use depot_forecast::report::{build_report, cohort_records, Headline};
use depot_forecast::segment::Selection;
use tempfile::NamedTempFile;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn row(date: NaiveDate, container: &str, order_type: &str, latest: &str) -> CsvRecord {
    CsvRecord {
        latest_delivery_time: Some(latest.to_string()),
        delivery_date: date.format("%d.%m.%Y").to_string(),
        hub_location: Some("NORD".to_string()),
        order_type: Some(order_type.to_string()),
        container_type: Some(container.to_string()),
        containers_delivered: Some(1.0),
        ..CsvRecord::default()
    }
}

/// Ten morning deliveries per weekday, eighteen on Wednesdays, plus rows the
/// pipeline must ignore.
fn write_export() -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    let mut writer = csv::Writer::from_path(file.path()).unwrap();

    for date in ymd(2023, 1, 2).iter_days().take_while(|d| *d <= ymd(2023, 12, 29)) {
        if !is_weekday(date) {
            continue;
        }
        let count = if date.weekday() == Weekday::Wed { 18 } else { 10 };
        for i in 0..count {
            let container = if i % 2 == 0 { "ABR10" } else { "MUL7" };
            writer.serialize(row(date, container, "S", "09:30")).unwrap();
        }
        writer.serialize(row(date, "ABR10", "S", "15:00")).unwrap();
        writer.serialize(row(date, "ABR10", "H", "08:00")).unwrap();
    }
    writer.flush().unwrap();
    file
}

fn config() -> PipelineConfig {
    PipelineConfig {
        calendar_start: ymd(2023, 1, 2),
        calendar_end: ymd(2023, 12, 31),
        holiday_years: vec![2023, 2024],
        ..PipelineConfig::default()
    }
}

#[test]
fn test_full_report_from_csv() {
    let file = write_export();
    let records = load_deliveries(file.path()).unwrap();
    let weekdays = 260;
    assert_eq!(records.len(), weekdays * 12 + 52 * 8);

    let config = config();
    let report = build_report(&records, &config, &Selection::All, &Selection::All);

    assert!(report.is_forecast_available());
    assert!(report.train.iter().chain(&report.validation).all(|p| is_weekday(p.date)));
    for p in &report.train {
        let expected = if p.date.weekday() == Weekday::Wed { 18.0 } else { 10.0 };
        assert_eq!(p.count, expected, "{}", p.date);
    }

    let breakdown = report.breakdown.as_ref().unwrap();
    // first forecast day after the last validation weekday (Fri 2023-12-29)
    assert_eq!(breakdown.date, ymd(2023, 12, 30));
    assert_eq!(breakdown.displayed_sum(), breakdown.total_containers);
    assert_eq!(breakdown.trucks, trucks_needed(breakdown.total_containers, 4));
    match &report.headline {
        Headline::Forecast { containers, trucks, .. } => {
            assert_eq!(*containers, breakdown.total_containers);
            assert_eq!(*trucks, breakdown.trucks);
        }
        other => panic!("unexpected headline {:?}", other),
    }

    let details = report.accuracy.details.as_ref().unwrap();
    assert_eq!(details.points, report.validation.len());
    let mape = details.mape.percent().unwrap();
    assert!(mape < 25.0, "MAPE {}", mape);
    assert!(report.accuracy.mape.ends_with('%'));
}

#[test]
fn test_selection_narrows_the_series() {
    let file = write_export();
    let records = load_deliveries(file.path()).unwrap();
    let report = build_report(
        &records,
        &config(),
        &Selection::Only("ABR10".into()),
        &Selection::Only("NORD".into()),
    );
    assert_eq!(report.title, "Forecast for ABR10 at NORD");
    for p in &report.train {
        let expected = if p.date.weekday() == Weekday::Wed { 9.0 } else { 5.0 };
        assert_eq!(p.count, expected, "{}", p.date);
    }
}

#[test]
fn test_wednesday_carries_the_weekly_peak() {
    let file = write_export();
    let records = load_deliveries(file.path()).unwrap();
    let config = config();

    let cohort = cohort_records(&records, &config);
    let split = prepare_forecast_data(&cohort, config.calendar_start, config.calendar_end, 30);

    let mut forecaster: Forecaster = Forecaster::new(
        config.model.clone(),
        holiday_schedule(config.holiday_years.iter().copied()),
    );
    forecaster.fit(&split.train).unwrap();
    let frame = forecaster.forecast(config.horizon_days).unwrap();

    // week of 2023-06-12, no holidays
    let weekly: Vec<(Weekday, f64)> = (12..=16)
        .map(|d| {
            let r = frame.row(ymd(2023, 6, d)).unwrap();
            (r.date.weekday(), r.component(Component::Weekly).unwrap())
        })
        .collect();
    let (peak_day, peak) = weekly
        .iter()
        .copied()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap();
    assert_eq!(peak_day, Weekday::Wed);
    assert!(peak > 0.0);
}

#[test]
fn test_missing_export_fails_before_the_pipeline() {
    let err = load_deliveries(std::path::Path::new("does/not/exist.csv")).unwrap_err();
    assert!(matches!(err, LoadError::FileNotFound { .. }));
}
