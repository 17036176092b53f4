//! Synthetic delivery export generator
//!
//! Writes a CSV in the dispatch system's column layout with a weekday
//! pattern, a seasonal swing, slow growth and holiday dips, so the forecast
//! can run without the production export.
//!
//! Usage:
//!   cargo run --release --bin generate_synthetic -- [OPTIONS]
//!
//! Options:
//!   --start <DATE>        First delivery date (default: 2021-01-04)
//!   --end <DATE>          Last delivery date (default: 2025-03-31)
//!   --base-volume <F>     Mean deliveries per weekday and hub (default: 6.0)
//!   --growth <F>          Yearly volume growth (default: 0.05)
//!   --seasonal-swing <F>  Amplitude of the yearly cycle (default: 0.25)
//!   --seed <N>            Random seed for reproducibility (optional)
//!   --output <PATH>       Output CSV path (default: data/combined.csv)

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use clap::Parser;
use csv::WriterBuilder;
use depot_forecast::holidays::{holiday_schedule, years_between, Holiday};
use depot_forecast::models::CsvRecord;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::error::Error;
use std::path::PathBuf;

/// Synthetic data generator for the delivery export
#[derive(Parser, Debug)]
#[command(name = "generate_synthetic")]
#[command(about = "Generate a synthetic container delivery export")]
struct Args {
    /// First delivery date
    #[arg(long, default_value = "2021-01-04")]
    start: NaiveDate,

    /// Last delivery date
    #[arg(long, default_value = "2025-03-31")]
    end: NaiveDate,

    /// Mean deliveries per weekday and hub
    #[arg(long, default_value = "6.0")]
    base_volume: f64,

    /// Relative volume growth per year
    #[arg(long, default_value = "0.05")]
    growth: f64,

    /// Amplitude of the yearly cycle (0.0 - 1.0)
    #[arg(long, default_value = "0.25")]
    seasonal_swing: f64,

    /// Day-to-day noise in deliveries
    #[arg(long, default_value = "2")]
    jitter: i64,

    /// Share of deliveries with a morning window
    #[arg(long, default_value = "0.65")]
    morning_share: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output CSV path
    #[arg(long, default_value = "data/combined.csv")]
    output: PathBuf,
}

const HUBS: [(&str, &str, &str); 4] = [
    ("NORD", "22045", "Hamburg"),
    ("SUED", "80939", "München"),
    ("WEST", "50739", "Köln"),
    ("OST", "04357", "Leipzig"),
];

/// Hub volume relative to the base.
const HUB_WEIGHTS: [f64; 4] = [1.2, 1.0, 0.9, 0.6];

const CONTAINER_TYPES: [(&str, f64); 5] = [
    ("ABR7", 0.30),
    ("ABR10", 0.25),
    ("ABR36", 0.15),
    ("MUL5", 0.20),
    ("MUL10", 0.10),
];

/// Forecast order types plus exchange ("A") and collection ("H") orders.
const ORDER_TYPES: [(&str, f64); 5] = [("S", 0.40), ("W", 0.25), ("T", 0.15), ("A", 0.12), ("H", 0.08)];

const WASTE_TYPES: [&str; 5] = ["Bauschutt", "Gemischte Abfälle", "Holz", "Grünschnitt", "Papier"];

const CUSTOMER_TYPES: [&str; 3] = ["Gewerbe", "Privat", "Kommune"];

/// Demand multiplier by weekday; Wednesday is the busiest day.
fn weekday_factor(day: Weekday) -> f64 {
    match day {
        Weekday::Mon => 1.05,
        Weekday::Tue => 0.95,
        Weekday::Wed => 1.35,
        Weekday::Thu => 1.0,
        Weekday::Fri => 0.8,
        Weekday::Sat => 0.1,
        Weekday::Sun => 0.0,
    }
}

/// Yearly cycle peaking in early summer.
fn seasonal_factor(date: NaiveDate, swing: f64) -> f64 {
    let phase = 2.0 * std::f64::consts::PI * (date.ordinal() as f64 - 80.0) / 365.25;
    1.0 + swing * phase.sin()
}

fn pick_weighted<'a>(options: &[(&'a str, f64)], rng: &mut impl Rng) -> &'a str {
    let total: f64 = options.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen::<f64>() * total;
    for (value, weight) in options {
        if roll < *weight {
            return *value;
        }
        roll -= weight;
    }
    options.last().map(|(v, _)| *v).unwrap_or_default()
}

/// Deliveries for one hub on one day; fractional expectations round up at random.
fn daily_volume(expected: f64, jitter: i64, rng: &mut impl Rng) -> usize {
    let base = expected.floor() as i64;
    let extra = if rng.gen::<f64>() < expected.fract() { 1 } else { 0 };
    let noise = if jitter > 0 { rng.gen_range(-jitter..=jitter) } else { 0 };
    (base + extra + noise).max(0) as usize
}

/// Latest delivery time, left blank now and then like the real export.
fn delivery_window(morning_share: f64, rng: &mut impl Rng) -> (Option<String>, Option<String>) {
    if rng.gen::<f64>() < 0.03 {
        return (None, None);
    }
    let latest_hour: u32 = if rng.gen::<f64>() < morning_share {
        rng.gen_range(8..12)
    } else {
        rng.gen_range(12..18)
    };
    let minute = if rng.gen_bool(0.5) { 0 } else { 30 };
    let earliest_hour = latest_hour.saturating_sub(rng.gen_range(2..5)).max(6);
    (
        Some(format!("{:02}:00", earliest_hour)),
        Some(format!("{:02}:{:02}", latest_hour, minute)),
    )
}

fn generate_order_id(rng: &mut impl Rng) -> String {
    format!("A-{:08}", rng.gen_range(0..100_000_000u32))
}

fn generate_record(date: NaiveDate, hub: usize, args: &Args, rng: &mut impl Rng) -> CsvRecord {
    let (hub_code, disposal_zip, disposal_city) = HUBS[hub];
    let order_type = pick_weighted(&ORDER_TYPES, rng);
    let (earliest, latest) = delivery_window(args.morning_share, rng);
    let ordered = date - Duration::days(rng.gen_range(1..10));

    let (delivered, picked_up) = match order_type {
        "S" | "T" => (Some(1.0), Some(0.0)),
        "W" | "A" => (Some(1.0), Some(1.0)),
        _ => (Some(0.0), Some(1.0)),
    };

    CsvRecord {
        earliest_delivery_time: earliest,
        latest_delivery_time: latest,
        delivery_year: Some(date.year().to_string()),
        delivery_month: Some(date.month().to_string()),
        delivery_date: date.format("%Y-%m-%d").to_string(),
        order_id: Some(generate_order_id(rng)),
        customer_type: CUSTOMER_TYPES.choose(rng).map(|s| s.to_string()),
        customer_site_id: Some(format!("LO-{:06}", rng.gen_range(0..250_000u32))),
        customer_zipcode: Some(format!("{}{:03}", &disposal_zip[..2], rng.gen_range(0..1000u32))),
        customer_city: Some(disposal_city.to_string()),
        vehicle_group: Some(format!("{}-{}", hub_code, rng.gen_range(1..4))),
        hub_location: Some(hub_code.to_string()),
        order_type: Some(order_type.to_string()),
        container_type: Some(pick_weighted(&CONTAINER_TYPES, rng).to_string()),
        containers_delivered: delivered,
        containers_picked_up: picked_up,
        vehicle_id: Some(format!("{}-{:03}", hub_code, rng.gen_range(1..40))),
        waste_type: WASTE_TYPES.choose(rng).map(|s| s.to_string()),
        disposal_site_zipcode: Some(disposal_zip.to_string()),
        disposal_site_city: Some(disposal_city.to_string()),
        order_datetime: Some(format!(
            "{} {:02}:{:02}:00",
            ordered.format("%Y-%m-%d"),
            rng.gen_range(7..18),
            rng.gen_range(0..60)
        )),
        destination_zipcode: Some(disposal_zip.to_string()),
        destination_city: Some(disposal_city.to_string()),
    }
}

fn holiday_dates(holidays: &[Holiday]) -> HashSet<NaiveDate> {
    holidays.iter().map(|h| h.date).collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    println!("🔧 Synthetic Delivery Generator");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Period:           {} to {}", args.start, args.end);
    println!("Output:           {}", args.output.display());
    println!("Base volume:      {:.1} per weekday and hub", args.base_volume);
    println!("Growth:           {:.1}% per year", args.growth * 100.0);
    println!("Seasonal swing:   ±{:.0}%", args.seasonal_swing * 100.0);
    println!("Morning share:    {:.0}%", args.morning_share * 100.0);
    if let Some(seed) = args.seed {
        println!("Random seed:      {}", seed);
    }
    println!();

    let mut rng: StdRng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let holidays = holiday_dates(&holiday_schedule(years_between(args.start, args.end)));

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(&args.output)?;

    println!("🏭 Generating deliveries...");
    let mut total_written = 0usize;
    let mut days = 0usize;

    for date in args.start.iter_days().take_while(|d| *d <= args.end) {
        let years = (date - args.start).num_days() as f64 / 365.25;
        let mut level = args.base_volume
            * weekday_factor(date.weekday())
            * seasonal_factor(date, args.seasonal_swing)
            * (1.0 + args.growth * years);
        if holidays.contains(&date) {
            level *= 0.1;
        }

        for (hub, weight) in HUB_WEIGHTS.iter().enumerate() {
            let count = daily_volume(level * weight, args.jitter, &mut rng);
            for _ in 0..count {
                writer.serialize(generate_record(date, hub, &args, &mut rng))?;
                total_written += 1;
            }
        }

        days += 1;
        if days % 365 == 0 {
            println!("   Generated {} days ({} records)...", days, total_written);
        }
    }

    writer.flush()?;

    println!("\n✅ Generation complete!");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Days:              {:>8}", days);
    println!("Records written:   {:>8}", total_written);
    println!("Holidays damped:   {:>8}", holidays.len());
    println!("Output file:       {}", args.output.display());

    Ok(())
}
