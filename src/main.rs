//! Container demand forecast report
//!
//! Runs the pipeline for one container/hub selection and prints the
//! dashboard sections to the terminal.
//!
//! Run: ./target/release/depot_forecast [section] [--container X] [--hub Y] [--json]
//! Sections: all, summary, forecast, accuracy, breakdown

use anyhow::Result;
use clap::{Parser, ValueEnum};
use depot_forecast::config::PipelineArgs;
use depot_forecast::loader::load_deliveries;
use depot_forecast::report::{self, DashboardReport, Headline};
use depot_forecast::segment::{FilterOptions, Selection};
use depot_forecast::summary::DeliverySummary;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Section {
    All,
    Summary,
    Forecast,
    Accuracy,
    Breakdown,
}

#[derive(Parser, Debug)]
#[command(name = "depot_forecast")]
#[command(about = "Forecast next-day container demand and trucks needed")]
struct Args {
    #[arg(value_enum, default_value = "all")]
    section: Section,

    /// Container type, or "All"
    #[arg(long, env = "DEPOT_CONTAINER")]
    container: Option<String>,

    /// Hub location, or "All"
    #[arg(long, env = "DEPOT_HUB")]
    hub: Option<String>,

    /// Print the full report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Rows of the forecast table to print
    #[arg(long, default_value_t = 15)]
    rows: usize,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

fn print_section_header(title: &str) {
    println!("\n{}", "═".repeat(85));
    println!("  {}", title);
    println!("{}\n", "═".repeat(85));
}

fn print_subsection(title: &str) {
    println!("\n{}", title);
    println!("{}", "─".repeat(75));
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let args = Args::parse();
    let config = args.pipeline.clone().into_config();

    let records = match load_deliveries(&config.data_path) {
        Ok(records) => records,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let container = Selection::parse(args.container.as_deref());
    let hub = Selection::parse(args.hub.as_deref());
    info!("Selection: container={} hub={}", container.label(), hub.label());

    let cohort = report::cohort_records(&records, &config);
    let report = report::build_cohort_report(&cohort, &config, &container, &hub);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n{}", "█".repeat(85));
    println!("{}  CONTAINER DEMAND FORECAST  {}", "█".repeat(28), "█".repeat(28));
    println!("{}\n", "█".repeat(85));

    match args.section {
        Section::All => {
            print_summary(&DeliverySummary::from_records(&records), &FilterOptions::from_records(&cohort));
            print_forecast(&report, args.rows);
            print_accuracy(&report);
            print_breakdown(&report);
        }
        Section::Summary => {
            print_summary(&DeliverySummary::from_records(&records), &FilterOptions::from_records(&cohort))
        }
        Section::Forecast => print_forecast(&report, args.rows),
        Section::Accuracy => print_accuracy(&report),
        Section::Breakdown => print_breakdown(&report),
    }

    println!("\n{}", "█".repeat(85));
    Ok(())
}

fn print_summary(summary: &DeliverySummary, options: &FilterOptions) {
    print_section_header("1. DELIVERY OVERVIEW");

    println!("  Records:               {:>10}", summary.total_records);
    if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
        println!("  Period:                {} to {}", first, last);
    }
    println!("  Containers delivered:  {:>10.0}", summary.containers_delivered);
    println!("  Containers picked up:  {:>10.0}", summary.containers_picked_up);

    print_subsection("Deliveries by Time of Day");
    for (window, count) in &summary.by_time_of_day {
        println!("  {:12} {:>10}", window, count);
    }

    print_subsection("Deliveries by Order Type");
    for (order_type, count) in DeliverySummary::top(&summary.by_order_type, 10) {
        println!("  {:12} {:>10}", order_type, count);
    }

    print_subsection("Busiest Hubs");
    for (hub, count) in DeliverySummary::top(&summary.by_hub, 10) {
        println!("  {:20} {:>10}", hub, count);
    }

    print_subsection("Top Container Types");
    for (container, count) in DeliverySummary::top(&summary.by_container_type, 10) {
        println!("  {:20} {:>10}", container, count);
    }

    print_subsection("Selectable in the forecast");
    println!("  Container types: {}", options.container_types.join(", "));
    println!("  Hubs:            {}", options.hub_locations.join(", "));
}

fn print_forecast(report: &DashboardReport, rows: usize) {
    print_section_header(&format!("2. {}", report.title.to_uppercase()));

    println!(
        "  {} {} records ({} after selection)",
        report.cohort, report.cohort_records, report.selected_records
    );
    println!(
        "  Training weekdays: {:>5}   Validation weekdays: {:>5}",
        report.train.len(),
        report.validation.len()
    );
    if let Some(cutoff) = report.cutoff {
        println!("  Cutoff: {}", cutoff);
    }

    if report.forecast.is_empty() {
        println!("\n  No forecast available for this selection.");
        return;
    }

    let start = report
        .cutoff
        .map(|c| report.forecast.partition_point(|p| p.date <= c))
        .unwrap_or(0);

    print_subsection("Forecast after the cutoff");
    println!(
        "  {:12} {:10} {:>10} {:>10} {:>10} {:>10}",
        "Date", "Day", "Forecast", "Lower", "Upper", "Actual"
    );
    println!("  {}", "─".repeat(68));
    for p in report.forecast.iter().skip(start).take(rows) {
        let actual = report
            .validation
            .iter()
            .find(|v| v.date == p.date)
            .map(|v| format!("{:.0}", v.count))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:12} {:10} {:>10.1} {:>10.1} {:>10.1} {:>10}",
            p.date.to_string(),
            p.date.format("%A").to_string(),
            p.yhat,
            p.yhat_lower,
            p.yhat_upper,
            actual
        );
    }
}

fn print_accuracy(report: &DashboardReport) {
    print_section_header("3. FORECAST ACCURACY (VALIDATION WINDOW)");

    println!("  MAPE:  {}", report.accuracy.mape);
    println!("  RMSE:  {}", report.accuracy.rmse);

    if let Some(details) = &report.accuracy.details {
        println!("  Points compared: {}", details.points);
        if details.mape.percent().is_none() {
            println!("  MAPE is undefined: some validation days had no deliveries.");
        }
    }
}

fn print_breakdown(report: &DashboardReport) {
    print_section_header("4. NEXT DAY DEMAND");

    match &report.headline {
        Headline::Forecast {
            date,
            containers,
            trucks,
        } => {
            println!("  Date:               {} ({})", date, date.format("%A"));
            println!("  Containers needed:  {:>6}", containers);
            println!("  Trucks needed:      {:>6}", trucks);
        }
        Headline::Unavailable { reason } => {
            println!("  Cannot forecast: {}", reason);
        }
    }

    print_subsection("How this forecast is calculated");
    for line in report.narrative.lines() {
        println!("  {}", line.replace("**", ""));
    }
}
