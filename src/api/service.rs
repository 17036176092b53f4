//! Shared business logic for the forecast API
//!
//! The delivery table is loaded once and shared read-only. Every report runs
//! the full pipeline on a blocking thread with its own forecaster.

use crate::config::PipelineConfig;
use crate::loader::load_deliveries;
use crate::models::DeliveryRecord;
use crate::report::{self, DashboardReport};
use crate::segment::{FilterOptions, Selection};
use crate::summary::DeliverySummary;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub struct ForecastService {
    config: Arc<PipelineConfig>,
    records: Arc<Vec<DeliveryRecord>>,
    cohort: Arc<Vec<DeliveryRecord>>,
    options: FilterOptions,
    cached_summary: Arc<RwLock<Option<DeliverySummary>>>,
}

impl ForecastService {
    pub fn new(records: Vec<DeliveryRecord>, config: PipelineConfig) -> Self {
        let cohort = report::cohort_records(&records, &config);
        let options = FilterOptions::from_records(&cohort);
        info!(
            "Serving {} records ({} in the {} cohort), {} container types, {} hubs",
            records.len(),
            cohort.len(),
            config.cohort,
            options.container_types.len() - 1,
            options.hub_locations.len() - 1
        );
        Self {
            config: Arc::new(config),
            records: Arc::new(records),
            cohort: Arc::new(cohort),
            options,
            cached_summary: Arc::new(RwLock::new(None)),
        }
    }

    /// Load the configured CSV and build the service around it.
    pub fn load(config: PipelineConfig) -> Result<Self> {
        let records = load_deliveries(&config.data_path)
            .with_context(|| format!("loading {}", config.data_path.display()))?;
        Ok(Self::new(records, config))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Drop-down contents for the forecast cohort.
    pub fn filter_options(&self) -> &FilterOptions {
        &self.options
    }

    /// Whether a selection names a value present in the cohort.
    pub fn is_known(&self, container: &Selection, hub: &Selection) -> bool {
        let known = |sel: &Selection, values: &[String]| match sel {
            Selection::All => true,
            Selection::Only(v) => values.iter().skip(1).any(|known| known == v),
        };
        known(container, &self.options.container_types) && known(hub, &self.options.hub_locations)
    }

    pub async fn summary(&self) -> DeliverySummary {
        {
            let cache = self.cached_summary.read().await;
            if let Some(summary) = cache.as_ref() {
                return summary.clone();
            }
        }

        let summary = DeliverySummary::from_records(&self.records);
        let mut cache = self.cached_summary.write().await;
        *cache = Some(summary.clone());
        summary
    }

    /// Run the pipeline for one selection off the async runtime.
    pub async fn report(&self, container: Selection, hub: Selection) -> Result<DashboardReport> {
        let cohort = Arc::clone(&self.cohort);
        let config = Arc::clone(&self.config);
        let report = tokio::task::spawn_blocking(move || {
            report::build_cohort_report(&cohort, &config, &container, &hub)
        })
        .await
        .context("forecast task failed")?;
        Ok(report)
    }
}
