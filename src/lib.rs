//! Next-business-day container demand forecasting for roll-off deliveries.
//!
//! Pipeline: [`loader`] → [`segment`] → [`prepare`] → [`forecast`] →
//! [`attribution`], assembled per selection by [`report`].

pub mod api;
pub mod attribution;
pub mod config;
pub mod forecast;
pub mod holidays;
pub mod loader;
pub mod models;
pub mod prepare;
pub mod report;
pub mod segment;
pub mod summary;
