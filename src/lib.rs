pub mod config;
pub mod download;
pub mod driver;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod runner;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod validation;
pub mod workers;
