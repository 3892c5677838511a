pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod mail;
pub mod market;
pub mod report;
pub mod securities;
pub mod snapshot;
pub mod utils;

pub use adapters::LocalStorage;
pub use config::YamlConfig;
pub use core::{engine::ReportEngine, pipeline::QuarterlyReportPipeline};
pub use utils::error::{Result, TrackerError};
