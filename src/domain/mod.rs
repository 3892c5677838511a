pub mod model;
pub mod ports;

pub use model::{
    ChartSeriesData, RealEstateValue, ReportArtifacts, Snapshot, ValuationMode, ValuationSet,
};
pub use ports::{Pipeline, Storage};
