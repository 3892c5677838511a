pub mod calendar;
pub mod gis;
pub mod pricing;
pub mod valuation;

pub use gis::GisClient;
pub use pricing::{PricePanel, PriceClient};
