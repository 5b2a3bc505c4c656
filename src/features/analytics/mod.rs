//! Analytics event sink. Events are written inside the transaction of the
//! change they describe and are never read back by the service.

pub mod models;
pub mod services;

pub use services::AnalyticsService;
