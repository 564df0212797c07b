pub mod engine;
pub mod error;
pub mod growth;
pub mod load;
pub mod service;

pub use engine::{price, ConsumptionEstimate, Tariff};
pub use error::PricingError;
pub use growth::{compute_alpha, GrowthCalculator};
pub use load::{mean_consumption, RegionalLoadEstimator};
pub use service::PricingService;
