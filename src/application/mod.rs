//! Application layer: the trade lifecycle from detection to exit.

pub mod detector;
pub mod engine;
pub mod events;
pub mod monitor;
pub mod registry;

pub use detector::{DetectorConfig, ListingDetector};
pub use engine::{EngineConfig, EngineError, EngineStatus, ShutdownReport, SniperEngine};
pub use events::{AlertBus, AlertEvent};
pub use monitor::{MonitorOutcome, PositionMonitor};
pub use registry::TradeRegistry;
