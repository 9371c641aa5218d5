pub mod telemetry;
pub mod types;

pub use telemetry::*;
pub use types::*;
