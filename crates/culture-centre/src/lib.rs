pub mod centre;
pub mod config;
pub mod error;
pub mod telemetry;
