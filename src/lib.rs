// Fleetmon Library - Public API

// Re-export error types
pub mod error;
pub use error::{FleetError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod ui;

// Re-export commonly used types
pub use core::alert_level::AlertLevel;
pub use core::config::MonitorConfig;

// Initialize logging
pub fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
