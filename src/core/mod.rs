// Core business logic module

pub mod alert_level;
pub mod config;
pub mod fleet;
pub mod monitor_tree;

// Re-export commonly used items
pub use alert_level::AlertLevel;
pub use config::MonitorConfig;
pub use fleet::{FleetInventory, FleetSpec};
pub use monitor_tree::{ContainerNode, LeafNode, MonitorTree, Node};
