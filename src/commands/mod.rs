// Command handlers module
pub mod config;
pub mod run;
pub mod tree;

// Re-exports for cleaner imports
pub use config::execute as config;
pub use run::execute as run;
pub use tree::execute as tree;
