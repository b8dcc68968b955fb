// UI and formatting module

pub mod tree_view;

// Re-export commonly used items for cleaner imports
pub use tree_view::{flatten_tree, format_tree_indent, render_tree, TreeRow};
