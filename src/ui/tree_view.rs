//! Text rendering of a monitoring tree.
//!
//! Flattens nodes into rows carrying their indentation chain, then draws them
//! htop-style with the level of every node.

use colored::Colorize;

use crate::core::alert_level::AlertLevel;
use crate::core::monitor_tree::{Node, StateDirs};

/// A flattened node with indentation information
#[derive(Debug, Clone)]
pub struct TreeRow {
    pub label: String,
    pub key: String,
    pub level: AlertLevel,
    pub detail: Option<String>,
    pub depth: usize,
    pub is_last: bool,
    pub parent_chain: Vec<bool>, // For drawing tree lines
    pub state_dir: Option<String>,
}

/// Flatten `root` and everything below it
pub fn flatten_tree(root: &Node, state_dirs: Option<&StateDirs>) -> Vec<TreeRow> {
    let mut result = Vec::new();
    flatten_node(root, &mut result, true, Vec::new(), 0, state_dirs);
    result
}

fn flatten_node(
    node: &Node,
    result: &mut Vec<TreeRow>,
    is_last: bool,
    mut parent_chain: Vec<bool>,
    depth: usize,
    state_dirs: Option<&StateDirs>,
) {
    result.push(TreeRow {
        label: node.label().to_string(),
        key: node.key().to_string(),
        level: node.current_level(),
        detail: node.detail(),
        depth,
        is_last,
        parent_chain: parent_chain.clone(),
        state_dir: state_dirs.map(|dirs| dirs.node_dir(node).display().to_string()),
    });

    let children = node.children();
    if !children.is_empty() {
        // The root has no connector of its own to continue
        if depth > 0 {
            parent_chain.push(is_last);
        }
        let num_children = children.len();

        for (i, child) in children.iter().enumerate() {
            let child_is_last = i == num_children - 1;
            flatten_node(
                child,
                result,
                child_is_last,
                parent_chain.clone(),
                depth + 1,
                state_dirs,
            );
        }
    }
}

/// Generate tree indentation string (like htop)
pub fn format_tree_indent(row: &TreeRow) -> String {
    let mut indent = String::new();

    for &is_parent_last in &row.parent_chain {
        if is_parent_last {
            indent.push_str("  ");
        } else {
            indent.push_str("│ ");
        }
    }

    if row.depth > 0 {
        if row.is_last {
            indent.push_str("└─");
        } else {
            indent.push_str("├─");
        }
    }

    indent
}

/// Render rows, one node per line
pub fn render_tree(rows: &[TreeRow]) -> String {
    let mut out = String::new();

    for row in rows {
        let mut line = format!(
            "{}{} [{}]",
            format_tree_indent(row),
            row.label.bold(),
            row.level.colorize()
        );
        if row.label != row.key {
            line.push_str(&format!(" {}", format!("({})", row.key).dimmed()));
        }
        if let Some(detail) = &row.detail {
            line.push_str(&format!(" - {}", detail));
        }
        if let Some(dir) = &row.state_dir {
            line.push_str(&format!("\n{}    {}", format_tree_indent(row), dir.dimmed()));
        }
        out.push_str(&line);
        out.push('\n');
    }

    out
}
