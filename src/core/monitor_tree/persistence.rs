//! Per-node state directories.
//!
//! Only resolves locations; whatever a worker keeps there is its own business.

use std::path::{Path, PathBuf};

use super::node::Node;
use super::resource::ResourceKey;

pub struct StateDirs {
    base: PathBuf,
}

impl StateDirs {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self { base: base.into() }
    }

    /// `<data dir>/fleetmon/state`, falling back to a relative `state` dir
    pub fn default_base() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join("fleetmon").join("state"))
            .unwrap_or_else(|| PathBuf::from("state"))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn node_dir(&self, node: &Node) -> PathBuf {
        self.dir_for_path(&node.path())
    }

    pub fn dir_for_path(&self, path: &[ResourceKey]) -> PathBuf {
        path.iter()
            .fold(self.base.clone(), |dir, key| dir.join(sanitize(key.as_str())))
    }
}

/// Make a key usable as a single path component
fn sanitize(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => format!("_{}", cleaned),
        _ => cleaned,
    }
}
