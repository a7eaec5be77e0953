use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tokio::task::spawn_blocking;

use crate::{error::Result, file::is_hidden_name};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirectoryTree {
    pub name: String,
    pub path: PathBuf,
    pub children: Vec<DirectoryTree>,
    pub truncated: bool,
    pub error: Option<String>,
}

impl DirectoryTree {
    fn new(path: &Path) -> Self {
        let name = path.file_name().map_or_else(
            || path.to_string_lossy().into_owned(),
            |name| name.to_string_lossy().into_owned(),
        );

        DirectoryTree {
            name,
            path: path.to_owned(),
            children: Vec::new(),
            truncated: false,
            error: None,
        }
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(DirectoryTree::count).sum::<usize>()
    }
}

/// Nested non-hidden directories below `root`, sorted by name. Nodes at
/// `max_depth` are marked truncated instead of being expanded.
pub async fn directory_tree(root: &Path, max_depth: usize) -> Result<DirectoryTree> {
    let root = root.to_owned();
    let tree = spawn_blocking(move || build_tree(&root, 0, max_depth)).await?;
    Ok(tree)
}

fn build_tree(path: &Path, depth: usize, max_depth: usize) -> DirectoryTree {
    let mut tree = DirectoryTree::new(path);
    if depth >= max_depth {
        tree.truncated = true;
        return tree;
    }

    let read_dir = match fs::read_dir(path) {
        Ok(read_dir) => read_dir,
        Err(err) => {
            tree.error = Some(format!("access denied: {err}"));
            return tree;
        }
    };

    let mut children = read_dir
        .filter_map(std::result::Result::ok)
        .filter(|entry| !is_hidden_name(&entry.file_name().to_string_lossy()))
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.path())
        .collect::<Vec<_>>();
    children.sort();

    tree.children = children
        .iter()
        .map(|child| build_tree(child, depth + 1, max_depth))
        .collect();
    tree
}
