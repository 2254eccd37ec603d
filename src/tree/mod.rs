use std::collections::BTreeMap;
use std::path::Path;

use crate::ChangedFile;

const SEPARATOR: char = '/';

/// One row of the flattened file tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    /// Last path segment.
    pub name: String,
    /// Accumulated path from the repository root.
    pub full_path: String,
    pub is_dir: bool,
    pub depth: usize,
}

impl TreeItem {
    /// Indented label with a glyph, as shown in the file pane.
    pub fn title(&self) -> String {
        format!(
            "{}{} {}",
            "  ".repeat(self.depth),
            icon(&self.name, self.is_dir),
            self.name
        )
    }

    pub fn as_changed_file(&self) -> ChangedFile {
        ChangedFile {
            path: self.full_path.clone(),
            is_dir: self.is_dir,
        }
    }
}

#[derive(Debug, Default)]
struct Node {
    full_path: String,
    is_dir: bool,
    children: BTreeMap<String, Node>,
}

/// Build the sorted directory/file hierarchy for a set of changed paths.
///
/// Directories come before files at every level, then names in byte order.
/// Any segment followed by another segment in some input path is a
/// directory, so the result does not depend on input order.
pub fn build<S: AsRef<str>>(paths: &[S]) -> Vec<TreeItem> {
    let mut root = Node::default();

    for path in paths {
        let parts: Vec<&str> = path
            .as_ref()
            .split(SEPARATOR)
            .filter(|part| !part.is_empty())
            .collect();

        let mut current = &mut root;
        for (i, part) in parts.iter().enumerate() {
            let has_children = i + 1 < parts.len();
            let child = current
                .children
                .entry((*part).to_string())
                .or_insert_with(|| Node {
                    full_path: parts[..=i].join("/"),
                    ..Node::default()
                });
            child.is_dir |= has_children;
            current = child;
        }
    }

    let mut items = Vec::new();
    flatten(&root, 0, &mut items);
    items
}

fn flatten(node: &Node, depth: usize, items: &mut Vec<TreeItem>) {
    let mut children: Vec<(&String, &Node)> = node.children.iter().collect();
    // BTreeMap already yields names in order; the stable sort only lifts directories.
    children.sort_by_key(|(_, child)| !child.is_dir);

    for (name, child) in children {
        items.push(TreeItem {
            name: name.clone(),
            full_path: child.full_path.clone(),
            is_dir: child.is_dir,
            depth,
        });
        if child.is_dir {
            flatten(child, depth + 1, items);
        }
    }
}

fn icon(name: &str, is_dir: bool) -> &'static str {
    if is_dir {
        return "\u{f07b}";
    }
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "rs" => "\u{e7a8}",
        "go" => "\u{e626}",
        "js" | "ts" | "tsx" => "\u{e74e}",
        "md" => "\u{e73e}",
        "json" => "\u{e60b}",
        "yml" | "yaml" | "toml" => "\u{e615}",
        "html" => "\u{e736}",
        "css" => "\u{e749}",
        _ => "\u{f15b}",
    }
}
