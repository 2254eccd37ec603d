pub mod ansi;
pub mod cli;
pub mod config;
pub mod git;
pub mod hg;
pub mod highlight;
pub mod parser;
pub mod splitter;
pub mod stats;
pub mod tree;
pub mod tui;
pub mod vcs;

use std::ops::AddAssign;

/// A path reported as changed by a VCS backend or found in a diff blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangedFile {
    pub path: String,
    pub is_dir: bool,
}

impl ChangedFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
        }
    }
}

/// Lines added and deleted for one file, or summed over many.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStat {
    pub added: usize,
    pub deleted: usize,
}

impl FileStat {
    pub fn new(added: usize, deleted: usize) -> Self {
        Self { added, deleted }
    }

    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.deleted == 0
    }
}

impl AddAssign for FileStat {
    fn add_assign(&mut self, rhs: Self) {
        self.added += rhs.added;
        self.deleted += rhs.deleted;
    }
}
