use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use plate_batch_types::ImageHandle;

use crate::error::SourceError;

/// Local filesystem source: one or more glob patterns expanded into concrete
/// file paths at construction time.
///
/// Patterns that match nothing contribute zero entries without an error; the
/// orchestrator decides whether an empty overall set is worth reporting.
/// Directories caught by a pattern are skipped.
#[derive(Debug)]
pub struct LocalSource {
    paths: Vec<PathBuf>,
}

impl LocalSource {
    pub fn new(patterns: &[String]) -> Result<Self, SourceError> {
        let mut paths = Vec::new();
        for pattern in patterns {
            let matches = glob::glob(pattern).map_err(|source| SourceError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            let mut matched = 0usize;
            for entry in matches {
                let path = entry?;
                if path.is_file() {
                    paths.push(path);
                    matched += 1;
                }
            }
            debug!("pattern '{pattern}' matched {matched} file(s)");
        }
        Ok(Self { paths })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.paths.iter().map(|path| display_name(path)).collect()
    }

    pub fn fetch(&self, index: usize) -> Result<ImageHandle, SourceError> {
        let path = &self.paths[index];
        let data = fs::read(path).map_err(|source| SourceError::io(path.clone(), source))?;
        Ok(ImageHandle::new(display_name(path), data))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
