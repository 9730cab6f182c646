//! Drives enumeration, scanning and aggregation for a whole run.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::collision::{normalize_path, CollisionAggregator, CollisionMap, Declaration};
use crate::config::DetectionConfig;
use crate::error::{DetectionError, ParseError};
use crate::files::{files_in, ExclusionMatcher};
use crate::lexer::tokenize;
use crate::scanner::scan_declarations;

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    pub files_analysed: usize,
    pub files_excluded: usize,
    pub collisions: CollisionMap,
}

impl DetectionResult {
    #[must_use]
    pub fn has_collisions(&self) -> bool {
        !self.collisions.is_empty()
    }
}

/// Finds names declared more than once across the configured scan paths.
#[derive(Debug, Clone)]
pub struct CollisionDetector {
    config: DetectionConfig,
    exclusions: ExclusionMatcher,
}

impl CollisionDetector {
    pub fn new(config: DetectionConfig) -> Self {
        let exclusions = ExclusionMatcher::new(&config.exclude_paths);
        Self { config, exclusions }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Scan every configured path. In strict mode the first unreadable or
    /// unparsable file, in enumeration order, aborts the run.
    pub fn detect(&self) -> Result<DetectionResult, DetectionError> {
        let mut aggregator = CollisionAggregator::new();
        let mut files_analysed = 0usize;
        let mut files_excluded = 0usize;

        for root in &self.config.scan_paths {
            for candidate in files_in(root, &self.config.file_extensions) {
                let outcome = candidate.and_then(|path| {
                    if self.exclusions.is_excluded(&path) {
                        debug!(path = %path.display(), "excluded");
                        return Ok(None);
                    }
                    let declarations = declarations_in_file(&path)?;
                    Ok(Some((path, declarations)))
                });

                match outcome {
                    Ok(Some((path, declarations))) => {
                        debug!(
                            path = %path.display(),
                            declarations = declarations.len(),
                            "analysed"
                        );
                        let file_path = normalize_path(&path, &self.config.base_dir);
                        aggregator.add_file(&file_path, declarations);
                        files_analysed += 1;
                    }
                    Ok(None) => files_excluded += 1,
                    Err(err) if self.config.ignore_parse_failures => {
                        warn!("skipping file: {err}");
                        files_excluded += 1;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }

        Ok(DetectionResult {
            files_analysed,
            files_excluded,
            collisions: aggregator.finish(),
        })
    }
}

/// Read, tokenize and scan one file.
pub fn declarations_in_file(path: &Path) -> Result<Vec<Declaration>, ParseError> {
    let bytes = fs::read(path).map_err(|source| ParseError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let source = String::from_utf8_lossy(&bytes);
    let tokens = tokenize(&source).map_err(|source| ParseError::Syntax {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(scan_declarations(&tokens))
}
