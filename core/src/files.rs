//! Candidate file enumeration and exclusion matching.

use std::path::{Path, PathBuf};

use aho_corasick::AhoCorasick;
use walkdir::{DirEntry, WalkDir};

use crate::error::ParseError;

/// Files under `root` whose names end with one of `extensions`.
///
/// A root that is itself a file is yielded when its extension matches.
/// Directories are walked recursively in file-name order so every run sees
/// the same sequence. Symlinked directories are not entered; symlinked files
/// are yielded, and so are dangling links, which then fail to read.
pub fn files_in<'a>(
    root: &'a Path,
    extensions: &'a [String],
) -> Box<dyn Iterator<Item = Result<PathBuf, ParseError>> + 'a> {
    if root.is_file() {
        let matched = has_extension(root, extensions).then(|| Ok(root.to_path_buf()));
        return Box::new(matched.into_iter());
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();
    Box::new(walker.filter_map(move |entry| match entry {
        Ok(entry) => {
            if is_candidate(&entry) && has_extension(entry.path(), extensions) {
                Some(Ok(entry.into_path()))
            } else {
                None
            }
        }
        Err(err) => {
            let path = err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            Some(Err(ParseError::Walk { path, source: err }))
        }
    }))
}

fn is_candidate(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && !entry.path().is_dir())
}

/// Whether the file name ends with any of the (dot-prefixed) extensions.
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy();
    extensions.iter().any(|ext| name.ends_with(ext.as_str()))
}

/// `php` → `.php`; already dotted extensions are kept.
pub fn normalize_extension(extension: &str) -> String {
    if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    }
}

/// Substring matcher over configured exclude paths.
#[derive(Debug, Clone)]
pub struct ExclusionMatcher {
    automaton: Option<AhoCorasick>,
}

impl ExclusionMatcher {
    pub fn new<P: AsRef<Path>>(excluded: &[P]) -> Self {
        if excluded.is_empty() {
            return Self { automaton: None };
        }
        let patterns: Vec<String> = excluded
            .iter()
            .map(|p| p.as_ref().to_string_lossy().into_owned())
            .collect();
        Self {
            automaton: Some(AhoCorasick::new(patterns)),
        }
    }

    /// True when any exclude path occurs anywhere in `path`.
    pub fn is_excluded(&self, path: &Path) -> bool {
        match &self.automaton {
            Some(automaton) => automaton.is_match(path.to_string_lossy().as_ref()),
            None => false,
        }
    }
}
