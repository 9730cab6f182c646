//! Declarations, their locations, and the cross-file collision map.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::token::Keyword;

/// Namespace a declared name lives in. PHP rejects a second class, interface,
/// trait or enum of the same name, so all four share [`DeclarationGroup::Type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeclarationGroup {
    Type,
    Function,
    Constant,
}

impl DeclarationGroup {
    /// Group declared by a keyword, if the keyword declares anything.
    pub fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Class | Keyword::Interface | Keyword::Trait | Keyword::Enum => {
                Some(DeclarationGroup::Type)
            }
            Keyword::Function => Some(DeclarationGroup::Function),
            Keyword::Const => Some(DeclarationGroup::Constant),
            Keyword::Namespace | Keyword::Use => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationGroup::Type => "type",
            DeclarationGroup::Function => "function",
            DeclarationGroup::Constant => "constant",
        }
    }
}

impl fmt::Display for DeclarationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A top-level declaration found in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub group: DeclarationGroup,
    /// Namespace-qualified name, e.g. `Foo\Bar`.
    pub name: String,
    /// Line of the declaring keyword.
    pub line: usize,
}

/// Where a declaration occurred.
///
/// Ordering is by path, then line, using plain byte-wise string comparison.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    pub file_path: String,
    pub line: usize,
}

impl Location {
    pub fn new(file_path: impl Into<String>, line: usize) -> Self {
        Self {
            file_path: file_path.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_path, self.line)
    }
}

/// Strip `base_dir` from `path` when it is a whole-segment prefix and use
/// `/` as the only separator.
pub fn normalize_path(path: &Path, base_dir: &Path) -> String {
    let relative = path.strip_prefix(base_dir).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

/// Accumulates declarations from every scanned file.
#[derive(Debug, Default)]
pub struct CollisionAggregator {
    groups: HashMap<DeclarationGroup, HashMap<String, Vec<Location>>>,
}

impl CollisionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file_path: &str, declaration: Declaration) {
        self.groups
            .entry(declaration.group)
            .or_default()
            .entry(declaration.name)
            .or_default()
            .push(Location::new(file_path, declaration.line));
    }

    /// Record all declarations of one file, keeping their order.
    pub fn add_file(&mut self, file_path: &str, declarations: Vec<Declaration>) {
        for declaration in declarations {
            self.add(file_path, declaration);
        }
    }

    /// Keep names declared at least twice, with locations sorted.
    pub fn finish(self) -> CollisionMap {
        let mut groups = BTreeMap::new();
        for (group, names) in self.groups {
            let colliding: BTreeMap<String, Vec<Location>> = names
                .into_iter()
                .filter(|(_, locations)| locations.len() > 1)
                .map(|(name, mut locations)| {
                    locations.sort();
                    (name, locations)
                })
                .collect();
            if !colliding.is_empty() {
                groups.insert(group, colliding);
            }
        }
        CollisionMap { groups }
    }
}

/// Names declared more than once, per group and sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CollisionMap {
    groups: BTreeMap<DeclarationGroup, BTreeMap<String, Vec<Location>>>,
}

impl CollisionMap {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of colliding names across all groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.values().map(BTreeMap::len).sum()
    }

    pub fn group(&self, group: DeclarationGroup) -> Option<&BTreeMap<String, Vec<Location>>> {
        self.groups.get(&group)
    }

    pub fn get(&self, group: DeclarationGroup, name: &str) -> Option<&[Location]> {
        self.groups
            .get(&group)
            .and_then(|names| names.get(name))
            .map(Vec::as_slice)
    }

    /// Collisions in report order: types, functions, constants, then by name.
    pub fn iter(&self) -> impl Iterator<Item = (DeclarationGroup, &str, &[Location])> {
        self.groups.iter().flat_map(|(group, names)| {
            names
                .iter()
                .map(move |(name, locations)| (*group, name.as_str(), locations.as_slice()))
        })
    }
}
