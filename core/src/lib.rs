//! Name collision detection for PHP source trees.
//!
//! PHP has no compile-time check that a class, function or constant is
//! declared only once; a duplicate surfaces as a fatal "Cannot redeclare"
//! error when both files get loaded. This crate finds such duplicates
//! statically: every file is tokenized, a small state machine picks out the
//! top-level declarations, and the declarations of all files are merged into
//! a per-group map of names declared more than once.

pub mod collision;
pub mod config;
pub mod detector;
pub mod error;
pub mod files;
pub mod lexer;
pub mod scanner;
pub mod token;

pub use collision::{
    CollisionAggregator, CollisionMap, Declaration, DeclarationGroup, Location,
};
pub use config::{ConfigFile, DetectionConfig, DEFAULT_CONFIG_FILE};
pub use detector::{declarations_in_file, CollisionDetector, DetectionResult};
pub use error::{ConfigError, DetectionError, LexError, ParseError};
pub use lexer::tokenize;
pub use scanner::{scan_declarations, DeclarationScanner};
pub use token::{Keyword, Token, TokenKind};
