//! Set name type
//!
//! Each set lives in its own table. Identifiers cannot be bound as
//! statement parameters, and SQLite folds their ASCII case, so the table
//! identifier is derived from the name rather than being the name itself:
//! a fixed prefix followed by the lowercase hex of the name's bytes. Names
//! that differ only in case get different tables.
//!
//! ## Validation
//!
//! Set names must:
//! - Be non-empty
//! - Not contain the identifier-quoting character `"`
//! - Not contain NUL

use std::fmt;

/// The identifier-quoting character of the backing query language
pub const QUOTE_CHAR: char = '"';

/// Prefix of every set table identifier
pub const TABLE_PREFIX: &str = "set_";

/// Validated name of a set
///
/// ## Examples
///
/// Valid names:
/// - "males"
/// - "all books"
/// - "5 and 7"
///
/// Invalid names:
/// - "" (empty)
/// - "fo\"o"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SetName(String);

/// Error when validating a set name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// Name is empty
    Empty,
    /// Name contains the identifier-quoting character
    ContainsQuote {
        /// Byte offset of the first quote
        position: usize,
    },
    /// Name contains a NUL character
    ContainsNul {
        /// Byte offset of the first NUL
        position: usize,
    },
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::Empty => write!(f, "set name cannot be empty"),
            NameError::ContainsQuote { position } => write!(
                f,
                "set name contains double quotes at position {}",
                position
            ),
            NameError::ContainsNul { position } => {
                write!(f, "set name contains NUL at position {}", position)
            }
        }
    }
}

impl std::error::Error for NameError {}

impl SetName {
    /// Create a new SetName, validating the input
    ///
    /// # Errors
    ///
    /// Returns `NameError` if the name is invalid.
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(SetName(name))
    }

    /// Validate a set name
    pub fn validate(name: &str) -> Result<(), NameError> {
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if let Some(position) = name.find(QUOTE_CHAR) {
            return Err(NameError::ContainsQuote { position });
        }
        if let Some(position) = name.find('\0') {
            return Err(NameError::ContainsNul { position });
        }
        Ok(())
    }

    /// Get the name as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the table holding this set, as the catalog lists it
    ///
    /// Distinct names always map to distinct tables, including names that
    /// differ only in case.
    pub fn table_name(&self) -> String {
        let hex: String = self.0.bytes().map(|b| format!("{:02x}", b)).collect();
        format!("{}{}", TABLE_PREFIX, hex)
    }

    /// [`table_name`](Self::table_name) quoted, ready to embed in a statement
    pub fn table_ident(&self) -> String {
        format!("{q}{}{q}", self.table_name(), q = QUOTE_CHAR)
    }

    /// Consume and return the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for SetName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for SetName {
    type Error = NameError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        SetName::new(s)
    }
}

impl TryFrom<String> for SetName {
    type Error = NameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        SetName::new(s)
    }
}
