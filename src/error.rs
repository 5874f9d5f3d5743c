/// Custom Result type for extraction operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the extractor, encompassing all possible error cases
/// that can occur while inspecting an archive and writing its derived output.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors related to the contents (or absence) of an archive
    #[error("Error reading archive: {0}")]
    ArchiveError(#[from] ArchiveError),

    /// Unrecoverable configuration mistakes
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Bad command-line usage
    #[error("Usage error: {0}")]
    UsageError(#[from] UsageError),

    /// Standard I/O errors (typically writing to stdout)
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),
}
impl Error {
    /// Checks if the error only concerns the current archive
    ///
    /// Recoverable errors cause the current file to be skipped during a directory
    /// walk. Everything else terminates the run.
    ///
    /// # Returns
    ///
    /// * `true` for every [`ArchiveError`] except [`ArchiveError::Unsupported`]
    /// * `false` for all other error types
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ArchiveError(err) => err.is_recoverable(),
            _ => false,
        }
    }

    /// Checks if the error is a usage error (reported with the usage text)
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::UsageError(_))
    }
}

/// Errors encountered while inspecting a single archive
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    /// The file is not a valid archive of the expected format
    #[error("Unable to open {path} as an archive: {reason}")]
    Unreadable { path: String, reason: String },

    /// An expected named section is missing for the requested mode or pass
    #[error("Section not present: {0}")]
    SectionAbsent(String),

    /// A node exists but lacks the requested attribute
    #[error("Attribute '{key}' missing on {path}")]
    AttributeMissing { path: String, key: String },

    /// An attribute exists but cannot be coerced to the requested type
    #[error("Attribute '{key}' on {path} is not {expected}")]
    AttributeType {
        path: String,
        key: String,
        expected: &'static str,
    },

    /// A table lacks a named column
    #[error("Field '{field}' missing from table {path}")]
    FieldMissing { path: String, field: String },

    /// A table column holds values of an unexpected type
    #[error("Field '{field}' in table {path} is not {expected}")]
    FieldType {
        path: String,
        field: String,
        expected: &'static str,
    },

    /// A row references an index outside of a table
    #[error("Index {index} out of range for table {path} ({len} rows)")]
    IndexOutOfRange {
        path: String,
        index: i64,
        len: usize,
    },

    /// The archive holds no read records
    #[error("No reads found under {0}")]
    NoReads(String),

    /// The archive holds more than one read where exactly one was expected
    #[error("Expected a single read but found {0}")]
    MultipleReads(usize),

    /// The archive backend is unavailable in this build
    #[error("Archive backend unavailable: {0}")]
    Unsupported(String),
}
impl ArchiveError {
    pub fn absent<S: Into<String>>(section: S) -> Self {
        Self::SectionAbsent(section.into())
    }

    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// Checks if the error means the archive could not be opened at all
    #[must_use]
    pub fn is_unreadable(&self) -> bool {
        matches!(self, Self::Unreadable { .. })
    }
}

/// Configuration errors are never recovered
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The running median needs an odd, non-zero window
    #[error("median window size must be odd (got {0})")]
    EvenWindow(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum UsageError {
    /// The requested output mode is not one of the known modes
    #[error("Incorrect dataType '{0}'")]
    UnknownMode(String),

    /// The output mode only works on a single archive
    #[error("{0} output only works for single files")]
    DirectoryInput(&'static str),

    /// The input is neither a file nor a directory
    #[error("No file or directory found at '{0}'")]
    MissingPath(String),
}
