//! Hierarchical archive access
//!
//! The extractor never talks to a storage library directly. Everything it needs
//! from a fast5 file goes through the [`Archive`] trait: existence checks, group
//! listings, attribute lookup and bulk loading of whole datasets into memory.
//!
//! Two implementations are provided:
//! 1. [`MemoryArchive`] keeps every node in memory and is built programmatically
//! 2. `Hdf5Archive` (behind the `hdf5` feature) reads real fast5 files

use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use auto_impl::auto_impl;

use crate::error::ArchiveError;

#[cfg(feature = "hdf5")]
mod h5;
mod memory;

#[cfg(feature = "hdf5")]
pub use h5::{Hdf5Archive, Hdf5Source};
pub use memory::{MemoryArchive, MemoryArchiveBuilder};

/// Custom Result type for archive lookups
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// A scalar attribute attached to a group or dataset
///
/// Fast5 writers are inconsistent about attribute types (the channel number is
/// a string in some files and an integer in others), so the numeric accessors
/// coerce between variants where the conversion is lossless.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
}
impl AttrValue {
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Self::Float(_) => None,
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_))
    }
}
impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}
impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}
impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}
impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// A single cell of a compound dataset
///
/// Single precision members keep their stored width so their text form is the
/// shortest one that round-trips through `f32`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float32(f32),
    Float(f64),
    Text(String),
}
impl Value {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            Self::Float32(v) => Some(f64::from(*v)),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            Self::Float32(v) if v.fract() == 0.0 => Some(*v as i64),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Self::Float32(_) | Self::Float(_) | Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Writes the value in its CSV text form
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Self::Int(v) => writer.write_all(itoa::Buffer::new().format(*v).as_bytes()),
            Self::UInt(v) => writer.write_all(itoa::Buffer::new().format(*v).as_bytes()),
            Self::Float32(v) => write!(writer, "{v:?}"),
            Self::Float(v) => write!(writer, "{v:?}"),
            Self::Text(s) => writer.write_all(s.as_bytes()),
        }
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}
impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// A compound dataset loaded into memory, one row per record
///
/// Field order follows the order of the members in the stored record type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    path: String,
    fields: Vec<String>,
    rows: Vec<Vec<Value>>,
}
impl Table {
    pub fn new<S: Into<String>>(path: S, fields: Vec<String>) -> Self {
        Self {
            path: path.into(),
            fields,
            rows: Vec::new(),
        }
    }

    /// Appends a row
    ///
    /// # Panics
    ///
    /// Panics if the row width does not match the number of fields
    pub fn push_row(&mut self, row: Vec<Value>) {
        assert_eq!(row.len(), self.fields.len());
        self.rows.push(row);
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn set_path<S: Into<String>>(&mut self, path: S) {
        self.path = path.into();
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the column position of a named field
    pub fn field_index(&self, field: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f == field)
            .ok_or_else(|| ArchiveError::FieldMissing {
                path: self.path.clone(),
                field: field.to_string(),
            })
    }

    /// Returns a numeric cell as `f64`
    pub fn f64_at(&self, row: usize, col: usize) -> Result<f64> {
        self.cell(row, col)?
            .as_f64()
            .ok_or_else(|| self.type_error(col, "numeric"))
    }

    /// Returns an integer cell as `i64`
    pub fn i64_at(&self, row: usize, col: usize) -> Result<i64> {
        self.cell(row, col)?
            .as_i64()
            .ok_or_else(|| self.type_error(col, "an integer"))
    }

    /// Returns a cell in its text form
    pub fn str_at(&self, row: usize, col: usize) -> Result<&str> {
        self.cell(row, col)?
            .as_str()
            .ok_or_else(|| self.type_error(col, "a string"))
    }

    fn cell(&self, row: usize, col: usize) -> Result<&Value> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .ok_or_else(|| ArchiveError::IndexOutOfRange {
                path: self.path.clone(),
                index: row as i64,
                len: self.rows.len(),
            })
    }

    fn type_error(&self, col: usize, expected: &'static str) -> ArchiveError {
        ArchiveError::FieldType {
            path: self.path.clone(),
            field: self.fields.get(col).cloned().unwrap_or_default(),
            expected,
        }
    }
}

/// Read-only access to a hierarchical archive
///
/// Paths are absolute, `/`-separated node names (`/Raw/Reads/Read_12/Signal`).
#[auto_impl(&, Box)]
pub trait Archive {
    /// Returns true if a group or dataset exists at `path`
    fn exists(&self, path: &str) -> bool;

    /// Lists the member names of the group at `path`, sorted
    fn children(&self, path: &str) -> Result<Vec<String>>;

    /// Looks up an attribute by key on the node at `path`
    fn attr(&self, path: &str, key: &str) -> Result<AttrValue>;

    /// Loads a compound dataset
    fn table(&self, path: &str) -> Result<Table>;

    /// Loads a one-dimensional sample dataset
    fn signal(&self, path: &str) -> Result<Vec<u16>>;

    /// Loads a scalar string dataset
    fn text(&self, path: &str) -> Result<String>;

    fn attr_i64(&self, path: &str, key: &str) -> Result<i64> {
        self.attr(path, key)?
            .as_i64()
            .ok_or_else(|| ArchiveError::AttributeType {
                path: path.to_string(),
                key: key.to_string(),
                expected: "an integer",
            })
    }

    fn attr_f64(&self, path: &str, key: &str) -> Result<f64> {
        self.attr(path, key)?
            .as_f64()
            .ok_or_else(|| ArchiveError::AttributeType {
                path: path.to_string(),
                key: key.to_string(),
                expected: "numeric",
            })
    }

    fn attr_string(&self, path: &str, key: &str) -> Result<String> {
        self.attr(path, key).map(|v| v.to_string())
    }

    /// Looks up an attribute that may legitimately be missing
    fn attr_opt(&self, path: &str, key: &str) -> Result<Option<AttrValue>> {
        match self.attr(path, key) {
            Ok(value) => Ok(Some(value)),
            Err(ArchiveError::AttributeMissing { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Opens archives from paths on disk
pub trait ArchiveSource {
    type Archive: Archive;

    fn open(&self, path: &Path) -> Result<Self::Archive>;
}

/// The archive source used by the command-line tool
///
/// The `hdf5` feature is on by default. A `--no-default-features` build has no
/// backend able to read fast5 files, and every open fails with
/// [`ArchiveError::Unsupported`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSource;

#[cfg(feature = "hdf5")]
impl ArchiveSource for DefaultSource {
    type Archive = Hdf5Archive;

    fn open(&self, path: &Path) -> Result<Self::Archive> {
        Hdf5Source.open(path)
    }
}

#[cfg(not(feature = "hdf5"))]
impl ArchiveSource for DefaultSource {
    type Archive = MemoryArchive;

    fn open(&self, _path: &Path) -> Result<Self::Archive> {
        Err(ArchiveError::Unsupported(
            "built without HDF5 support, rebuild with `--features hdf5`".to_string(),
        ))
    }
}
