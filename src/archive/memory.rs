use std::collections::{BTreeMap, BTreeSet};

use super::{Archive, AttrValue, Result, Table};
use crate::error::ArchiveError;

#[derive(Debug, Clone, PartialEq)]
enum Dataset {
    Table(Table),
    Signal(Vec<u16>),
    Text(String),
}

/// An archive held entirely in memory
///
/// Groups are implicit: every ancestor of a stored dataset or attribute exists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryArchive {
    datasets: BTreeMap<String, Dataset>,
    attrs: BTreeMap<String, BTreeMap<String, AttrValue>>,
}
impl MemoryArchive {
    #[must_use]
    pub fn builder() -> MemoryArchiveBuilder {
        MemoryArchiveBuilder::default()
    }

    fn node_paths(&self) -> impl Iterator<Item = &String> {
        self.datasets.keys().chain(self.attrs.keys())
    }

    fn dataset(&self, path: &str) -> Result<&Dataset> {
        self.datasets
            .get(&normalize(path))
            .ok_or_else(|| ArchiveError::absent(path))
    }
}

impl Archive for MemoryArchive {
    fn exists(&self, path: &str) -> bool {
        let path = normalize(path);
        if path == "/" {
            return true;
        }
        let prefix = format!("{path}/");
        self.node_paths().any(|p| *p == path || p.starts_with(&prefix))
    }

    fn children(&self, path: &str) -> Result<Vec<String>> {
        let path = normalize(path);
        if !self.exists(&path) {
            return Err(ArchiveError::absent(path));
        }
        let prefix = if path == "/" {
            path.clone()
        } else {
            format!("{path}/")
        };
        let names = self
            .node_paths()
            .filter_map(|p| p.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>();
        Ok(names.into_iter().collect())
    }

    fn attr(&self, path: &str, key: &str) -> Result<AttrValue> {
        let norm = normalize(path);
        if !self.exists(&norm) {
            return Err(ArchiveError::absent(path));
        }
        self.attrs
            .get(&norm)
            .and_then(|attrs| attrs.get(key))
            .cloned()
            .ok_or_else(|| ArchiveError::AttributeMissing {
                path: norm,
                key: key.to_string(),
            })
    }

    fn table(&self, path: &str) -> Result<Table> {
        match self.dataset(path)? {
            Dataset::Table(table) => Ok(table.clone()),
            _ => Err(ArchiveError::absent(format!("{path} (compound dataset)"))),
        }
    }

    fn signal(&self, path: &str) -> Result<Vec<u16>> {
        match self.dataset(path)? {
            Dataset::Signal(signal) => Ok(signal.clone()),
            _ => Err(ArchiveError::absent(format!("{path} (signal dataset)"))),
        }
    }

    fn text(&self, path: &str) -> Result<String> {
        match self.dataset(path)? {
            Dataset::Text(text) => Ok(text.clone()),
            _ => Err(ArchiveError::absent(format!("{path} (string dataset)"))),
        }
    }
}

/// Builder for [`MemoryArchive`]
#[derive(Debug, Clone, Default)]
pub struct MemoryArchiveBuilder {
    inner: MemoryArchive,
}
impl MemoryArchiveBuilder {
    #[must_use]
    pub fn attr<V: Into<AttrValue>>(mut self, path: &str, key: &str, value: V) -> Self {
        self.inner
            .attrs
            .entry(normalize(path))
            .or_default()
            .insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn table(mut self, path: &str, mut table: Table) -> Self {
        let path = normalize(path);
        table.set_path(path.clone());
        self.inner.datasets.insert(path, Dataset::Table(table));
        self
    }

    #[must_use]
    pub fn signal(mut self, path: &str, signal: Vec<u16>) -> Self {
        self.inner
            .datasets
            .insert(normalize(path), Dataset::Signal(signal));
        self
    }

    #[must_use]
    pub fn text<S: Into<String>>(mut self, path: &str, text: S) -> Self {
        self.inner
            .datasets
            .insert(normalize(path), Dataset::Text(text.into()));
        self
    }

    #[must_use]
    pub fn build(self) -> MemoryArchive {
        self.inner
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{trimmed}")
}
