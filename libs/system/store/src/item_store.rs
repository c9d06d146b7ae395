// This file is part of Nitrogen.
//
// Nitrogen is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Nitrogen is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Nitrogen.  If not, see <http://www.gnu.org/licenses/>.
use anyhow::{bail, Result};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::{collections::HashMap, fs, path::PathBuf};

/// Key-value persistence for Tile, Frame, Observation, and other project
/// records. Items are addressed by a hash key plus an optional range key,
/// e.g. `("tile", Some("0123"))`. Concurrent create races resolve "last
/// write wins"; `find_or_create` is the canonical way to avoid losing a
/// concurrent insert.
pub trait ItemStore: Send + Sync {
    fn save<T: Serialize>(&self, hash_key: &str, range_key: Option<&str>, item: &T) -> Result<()>;
    fn load<T: DeserializeOwned>(&self, hash_key: &str, range_key: Option<&str>) -> Result<Option<T>>;
    fn scan<T: DeserializeOwned>(
        &self,
        hash_key: &str,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<T>>;
    fn delete(&self, hash_key: &str, range_key: Option<&str>, ignore_errors: bool) -> Result<()>;

    /// Save `item` only if no record exists yet for this key; on a lost
    /// create race, re-load and return what won instead of erroring.
    fn find_or_create<T: Serialize + DeserializeOwned + Clone>(
        &self,
        hash_key: &str,
        range_key: Option<&str>,
        item: T,
    ) -> Result<T> {
        if let Some(existing) = self.load::<T>(hash_key, range_key)? {
            return Ok(existing);
        }
        self.save(hash_key, range_key, &item)?;
        Ok(self
            .load::<T>(hash_key, range_key)?
            .unwrap_or(item))
    }
}

fn record_path(root: &PathBuf, hash_key: &str, range_key: Option<&str>) -> PathBuf {
    let mut p = root.join(hash_key);
    p.push(format!("{}.json", range_key.unwrap_or("_")));
    p
}

/// An `ItemStore` backed by one JSON document per record under
/// `root/<hash_key>/<range_key>.json`. Good enough for a single-machine
/// pipeline run; a production deployment would swap this for a database
/// client behind the same trait.
pub struct FileItemStore {
    root: PathBuf,
    lock: RwLock<()>,
}

impl FileItemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: RwLock::new(()),
        }
    }

    fn scan_raw(&self, hash_key: &str) -> Result<Vec<serde_json::Value>> {
        let dir = self.root.join(hash_key);
        let mut out = Vec::new();
        if !dir.is_dir() {
            return Ok(out);
        }
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = fs::read_to_string(entry.path())?;
            out.push(serde_json::from_str(&text)?);
        }
        Ok(out)
    }
}

impl ItemStore for FileItemStore {
    fn save<T: Serialize>(&self, hash_key: &str, range_key: Option<&str>, item: &T) -> Result<()> {
        let _guard = self.lock.write();
        let path = record_path(&self.root, hash_key, range_key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(item)?;
        fs::write(&path, text)?;
        Ok(())
    }

    fn load<T: DeserializeOwned>(&self, hash_key: &str, range_key: Option<&str>) -> Result<Option<T>> {
        let _guard = self.lock.read();
        let path = record_path(&self.root, hash_key, range_key);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn scan<T: DeserializeOwned>(
        &self,
        hash_key: &str,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<T>> {
        let _guard = self.lock.read();
        let mut out = Vec::new();
        for value in self.scan_raw(hash_key)? {
            if let Some((key, expected)) = filter {
                let matches = value
                    .get(key)
                    .and_then(|v| v.as_str())
                    .map(|s| s == expected)
                    .unwrap_or(false);
                if !matches {
                    continue;
                }
            }
            out.push(serde_json::from_value(value)?);
        }
        Ok(out)
    }

    fn delete(&self, hash_key: &str, range_key: Option<&str>, ignore_errors: bool) -> Result<()> {
        let _guard = self.lock.write();
        let path = record_path(&self.root, hash_key, range_key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(_) if ignore_errors => Ok(()),
            Err(e) => bail!("delete {}/{:?}: {}", hash_key, range_key, e),
        }
    }
}

/// An in-memory `ItemStore`, useful for unit tests that exercise the
/// scheduler/master state machine without touching disk.
#[derive(Default)]
pub struct MemoryItemStore {
    records: RwLock<HashMap<(String, Option<String>), serde_json::Value>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemStore for MemoryItemStore {
    fn save<T: Serialize>(&self, hash_key: &str, range_key: Option<&str>, item: &T) -> Result<()> {
        let value = serde_json::to_value(item)?;
        self.records
            .write()
            .insert((hash_key.to_owned(), range_key.map(String::from)), value);
        Ok(())
    }

    fn load<T: DeserializeOwned>(&self, hash_key: &str, range_key: Option<&str>) -> Result<Option<T>> {
        let records = self.records.read();
        match records.get(&(hash_key.to_owned(), range_key.map(String::from))) {
            Some(v) => Ok(Some(serde_json::from_value(v.clone())?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(
        &self,
        hash_key: &str,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<T>> {
        let records = self.records.read();
        let mut out = Vec::new();
        for ((hk, _), value) in records.iter() {
            if hk != hash_key {
                continue;
            }
            if let Some((key, expected)) = filter {
                let matches = value
                    .get(key)
                    .and_then(|v| v.as_str())
                    .map(|s| s == expected)
                    .unwrap_or(false);
                if !matches {
                    continue;
                }
            }
            out.push(serde_json::from_value(value.clone())?);
        }
        Ok(out)
    }

    fn delete(&self, hash_key: &str, range_key: Option<&str>, ignore_errors: bool) -> Result<()> {
        let removed = self
            .records
            .write()
            .remove(&(hash_key.to_owned(), range_key.map(String::from)));
        if removed.is_none() && !ignore_errors {
            bail!("no such record: {}/{:?}", hash_key, range_key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TileRecord {
        id: String,
        depth: u32,
    }

    #[test]
    fn save_load_roundtrip_memory() -> Result<()> {
        let store = MemoryItemStore::new();
        let rec = TileRecord { id: "0123".into(), depth: 4 };
        store.save("tile", Some("0123"), &rec)?;
        let loaded: Option<TileRecord> = store.load("tile", Some("0123"))?;
        assert_eq!(loaded, Some(rec));
        Ok(())
    }

    #[test]
    fn scan_filters_by_field() -> Result<()> {
        let store = MemoryItemStore::new();
        store.save("tile", Some("0"), &TileRecord { id: "0".into(), depth: 0 })?;
        store.save("tile", Some("1"), &TileRecord { id: "1".into(), depth: 1 })?;
        let shallow: Vec<TileRecord> = store.scan("tile", Some(("id", "0")))?;
        assert_eq!(shallow, vec![TileRecord { id: "0".into(), depth: 0 }]);
        Ok(())
    }

    #[test]
    fn find_or_create_returns_existing() -> Result<()> {
        let store = MemoryItemStore::new();
        let first = store.find_or_create("tile", Some("root"), TileRecord { id: "root".into(), depth: 0 })?;
        let second = store.find_or_create("tile", Some("root"), TileRecord { id: "root".into(), depth: 99 })?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn delete_missing_without_ignore_errors() {
        let store = MemoryItemStore::new();
        assert!(ItemStore::delete(&store, "tile", Some("nope"), false).is_err());
        assert!(ItemStore::delete(&store, "tile", Some("nope"), true).is_ok());
    }
}
