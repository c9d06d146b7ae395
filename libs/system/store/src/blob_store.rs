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
use anyhow::{bail, ensure, Result};
use log::debug;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fs,
    io::{Read, Write},
    path::PathBuf,
};

/// Required contract for a URL-addressed blob store: `s3://`, `https://`,
/// or `file://` URLs, with "/"-joined path segments and the last segment
/// taken as the file name. Writes are idempotent, keyed by URL; concurrent
/// writers to the same URL are a caller error, not a store error.
pub trait BlobStore: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
    fn put(&self, url: &str, bytes: &[u8]) -> Result<()>;
    fn exists(&self, url: &str) -> bool;
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
    fn delete(&self, url: &str, ignore_errors: bool) -> Result<()>;

    /// Return a local path containing the bytes at `url`, downloading and
    /// caching it under `category` if this store does not already live on
    /// local disk. The default implementation always materializes the blob
    /// fresh; `CachingBlobStore` is the decorator that actually reuses a
    /// local copy across calls.
    fn get_cached(&self, url: &str, category: Option<&str>) -> Result<PathBuf>;
}

fn strip_scheme(url: &str) -> &str {
    for scheme in ["file://", "s3://", "https://", "http://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            return rest;
        }
    }
    url
}

/// A blob store rooted at a local directory. Grounds every URL at a
/// `file://`-ish path under `root`; `s3://`/`https://` URLs are accepted
/// syntactically (so callers don't have to branch on scheme) but are mapped
/// into the same local tree, which only makes sense for local testing and
/// single-machine pipeline runs.
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn local_path(&self, url: &str) -> PathBuf {
        let rest = strip_scheme(url).trim_start_matches('/');
        self.root.join(rest)
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let path = self.local_path(url);
        let mut fp = fs::File::open(&path)?;
        let mut content = Vec::new();
        fp.read_to_end(&mut content)?;
        Ok(content)
    }

    fn put(&self, url: &str, bytes: &[u8]) -> Result<()> {
        let path = self.local_path(url);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut fp = fs::File::create(&path)?;
        fp.write_all(bytes)?;
        Ok(())
    }

    fn exists(&self, url: &str) -> bool {
        self.local_path(url).exists()
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = self.local_path(prefix);
        let mut out = Vec::new();
        if !dir.is_dir() {
            return Ok(out);
        }
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            out.push(format!("{}/{}", prefix.trim_end_matches('/'), name));
        }
        out.sort();
        Ok(out)
    }

    fn delete(&self, url: &str, ignore_errors: bool) -> Result<()> {
        let path = self.local_path(url);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if ignore_errors => {
                debug!("delete({}) ignored: {}", url, e);
                Ok(())
            }
            Err(e) => bail!("delete {}: {}", url, e),
        }
    }

    fn get_cached(&self, url: &str, _category: Option<&str>) -> Result<PathBuf> {
        let path = self.local_path(url);
        ensure!(path.is_file(), "blob not resident locally: {}", url);
        Ok(path)
    }
}

/// Decorates any `BlobStore` with a local file cache for `get_cached`,
/// keyed by URL under a `category` subdirectory. This is the piece that
/// lets the Sparse Chunked Raster's disk-backed LRU mode, and the texture
/// baker's source-image reads, avoid re-fetching the same URL on every
/// chunk miss.
pub struct CachingBlobStore<S> {
    inner: S,
    cache_dir: PathBuf,
    resident: Mutex<HashMap<String, PathBuf>>,
}

impl<S: BlobStore> CachingBlobStore<S> {
    pub fn new(inner: S, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            cache_dir: cache_dir.into(),
            resident: Mutex::new(HashMap::new()),
        }
    }

    fn cache_path(&self, url: &str, category: Option<&str>) -> PathBuf {
        let mut dir = self.cache_dir.clone();
        if let Some(cat) = category {
            dir.push(cat);
        }
        let name = url.rsplit('/').next().unwrap_or(url);
        dir.join(name)
    }
}

impl<S: BlobStore> BlobStore for CachingBlobStore<S> {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.inner.get(url)
    }

    fn put(&self, url: &str, bytes: &[u8]) -> Result<()> {
        self.inner.put(url, bytes)
    }

    fn exists(&self, url: &str) -> bool {
        self.inner.exists(url)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list(prefix)
    }

    fn delete(&self, url: &str, ignore_errors: bool) -> Result<()> {
        self.resident.lock().remove(url);
        self.inner.delete(url, ignore_errors)
    }

    fn get_cached(&self, url: &str, category: Option<&str>) -> Result<PathBuf> {
        if let Some(path) = self.resident.lock().get(url) {
            if path.is_file() {
                return Ok(path.clone());
            }
        }
        let dest = self.cache_path(url, category);
        if !dest.is_file() {
            let bytes = self.inner.get(url)?;
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&dest, &bytes)?;
        }
        self.resident.lock().insert(url.to_owned(), dest.clone());
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile_shim::TempDir;

    mod tempfile_shim {
        use std::path::PathBuf;
        pub struct TempDir(pub PathBuf);
        impl TempDir {
            pub fn new(tag: &str) -> Self {
                let mut p = std::env::temp_dir();
                p.push(format!(
                    "store-test-{}-{}-{}",
                    tag,
                    std::process::id(),
                    rand_suffix()
                ));
                std::fs::create_dir_all(&p).unwrap();
                TempDir(p)
            }
            pub fn path(&self) -> &std::path::Path {
                &self.0
            }
        }
        impl Drop for TempDir {
            fn drop(&mut self) {
                let _ = std::fs::remove_dir_all(&self.0);
            }
        }
        fn rand_suffix() -> u64 {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .subsec_nanos() as u64
        }
    }

    #[test]
    fn put_get_roundtrip() -> Result<()> {
        let dir = TempDir::new("blob");
        let store = FileBlobStore::new(dir.path());
        store.put("file://tiles/root.b3dm", b"hello")?;
        assert!(store.exists("file://tiles/root.b3dm"));
        assert_eq!(store.get("file://tiles/root.b3dm")?, b"hello");
        Ok(())
    }

    #[test]
    fn delete_missing_ignores_errors() -> Result<()> {
        let dir = TempDir::new("blob2");
        let store = FileBlobStore::new(dir.path());
        assert!(store.delete("file://nope", true).is_ok());
        assert!(store.delete("file://nope", false).is_err());
        Ok(())
    }

    #[test]
    fn caching_store_reuses_local_copy() -> Result<()> {
        let backing = TempDir::new("blob3-backing");
        let cache = TempDir::new("blob3-cache");
        let inner = FileBlobStore::new(backing.path());
        inner.put("file://images/a.png", b"pixels")?;
        let caching = CachingBlobStore::new(inner, cache.path());
        let p1 = caching.get_cached("file://images/a.png", Some("images"))?;
        let p2 = caching.get_cached("file://images/a.png", Some("images"))?;
        assert_eq!(p1, p2);
        assert_eq!(fs::read(&p1)?, b"pixels");
        Ok(())
    }

    #[test]
    fn list_returns_sorted_children() -> Result<()> {
        let dir = TempDir::new("blob4");
        let store = FileBlobStore::new(dir.path());
        store.put("file://tiles/0.b3dm", b"a")?;
        store.put("file://tiles/1.b3dm", b"b")?;
        let names = store.list("file://tiles")?;
        assert_eq!(names, vec!["file://tiles/0.b3dm", "file://tiles/1.b3dm"]);
        Ok(())
    }
}
