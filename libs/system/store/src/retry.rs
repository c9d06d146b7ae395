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
use crate::blob_store::BlobStore;
use anyhow::Result;
use std::{path::PathBuf, thread, time::Duration};
use tracing::warn;

#[derive(Copy, Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            backoff_multiplier: 2,
        }
    }
}

impl RetryPolicy {
    fn run<T>(&self, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if attempt >= self.max_attempts => return Err(e),
                Err(e) => {
                    warn!(attempt, error = %e, "BlobIO failed, retrying after backoff");
                    thread::sleep(backoff);
                    backoff *= self.backoff_multiplier;
                    attempt += 1;
                }
            }
        }
    }
}

/// Wraps a `BlobStore` so that I/O failures (`BlobIO` in the error-kind
/// taxonomy) are retried with exponential backoff before bubbling up to
/// the caller, per the blob store's retry contract.
pub struct RetryingBlobStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: BlobStore> RetryingBlobStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<S: BlobStore> BlobStore for RetryingBlobStore<S> {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.policy.run(|| self.inner.get(url))
    }

    fn put(&self, url: &str, bytes: &[u8]) -> Result<()> {
        self.policy.run(|| self.inner.put(url, bytes))
    }

    fn exists(&self, url: &str) -> bool {
        self.inner.exists(url)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.policy.run(|| self.inner.list(prefix))
    }

    fn delete(&self, url: &str, ignore_errors: bool) -> Result<()> {
        self.policy.run(|| self.inner.delete(url, ignore_errors))
    }

    fn get_cached(&self, url: &str, category: Option<&str>) -> Result<PathBuf> {
        self.policy.run(|| self.inner.get_cached(url, category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::FileBlobStore;
    use std::time::Duration;

    #[test]
    fn succeeds_immediately_when_inner_succeeds() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("store-retry-{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        let inner = FileBlobStore::new(&dir);
        inner.put("file://a", b"x")?;
        let retrying = RetryingBlobStore::new(
            inner,
            RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(1),
                backoff_multiplier: 1,
            },
        );
        assert_eq!(retrying.get("file://a")?, b"x");
        std::fs::remove_dir_all(&dir).ok();
        Ok(())
    }

    #[test]
    fn exhausts_attempts_and_bubbles_error() {
        let dir = std::env::temp_dir().join(format!("store-retry-missing-{}", std::process::id()));
        let inner = FileBlobStore::new(&dir);
        let retrying = RetryingBlobStore::new(
            inner,
            RetryPolicy {
                max_attempts: 2,
                initial_backoff: Duration::from_millis(1),
                backoff_multiplier: 1,
            },
        );
        assert!(retrying.get("file://missing").is_err());
    }
}
