//! Last-used source and cached source bytes
//!
//! The store keeps `state.json` with the last source that loaded
//! successfully and a single cached copy of source bytes. The bytes live
//! next to it in a file named after the md5 digest of the source id.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::render::LoadError;

const APP_DIR: &str = "pagepinch";
const STATE_FILE: &str = "state.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSource {
    pub source_id: String,
    pub file_name: String,
    pub stored_at: DateTime<Utc>,
    #[serde(default)]
    pub len: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    last_source: Option<String>,
    #[serde(default)]
    last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    cached: Option<CachedSource>,
}

pub struct SourceStore {
    state: StoreState,
    dir: Option<PathBuf>,
    /// Cached bytes of an ephemeral store
    memory: Option<Vec<u8>>,
}

impl SourceStore {
    pub fn ephemeral() -> Self {
        Self {
            state: StoreState::default(),
            dir: None,
            memory: None,
        }
    }

    /// `<cache_dir>/pagepinch`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join(APP_DIR))
    }

    /// Open the store in `dir`, creating it if needed.
    pub fn with_dir(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)?;
        let state_path = dir.join(STATE_FILE);
        let state = if state_path.exists() {
            let content = fs::read_to_string(&state_path)?;
            serde_json::from_str(&content)?
        } else {
            StoreState::default()
        };
        Ok(Self {
            state,
            dir: Some(dir.to_path_buf()),
            memory: None,
        })
    }

    pub fn load_or_ephemeral(dir: Option<&Path>) -> Self {
        match dir {
            Some(dir) => Self::with_dir(dir).unwrap_or_else(|e| {
                error!("Failed to open source store in {}: {e}", dir.display());
                Self::ephemeral()
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        match &self.dir {
            Some(dir) => {
                let content = serde_json::to_string_pretty(&self.state)?;
                fs::write(dir.join(STATE_FILE), content)?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn last_source(&self) -> Option<&str> {
        self.state.last_source.as_deref()
    }

    pub fn last_used(&self) -> Option<DateTime<Utc>> {
        self.state.last_used
    }

    pub fn cached(&self) -> Option<&CachedSource> {
        self.state.cached.as_ref()
    }

    /// Remember `source_id` as the last source that loaded.
    pub fn set_last_source(&mut self, source_id: &str) {
        self.state.last_source = Some(source_id.to_string());
        self.state.last_used = Some(Utc::now());
        if let Err(e) = self.save() {
            error!("Failed to save source store: {e}");
        }
    }

    /// Cached bytes for `source_id`, if that is the source held in cache.
    pub fn cached_bytes(&self, source_id: &str) -> Option<Vec<u8>> {
        let cached = self.state.cached.as_ref()?;
        if cached.source_id != source_id {
            return None;
        }
        match &self.dir {
            Some(dir) => fs::read(dir.join(&cached.file_name))
                .map_err(|e| debug!("Cached bytes for {source_id} unreadable: {e}"))
                .ok(),
            None => self.memory.clone(),
        }
    }

    /// Replace the cached copy with `bytes` for `source_id`.
    pub fn store_bytes(&mut self, source_id: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let file_name = cache_file_name(source_id);
        match &self.dir {
            Some(dir) => {
                if let Some(old) = &self.state.cached {
                    if old.file_name != file_name {
                        let _ = fs::remove_file(dir.join(&old.file_name));
                    }
                }
                fs::write(dir.join(&file_name), bytes)?;
            }
            None => self.memory = Some(bytes.to_vec()),
        }
        self.state.cached = Some(CachedSource {
            source_id: source_id.to_string(),
            file_name,
            stored_at: Utc::now(),
            len: bytes.len(),
        });
        self.save()
    }
}

fn cache_file_name(source_id: &str) -> String {
    format!("{:x}.bin", md5::compute(source_id.as_bytes()))
}

/// Produces source bytes for an identifier
pub trait SourceFetcher {
    fn fetch(&self, source_id: &str) -> Result<Vec<u8>, LoadError>;
}

/// Reads sources from the local filesystem
#[derive(Debug, Default)]
pub struct FileFetcher;

impl SourceFetcher for FileFetcher {
    fn fetch(&self, source_id: &str) -> Result<Vec<u8>, LoadError> {
        fs::read(source_id).map_err(|e| LoadError::fetch(source_id, e.to_string()))
    }
}

#[derive(Debug)]
pub struct ResolvedSource {
    pub bytes: Vec<u8>,
    pub from_cache: bool,
}

/// Find the bytes for `source_id`.
///
/// The cached copy is used only when `allow_cache` is set and `source_id` is
/// the last source used; callers clear `allow_cache` once a document has been
/// loaded. Fetched bytes replace the cached copy.
pub fn resolve_source(
    store: &mut SourceStore,
    fetcher: &dyn SourceFetcher,
    source_id: &str,
    allow_cache: bool,
) -> Result<ResolvedSource, LoadError> {
    if allow_cache && store.last_source() == Some(source_id) {
        if let Some(bytes) = store.cached_bytes(source_id) {
            info!("Using cached copy of {source_id} ({} bytes)", bytes.len());
            return Ok(ResolvedSource {
                bytes,
                from_cache: true,
            });
        }
    }

    let bytes = fetcher.fetch(source_id)?;
    info!("Fetched {source_id} ({} bytes)", bytes.len());
    if let Err(e) = store.store_bytes(source_id, &bytes) {
        error!("Failed to cache {source_id}: {e}");
    }
    Ok(ResolvedSource {
        bytes,
        from_cache: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingFetcher {
        bytes: Vec<u8>,
        calls: Cell<usize>,
    }

    impl CountingFetcher {
        fn new(bytes: &[u8]) -> Self {
            Self {
                bytes: bytes.to_vec(),
                calls: Cell::new(0),
            }
        }
    }

    impl SourceFetcher for CountingFetcher {
        fn fetch(&self, _source_id: &str) -> Result<Vec<u8>, LoadError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.bytes.clone())
        }
    }

    #[test]
    fn cache_hit_requires_last_source() {
        let mut store = SourceStore::ephemeral();
        let fetcher = CountingFetcher::new(b"fresh");
        store.store_bytes("a.pdf", b"cached").unwrap();

        // Not the last source yet
        let resolved = resolve_source(&mut store, &fetcher, "a.pdf", true).unwrap();
        assert!(!resolved.from_cache);
        assert_eq!(fetcher.calls.get(), 1);

        store.set_last_source("a.pdf");
        let resolved = resolve_source(&mut store, &fetcher, "a.pdf", true).unwrap();
        assert!(resolved.from_cache);
        assert_eq!(resolved.bytes, b"fresh");
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn cache_is_skipped_when_not_allowed() {
        let mut store = SourceStore::ephemeral();
        let fetcher = CountingFetcher::new(b"fresh");
        store.store_bytes("a.pdf", b"cached").unwrap();
        store.set_last_source("a.pdf");

        let resolved = resolve_source(&mut store, &fetcher, "a.pdf", false).unwrap();
        assert!(!resolved.from_cache);
        assert_eq!(resolved.bytes, b"fresh");
        assert_eq!(store.cached_bytes("a.pdf").unwrap(), b"fresh");
    }

    #[test]
    fn other_source_is_fetched() {
        let mut store = SourceStore::ephemeral();
        let fetcher = CountingFetcher::new(b"b bytes");
        store.store_bytes("a.pdf", b"a bytes").unwrap();
        store.set_last_source("a.pdf");

        let resolved = resolve_source(&mut store, &fetcher, "b.pdf", true).unwrap();
        assert!(!resolved.from_cache);
        assert_eq!(store.cached().unwrap().source_id, "b.pdf");
        assert!(store.cached_bytes("a.pdf").is_none());
    }

    #[test]
    fn store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = SourceStore::with_dir(dir.path()).unwrap();
            store.store_bytes("doc.pdf", b"%PDF-1.4").unwrap();
            store.set_last_source("doc.pdf");
        }

        let store = SourceStore::with_dir(dir.path()).unwrap();
        assert_eq!(store.last_source(), Some("doc.pdf"));
        assert!(store.last_used().is_some());
        assert_eq!(store.cached_bytes("doc.pdf").unwrap(), b"%PDF-1.4");
        assert_eq!(store.cached().unwrap().len, 8);
        assert!(dir.path().join(cache_file_name("doc.pdf")).exists());
    }

    #[test]
    fn replacing_cache_removes_old_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SourceStore::with_dir(dir.path()).unwrap();
        store.store_bytes("one", b"1").unwrap();
        store.store_bytes("two", b"2").unwrap();

        assert!(!dir.path().join(cache_file_name("one")).exists());
        assert!(dir.path().join(cache_file_name("two")).exists());
    }

    #[test]
    fn file_fetcher_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pdf");
        let source = path.to_string_lossy();

        let result = FileFetcher.fetch(&source);
        assert!(matches!(result, Err(LoadError::Fetch { .. })));

        fs::write(&path, b"bytes").unwrap();
        assert_eq!(FileFetcher.fetch(&source).unwrap(), b"bytes");
    }

    #[test]
    fn corrupt_state_file_falls_back_to_ephemeral() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STATE_FILE), "not json").unwrap();

        assert!(SourceStore::with_dir(dir.path()).is_err());
        let store = SourceStore::load_or_ephemeral(Some(dir.path()));
        assert!(store.last_source().is_none());
    }
}
