//! An opened workspace directory: the document database, the object
//! folder and the local preference file.

use crate::local::LocalStore;
use crate::repo::{GradeRepo, StagesRepo};
use crate::store::{FsObjectStore, SqliteStore};
use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const OBJECTS_DIR: &str = "objects";
/// Version of the sidecar that first initialized the workspace database.
pub const CREATED_WITH_KEY: &str = "createdWith";

pub struct Workspace {
    pub path: PathBuf,
    pub store: SqliteStore,
    pub objects: FsObjectStore,
    pub local: LocalStore,
    defaulters_refreshed: HashMap<String, Instant>,
}

impl Workspace {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("create workspace {}", path.display()))?;
        let store = SqliteStore::open(path)?;
        if store.meta_get(CREATED_WITH_KEY)?.is_none() {
            store.meta_set(CREATED_WITH_KEY, env!("CARGO_PKG_VERSION"))?;
        }
        let objects_root = path.join(OBJECTS_DIR);
        std::fs::create_dir_all(&objects_root)
            .with_context(|| format!("create {}", objects_root.display()))?;
        let local = LocalStore::open(path).context("open local store")?;
        tracing::info!(workspace = %path.display(), "workspace opened");
        Ok(Self {
            path: path.to_path_buf(),
            store,
            objects: FsObjectStore::new(objects_root),
            local,
            defaulters_refreshed: HashMap::new(),
        })
    }

    pub fn grade(&self, grade: &str) -> GradeRepo<'_> {
        GradeRepo::new(&self.store, grade)
    }

    pub fn stages(&self) -> StagesRepo<'_> {
        StagesRepo::new(&self.store)
    }

    /// Whether a grade's defaulters were recomputed within `max_age`.
    pub fn defaulters_fresh(&self, grade: &str, max_age: std::time::Duration) -> bool {
        self.defaulters_refreshed
            .get(grade)
            .map(|t| t.elapsed() < max_age)
            .unwrap_or(false)
    }

    pub fn mark_defaulters_refreshed(&mut self, grade: &str) {
        self.defaulters_refreshed
            .insert(grade.to_string(), Instant::now());
    }

    pub fn forget_defaulters_refresh(&mut self) {
        self.defaulters_refreshed.clear();
    }
}
