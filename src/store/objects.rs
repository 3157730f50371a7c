use super::{StoreError, StoreResult};
use std::path::PathBuf;

/// Blob storage addressed by slash-separated paths.
pub trait ObjectStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> StoreResult<()>;
    fn download_url(&self, path: &str) -> StoreResult<String>;
    fn delete(&self, path: &str) -> StoreResult<()>;
}

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> StoreResult<PathBuf> {
        let mut out = self.root.clone();
        let mut any = false;
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(StoreError::InvalidPath(path.to_string()));
            }
            out.push(segment);
            any = true;
        }
        if !any {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(out)
    }
}

impl ObjectStore for FsObjectStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> StoreResult<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, bytes)?;
        Ok(())
    }

    fn download_url(&self, path: &str) -> StoreResult<String> {
        let target = self.resolve(path)?;
        if !target.is_file() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        Ok(format!("file://{}", target.to_string_lossy()))
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        let target = self.resolve(path)?;
        match std::fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn upload_url_delete_cycle() {
        let root = temp_dir("classroomd-objects");
        let store = FsObjectStore::new(&root);
        let path = "prim1/curriculum/unit1/lesson.pdf";

        assert!(matches!(
            store.download_url(path),
            Err(StoreError::NotFound(_))
        ));
        store.upload(path, b"%PDF-1.4").expect("upload");
        let url = store.download_url(path).expect("url");
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("lesson.pdf"));

        store.delete(path).expect("delete");
        store.delete(path).expect("delete missing");
        assert!(!root.join(path).exists());

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn traversal_is_rejected() {
        let store = FsObjectStore::new(std::env::temp_dir());
        assert!(store.upload("../escape.txt", b"x").is_err());
        assert!(store.upload("a//b", b"x").is_err());
        assert!(store.download_url("").is_err());
    }
}
