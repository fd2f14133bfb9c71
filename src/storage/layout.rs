use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use crate::core::error::Result;
use crate::core::types::PodKey;

/// Directory structure for data files
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,      // Root directory
    pub pods_dir: PathBuf,      // <owner>/<device>/<lang>/<class>.{vec,pos}
    pub registry_dir: PathBuf,  // Document registry snapshot
}

impl StorageLayout {
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        let pods_dir = base_dir.join("pods");
        let registry_dir = base_dir.join("registry");

        fs::create_dir_all(&pods_dir)?;
        fs::create_dir_all(&registry_dir)?;

        Ok(StorageLayout {
            base_dir,
            pods_dir,
            registry_dir,
        })
    }

    pub fn pod_dir(&self, pod: &PodKey) -> PathBuf {
        let [owner, device, language, _] = pod.path_components();
        self.pods_dir.join(owner).join(device).join(language)
    }

    pub fn vector_path(&self, pod: &PodKey) -> PathBuf {
        self.pod_dir(pod).join(format!("{}.vec", pod.permission.as_str()))
    }

    pub fn index_path(&self, pod: &PodKey) -> PathBuf {
        self.pod_dir(pod).join(format!("{}.pos", pod.permission.as_str()))
    }

    pub fn registry_path(&self) -> PathBuf {
        self.registry_dir.join("registry.bin")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join(".lock")
    }

    /// A pod exists once its vector store file does; the index file may lag behind
    pub fn pod_exists(&self, pod: &PodKey) -> bool {
        self.vector_path(pod).exists()
    }
}

/// Replace `path` with `data` in one rename so readers never see a half-written file
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PermissionClass;

    #[test]
    fn test_pod_paths() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().to_path_buf()).unwrap();
        let pod = PodKey::new("f00d", "phone", "en", PermissionClass::Group);

        assert_eq!(layout.vector_path(&pod), dir.path().join("pods/f00d/phone/en/group.vec"));
        assert_eq!(layout.index_path(&pod), dir.path().join("pods/f00d/phone/en/group.pos"));
        assert!(!layout.pod_exists(&pod));
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file.bin");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }
}
