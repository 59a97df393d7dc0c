use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Verrou consultatif exclusif sur un fichier `.lock` voisin de l'archive.
///
/// Partagé entre processus ; libéré à la destruction.
pub struct ArchiveLock {
    file: File,
    path: PathBuf,
}

pub fn lock_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

impl ArchiveLock {
    /// Bloque tant qu'un autre détenteur garde le verrou.
    pub fn acquire(target: &Path) -> Result<Self> {
        let path = lock_path(target);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Impossible d'ouvrir le verrou {:?}", path))?;
        FileExt::lock_exclusive(&file)
            .with_context(|| format!("Impossible de verrouiller {:?}", path))?;
        log::debug!("Verrou acquis : {:?}", path);
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArchiveLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("Échec de la libération du verrou {:?} : {}", self.path, e);
        }
    }
}
