//! Repository lifecycle, import, and integrity checking.

use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use reelvault_catalog::{Collection, Item};
use reelvault_db::{CatalogDb, SchemaError, StoreError};
use thiserror::Error;

use crate::hasher;

/// Catalog database file name inside a repository.
pub const DB_FILE: &str = "catalog.db";
/// Blob store directory name inside a repository.
pub const STORE_DIR: &str = "store";

/// Extensions accepted by import, lowercase, no leading dot.
const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "avi", "wmv", "mkv", "webm", "mov"];

/// Tag attached to freshly imported collections until their metadata is
/// filled in.
const INCOMPLETE_TAG: &str = "incomplete";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("file store is missing or not a directory at {0}")]
    StoreFolder(PathBuf),
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("unsupported file type: {0}")]
    Unsupported(PathBuf),
}

/// One finding from the integrity check, relative to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// Cataloged item with no blob in the store.
    MissingBlob { hash: String },
    /// Blob in the store with no cataloged item.
    OrphanBlob { hash: String },
    /// Blob present but under a different extension than cataloged.
    ExtensionMismatch {
        hash: String,
        db_ext: String,
        store_ext: String,
    },
    /// Blob whose content no longer matches its path-derived hash.
    HashMismatch { expected: String, actual: String },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::MissingBlob { hash } => {
                write!(f, "store: file not found in store: {hash}")
            }
            IntegrityIssue::OrphanBlob { hash } => {
                write!(f, "store: redundant file in store: {hash}")
            }
            IntegrityIssue::ExtensionMismatch {
                hash,
                db_ext,
                store_ext,
            } => write!(
                f,
                "ext: {hash} is '{db_ext}' in catalog but '{store_ext}' in store"
            ),
            IntegrityIssue::HashMismatch { expected, actual } => {
                write!(f, "hash: expected {expected}, but content hashes to {actual}")
            }
        }
    }
}

/// An open repository: catalog database plus blob store directory.
#[derive(Debug)]
pub struct Repo {
    root: PathBuf,
    db: CatalogDb,
}

impl Repo {
    /// Open a repository, creating it when absent.
    ///
    /// A missing repository gets its directory tree and a fresh catalog. An
    /// existing one must have a `store/` directory, and its catalog must
    /// pass the schema validation gate — corruption aborts the open rather
    /// than degrading.
    pub fn open(root: &Path) -> Result<Self, RepoError> {
        fs::create_dir_all(root)?;
        let db_path = root.join(DB_FILE);
        let store_path = root.join(STORE_DIR);

        if db_path.is_file() {
            if !store_path.is_dir() {
                return Err(RepoError::StoreFolder(store_path));
            }
        } else {
            fs::create_dir_all(&store_path)?;
        }

        let db = CatalogDb::connect(&db_path)?;
        Ok(Self {
            root: root.to_path_buf(),
            db,
        })
    }

    /// All collections in the catalog.
    pub fn collections(&mut self) -> Result<Vec<Collection>, RepoError> {
        Ok(self.db.get_collections()?)
    }

    /// Import a file, or recursively every supported file under a directory.
    ///
    /// Returns the number of files imported. During a directory import,
    /// unsupported and duplicate files are logged and skipped; for a single
    /// file they are hard errors. I/O failures always abort.
    pub fn import(&mut self, path: &Path) -> Result<usize, RepoError> {
        if !path.exists() {
            return Err(RepoError::FileNotFound(path.to_path_buf()));
        }
        if path.is_dir() {
            self.import_dir(path)
        } else {
            self.import_file(path)?;
            Ok(1)
        }
    }

    fn import_dir(&mut self, dir: &Path) -> Result<usize, RepoError> {
        let mut imported = 0;
        let mut pending = VecDeque::new();
        pending.push_front(dir.to_path_buf());
        while let Some(current) = pending.pop_front() {
            for entry in fs::read_dir(&current)? {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push_front(path);
                    continue;
                }
                match self.import_file(&path) {
                    Ok(()) => imported += 1,
                    Err(err @ (RepoError::Io(_) | RepoError::Schema(_))) => return Err(err),
                    Err(RepoError::Store(StoreError::Sqlite(err))) => {
                        return Err(StoreError::Sqlite(err).into());
                    }
                    Err(err) => {
                        // Unsupported files and duplicates don't stop a bulk
                        // import.
                        log::warn!("skipping {}: {err}", path.display());
                    }
                }
            }
        }
        Ok(imported)
    }

    fn import_file(&mut self, file: &Path) -> Result<(), RepoError> {
        let ext = file
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .filter(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| RepoError::Unsupported(file.to_path_buf()))?;

        let hash = hasher::hash_file(file)?;
        let title = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| hash.clone());

        // Catalog first so a duplicate is rejected before the blob moves.
        let item = Item::new(hash.clone(), ext.clone());
        let collection_id = self.db.insert_collection(&title, &[item])?;
        let tag_id = self.db.ensure_tag(INCOMPLETE_TAG)?;
        self.db.tag_collection(collection_id, tag_id)?;

        let shard = self.root.join(STORE_DIR).join(&hash[..2]);
        fs::create_dir_all(&shard)?;
        let dest = shard.join(format!("{}.{}", &hash[2..], ext));
        move_file(file, &dest)?;

        log::info!("imported {} as {hash}", file.display());
        Ok(())
    }

    /// Exhaustively diff the catalog against the store tree.
    ///
    /// Re-hashes every blob, so this is slow on large repositories; run it
    /// on demand, not routinely. An empty result means the repository is
    /// healthy.
    pub fn check_integrity(&mut self) -> Result<Vec<IntegrityIssue>, RepoError> {
        let db_items = self.db.all_items()?;

        let mut store_files = Vec::new();
        let mut issues = Vec::new();
        scan_store(&self.root.join(STORE_DIR), &mut store_files, &mut issues)?;
        store_files.sort();

        // Both sides are sorted by hash; walk them together.
        let mut db_iter = db_items.iter().peekable();
        let mut store_iter = store_files.iter().peekable();
        loop {
            match (db_iter.peek(), store_iter.peek()) {
                (Some(item), Some((store_hash, store_ext))) => {
                    if item.hash() == store_hash {
                        if item.ext() != store_ext {
                            issues.push(IntegrityIssue::ExtensionMismatch {
                                hash: store_hash.clone(),
                                db_ext: item.ext().to_string(),
                                store_ext: store_ext.clone(),
                            });
                        }
                        db_iter.next();
                        store_iter.next();
                    } else if item.hash() < store_hash.as_str() {
                        issues.push(IntegrityIssue::MissingBlob {
                            hash: item.hash().to_string(),
                        });
                        db_iter.next();
                    } else {
                        issues.push(IntegrityIssue::OrphanBlob {
                            hash: store_hash.clone(),
                        });
                        store_iter.next();
                    }
                }
                (Some(item), None) => {
                    issues.push(IntegrityIssue::MissingBlob {
                        hash: item.hash().to_string(),
                    });
                    db_iter.next();
                }
                (None, Some((store_hash, _))) => {
                    issues.push(IntegrityIssue::OrphanBlob {
                        hash: store_hash.clone(),
                    });
                    store_iter.next();
                }
                (None, None) => break,
            }
        }

        Ok(issues)
    }
}

/// Rename, falling back to copy-and-remove across filesystem boundaries.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(err) => Err(err),
    }
}

/// Walk the store tree, collecting `(hash, ext)` per blob and flagging blobs
/// whose content no longer matches their path-derived hash.
fn scan_store(
    dir: &Path,
    found: &mut Vec<(String, String)>,
    issues: &mut Vec<IntegrityIssue>,
) -> Result<(), RepoError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            scan_store(&path, found, issues)?;
            continue;
        }

        let shard = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let expected_hash = format!("{shard}{stem}");

        let actual_hash = hasher::hash_file(&path)?;
        if expected_hash != actual_hash {
            issues.push(IntegrityIssue::HashMismatch {
                expected: expected_hash.clone(),
                actual: actual_hash,
            });
        }

        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        found.push((expected_hash, ext));
    }
    Ok(())
}
