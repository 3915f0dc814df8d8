//! Attachment discovery on the local file system.
//!
//! Layout: `<root>/<SourceID>/<file>`. Each immediate subdirectory of the root
//! is one [`AttachmentGroup`] named after the record it belongs to. Loose files
//! at the root and directories nested inside a group are ignored.

use std::path::{Path, PathBuf};

use migration::{AttachmentCatalog, AttachmentGroup, SourceId, StoreError};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AttachmentCatalog for DirectoryCatalog {
    fn groups(&self) -> Result<Vec<AttachmentGroup>, StoreError> {
        if !self.root.is_dir() {
            return Err(StoreError::AttachmentsRootMissing {
                path: self.root.clone(),
            });
        }
        info!(root = %self.root.display(), "scanning attachments");

        let mut groups = Vec::new();
        for dir in sorted_entries(&self.root)? {
            if !dir.is_dir() {
                continue;
            }
            let Some(source_id) = folder_source_id(&dir) else {
                warn!(folder = %dir.display(), "folder name is not a usable source id; skipping");
                continue;
            };

            // An unreadable group is skipped; the rest of the scan continues.
            let files = match sorted_entries(&dir) {
                Ok(entries) => entries.into_iter().filter(|p| p.is_file()).collect(),
                Err(e) => {
                    error!(folder = %dir.display(), error = %e, "cannot read attachment folder");
                    continue;
                }
            };
            groups.push(AttachmentGroup { source_id, files });
        }

        info!(groups = groups.len(), "attachment groups found");
        Ok(groups)
    }
}

fn folder_source_id(dir: &Path) -> Option<SourceId> {
    dir.file_name()
        .and_then(|n| n.to_str())
        .and_then(SourceId::new)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let io_error = |source: std::io::Error| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = std::fs::read_dir(dir)
        .map_err(io_error)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error)?;
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn groups_follow_the_id_per_folder_layout() {
        let root = tempfile::tempdir().unwrap();
        let p = root.path();
        fs::create_dir_all(p.join("101/nested")).unwrap();
        fs::create_dir_all(p.join("102")).unwrap();
        fs::create_dir_all(p.join("103")).unwrap();
        fs::write(p.join("101/b.png"), b"b").unwrap();
        fs::write(p.join("101/a.pdf"), b"a").unwrap();
        fs::write(p.join("101/nested/deep.txt"), b"x").unwrap();
        fs::write(p.join("102/log.txt"), b"l").unwrap();
        fs::write(p.join("loose.txt"), b"ignored").unwrap();

        let groups = DirectoryCatalog::new(p).groups().unwrap();

        let ids: Vec<&str> = groups.iter().map(|g| g.source_id.as_str()).collect();
        assert_eq!(ids, vec!["101", "102", "103"]);
        assert_eq!(groups[0].files, vec![p.join("101/a.pdf"), p.join("101/b.png")]);
        assert_eq!(groups[1].files, vec![p.join("102/log.txt")]);
        assert!(groups[2].files.is_empty());
    }

    #[test]
    fn blank_folder_names_are_not_groups() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("   ")).unwrap();
        fs::create_dir_all(root.path().join("55")).unwrap();

        let groups = DirectoryCatalog::new(root.path()).groups().unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].source_id.as_str(), "55");
        assert!(folder_source_id(&root.path().join("   ")).is_none());
    }

    #[test]
    fn missing_root_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let err = DirectoryCatalog::new(root.path().join("attachments"))
            .groups()
            .unwrap_err();
        assert!(matches!(err, StoreError::AttachmentsRootMissing { .. }));
    }

    #[test]
    fn a_file_in_place_of_the_root_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("attachments");
        fs::write(&file, b"").unwrap();

        assert!(matches!(
            DirectoryCatalog::new(file).groups(),
            Err(StoreError::AttachmentsRootMissing { .. })
        ));
    }
}
