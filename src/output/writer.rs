// src/output/writer.rs
// =============================================================================
// Writes a rendered collection to disk.
//
// Layout under the output root:
//   issues/issue_0001_....txt
//   issues/_index.txt
//   discussions/discussion_0001_....txt
//   discussions/_index.txt
//
// Files are overwritten on every run. Only called once a collection has been
// fetched completely, so a failed fetch leaves nothing half-written.
// =============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::filename::item_filename;
use crate::error::{ExportError, Result};
use crate::model::{Item, ItemKind, RepoCoords};
use crate::render::{render_index, render_item, Counts};

pub const INDEX_FILE: &str = "_index.txt";

// What write_collection did, for the final summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub kind: ItemKind,
    pub directory: PathBuf,
    pub files_written: usize,
    pub counts: Counts,
}

pub fn write_collection(
    root: &Path,
    kind: ItemKind,
    repo: &RepoCoords,
    items: &[Item],
    generated_at: &str,
) -> Result<WriteSummary> {
    let directory = root.join(kind.plural());
    fs::create_dir_all(&directory).map_err(|source| ExportError::Io {
        path: directory.clone(),
        source,
    })?;

    for item in items {
        let path = directory.join(item_filename(item));
        write_file(&path, &render_item(item))?;
        debug!(path = %path.display(), "wrote item");
    }

    let index_path = directory.join(INDEX_FILE);
    write_file(&index_path, &render_index(kind, repo, items, generated_at))?;

    Ok(WriteSummary {
        kind,
        directory,
        files_written: items.len(),
        counts: Counts::of(items),
    })
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{comment, issue};
    use tempfile::TempDir;

    fn repo() -> RepoCoords {
        RepoCoords::new("molstar", "molstar")
    }

    #[test]
    fn test_writes_items_and_index() {
        let root = TempDir::new().unwrap();
        let mut second = issue(2, "Second: with comments");
        second.comments.push(comment("alice", "hello"));
        let items = vec![issue(1, "First"), second];

        let summary =
            write_collection(root.path(), ItemKind::Issue, &repo(), &items, "2024-06-01").unwrap();

        assert_eq!(summary.files_written, 2);
        assert_eq!(summary.directory, root.path().join("issues"));
        assert_eq!(summary.counts.total, 2);

        let mut names: Vec<String> = fs::read_dir(&summary.directory)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "_index.txt".to_string(),
                "issue_0001_First.txt".to_string(),
                "issue_0002_Second_ with comments.txt".to_string(),
            ]
        );

        let text = fs::read_to_string(summary.directory.join("issue_0002_Second_ with comments.txt")).unwrap();
        assert_eq!(text, render_item(&items[1]));
        let index = fs::read_to_string(summary.directory.join(INDEX_FILE)).unwrap();
        assert!(index.contains("Total issues: 2"));
    }

    #[test]
    fn test_rerun_overwrites() {
        let root = TempDir::new().unwrap();
        let mut item = issue(1, "Same");
        write_collection(root.path(), ItemKind::Issue, &repo(), &[item.clone()], "t1").unwrap();

        item.body = Some("updated body".to_string());
        write_collection(root.path(), ItemKind::Issue, &repo(), &[item], "t2").unwrap();

        let dir = root.path().join("issues");
        let text = fs::read_to_string(dir.join("issue_0001_Same.txt")).unwrap();
        assert!(text.contains("updated body"));
        let index = fs::read_to_string(dir.join(INDEX_FILE)).unwrap();
        assert!(index.contains("Generated: t2"));
    }

    #[test]
    fn test_empty_collection_still_gets_an_index() {
        let root = TempDir::new().unwrap();
        let summary =
            write_collection(root.path(), ItemKind::Discussion, &repo(), &[], "now").unwrap();
        assert_eq!(summary.files_written, 0);
        let index = fs::read_to_string(root.path().join("discussions").join(INDEX_FILE)).unwrap();
        assert!(index.contains("Total discussions: 0"));
    }
}
