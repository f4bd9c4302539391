//! Local `.tar.gz` packing and unpacking. Blocking; run on a blocking thread.

use crate::ignore::IgnoreSet;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use heron_core::error::TransferError;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tar::Builder;
use tracing::debug;
use walkdir::WalkDir;

/// Packs the contents of `source_root` (not the root itself) into `archive_path`.
///
/// Symlinks are skipped. Returns the number of regular files written.
pub fn create_archive(
    source_root: &Path,
    archive_path: &Path,
    ignore: &IgnoreSet,
) -> Result<usize, TransferError> {
    if !source_root.is_dir() {
        return Err(TransferError::NotADirectory(source_root.to_path_buf()));
    }

    let mut entries: Vec<(PathBuf, bool)> = Vec::new();
    let walker = WalkDir::new(source_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| match entry.path().strip_prefix(source_root) {
            Ok(rel) => rel.as_os_str().is_empty() || !ignore.is_ignored(rel),
            Err(_) => false,
        });

    for entry in walker {
        let entry = entry.map_err(|err| archive_error("failed to walk directory", err))?;
        let rel = entry
            .path()
            .strip_prefix(source_root)
            .map_err(|err| archive_error("failed to compute relative path", err))?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            debug!(path = %rel.display(), "skipping symlink");
            continue;
        }
        if file_type.is_dir() || file_type.is_file() {
            entries.push((rel.to_path_buf(), file_type.is_dir()));
        }
    }
    entries.sort();

    let file = File::create(archive_path)?;
    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
    let mut files = 0;

    for (rel, is_dir) in entries {
        let src = source_root.join(&rel);
        if is_dir {
            builder
                .append_dir(&rel, &src)
                .map_err(|err| archive_error("failed to add directory", err))?;
        } else {
            builder
                .append_path_with_name(&src, &rel)
                .map_err(|err| archive_error("failed to add file", err))?;
            files += 1;
        }
    }

    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(|err| archive_error("failed to finish archive", err))?;
    Ok(files)
}

/// Unpacks `archive_path` into `dest_dir`, creating it if needed.
///
/// Entries that would land outside `dest_dir` are skipped by `unpack_in`.
pub fn unpack_archive(archive_path: &Path, dest_dir: &Path) -> Result<(), TransferError> {
    let file = File::open(archive_path)?;
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(GzDecoder::new(file));
    for entry in archive
        .entries()
        .map_err(|err| archive_error("failed to read archive entries", err))?
    {
        let mut entry = entry.map_err(|err| archive_error("corrupt archive entry", err))?;
        entry
            .unpack_in(dest_dir)
            .map_err(|err| archive_error("failed to extract entry", err))?;
    }
    Ok(())
}

/// Empties `dir` without removing it. A missing directory is fine.
pub fn clear_dir(dir: &Path) -> Result<(), TransferError> {
    if !dir.exists() {
        return Ok(());
    }
    if !dir.is_dir() {
        fs::remove_file(dir)?;
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// True when `dir` is missing or has no entries.
pub fn is_empty_or_missing(dir: &Path) -> Result<bool, TransferError> {
    if !dir.exists() {
        return Ok(true);
    }
    if !dir.is_dir() {
        return Ok(false);
    }
    Ok(fs::read_dir(dir)?.next().is_none())
}

fn archive_error(context: &str, err: impl std::fmt::Display) -> TransferError {
    TransferError::Archive(format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn packs_and_restores_nested_tree_without_ignored_entries() {
        let src = tempfile::tempdir().unwrap();
        write(src.path(), "main.py", "print('hi')");
        write(src.path(), "pkg/util.py", "X = 1");
        write(src.path(), "pkg/__pycache__/util.pyc", "bytes");
        write(src.path(), ".git/HEAD", "ref: main");
        write(src.path(), "heron_runs/old/execution.log", "old");
        fs::create_dir_all(src.path().join("empty")).unwrap();

        let out = tempfile::tempdir().unwrap();
        let archive = out.path().join("a.tar.gz");
        let files = create_archive(src.path(), &archive, &IgnoreSet::default()).unwrap();
        assert_eq!(files, 2);

        let dest = out.path().join("restored");
        unpack_archive(&archive, &dest).unwrap();

        assert_eq!(fs::read_to_string(dest.join("pkg/util.py")).unwrap(), "X = 1");
        assert!(dest.join("main.py").is_file());
        assert!(dest.join("empty").is_dir());
        assert!(!dest.join(".git").exists());
        assert!(!dest.join("heron_runs").exists());
        assert!(!dest.join("pkg/__pycache__").exists());
    }

    #[test]
    fn empty_directory_yields_a_valid_archive() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let archive = out.path().join("a.tar.gz");

        assert_eq!(create_archive(src.path(), &archive, &IgnoreSet::empty()).unwrap(), 0);
        unpack_archive(&archive, &out.path().join("dest")).unwrap();
        assert!(is_empty_or_missing(&out.path().join("dest")).unwrap());
    }

    #[test]
    fn source_must_be_a_directory() {
        let out = tempfile::tempdir().unwrap();
        let file = out.path().join("f");
        fs::write(&file, "x").unwrap();

        let err = create_archive(&file, &out.path().join("a.tar.gz"), &IgnoreSet::empty())
            .unwrap_err();
        assert!(matches!(err, TransferError::NotADirectory(_)));
    }

    #[test]
    fn clear_dir_keeps_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/b.txt", "x");
        write(dir.path(), "c.txt", "y");

        clear_dir(dir.path()).unwrap();
        assert!(dir.path().is_dir());
        assert!(is_empty_or_missing(dir.path()).unwrap());
    }
}
