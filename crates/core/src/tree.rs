//! Wholesale replacement of the output subtree.

use std::io;
use std::path::Path;

use tracing::debug;

/// Replace `dst` with a full copy of `src`.
///
/// The old `dst` is removed first, so paths deleted upstream since the
/// previous commit do not survive. Returns the number of files copied.
pub fn replace_tree(src: &Path, dst: &Path) -> io::Result<usize> {
    if dst.exists() {
        std::fs::remove_dir_all(dst)?;
        debug!(path = %dst.display(), "removed previous output tree");
    }
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let copied = copy_tree(src, dst)?;
    debug!(src = %src.display(), dst = %dst.display(), files = copied, "copied tree");
    Ok(copied)
}

fn copy_tree(src: &Path, dst: &Path) -> io::Result<usize> {
    std::fs::create_dir_all(dst)?;
    let mut copied = 0;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if file_type.is_dir() {
            copied += copy_tree(&src_path, &dst_path)?;
        } else if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
            copied += 1;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let target = std::fs::read_link(src)?;
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::fs::copy(src, dst).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_tree_drops_stale_files() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let dst = out.path().join("src");

        std::fs::create_dir_all(src.path().join("a/b")).unwrap();
        std::fs::write(src.path().join("a/b/deep.txt"), "deep").unwrap();
        std::fs::write(src.path().join("top.txt"), "new").unwrap();

        std::fs::create_dir_all(dst.join("old_dir")).unwrap();
        std::fs::write(dst.join("old_dir/old.txt"), "old").unwrap();
        std::fs::write(dst.join("top.txt"), "old").unwrap();

        let copied = replace_tree(src.path(), &dst).unwrap();
        assert_eq!(copied, 2);
        assert_eq!(std::fs::read_to_string(dst.join("top.txt")).unwrap(), "new");
        assert_eq!(std::fs::read_to_string(dst.join("a/b/deep.txt")).unwrap(), "deep");
        assert!(!dst.join("old_dir").exists());
    }

    #[test]
    fn test_replace_tree_creates_missing_parents() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join(".hidden"), "kept").unwrap();

        let dst = out.path().join("src/main/java");
        replace_tree(src.path(), &dst).unwrap();
        assert_eq!(std::fs::read_to_string(dst.join(".hidden")).unwrap(), "kept");
    }

    #[test]
    fn test_replace_tree_leaves_siblings_alone() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("f.txt"), "f").unwrap();
        std::fs::write(out.path().join("README"), "keep me").unwrap();

        replace_tree(src.path(), &out.path().join("src")).unwrap();
        assert!(out.path().join("README").exists());
    }
}
