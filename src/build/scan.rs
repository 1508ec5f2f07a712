//! Source tree discovery.
//!
//! Walks a source folder once, collecting every subdirectory and every header.
//! Directory symlinks are followed; `walkdir` detects symlink loops and
//! reports them as errors, which are skipped so recursion always terminates.

use super::layout::Layout;
use crate::error::BuildError;
use crate::ui;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default)]
pub struct SourceTree {
    pub root: PathBuf,
    /// Every directory below `root`, recursively.
    pub dirs: Vec<PathBuf>,
    pub headers: Vec<PathBuf>,
}

pub fn scan_tree(root: &Path, header_ext: &str) -> Result<SourceTree> {
    if !root.is_dir() {
        return Err(BuildError::config(format!("No input folder: {}", root.display())).into());
    }

    let mut tree = SourceTree {
        root: root.to_path_buf(),
        ..Default::default()
    };
    let mut seen_dirs = HashSet::new();

    let mut walker = WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if let Some(ancestor) = e.loop_ancestor() {
                    ui::warn(&format!(
                        "Skipping symlink loop back to {}",
                        ancestor.display()
                    ));
                } else {
                    ui::warn(&format!("Skipping unreadable entry: {}", e));
                }
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_dir() {
            // A directory reached again through a symlink is not descended twice.
            let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            if !seen_dirs.insert(key) {
                walker.skip_current_dir();
                continue;
            }
            tree.dirs.push(path.to_path_buf());
        } else if path.extension().is_some_and(|ext| ext == header_ext) {
            // Walk paths are unique, so a header symlink is its own entry.
            tree.headers.push(path.to_path_buf());
        }
    }

    Ok(tree)
}

/// Creates the output directory for `tree.root` and each of its subdirectories.
pub fn mirror_dirs(tree: &SourceTree, layout: &Layout) -> Result<()> {
    for dir in std::iter::once(&tree.root).chain(&tree.dirs) {
        let target = layout.mirror(dir);
        fs::create_dir_all(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildSettings;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_finds_nested_headers_and_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        touch(&src.join("foo.h"));
        touch(&src.join("foo.cpp"));
        touch(&src.join("net/socket.h"));
        touch(&src.join("net/tls/ctx.h"));
        touch(&src.join("util.hpp"));

        let tree = scan_tree(&src, "h").unwrap();

        assert_eq!(tree.dirs, vec![src.join("net"), src.join("net/tls")]);
        assert_eq!(
            tree.headers,
            vec![
                src.join("foo.h"),
                src.join("net/socket.h"),
                src.join("net/tls/ctx.h"),
            ]
        );
    }

    #[test]
    fn test_missing_root_is_a_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = scan_tree(&tmp.path().join("nope"), "h").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::Configuration(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_terminates() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        touch(&src.join("inner/a.h"));
        std::os::unix::fs::symlink(&src, src.join("inner/back")).unwrap();

        let tree = scan_tree(&src, "h").unwrap();

        assert_eq!(tree.headers, vec![src.join("inner/a.h")]);
        assert_eq!(tree.dirs, vec![src.join("inner")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_header_symlink_keeps_the_real_header() {
        use crate::build::classify::classify;

        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        touch(&src.join("real.h"));
        touch(&src.join("real.cpp"));
        std::os::unix::fs::symlink(src.join("real.h"), src.join("alias.h")).unwrap();

        let tree = scan_tree(&src, "h").unwrap();
        assert_eq!(tree.headers, vec![src.join("alias.h"), src.join("real.h")]);

        let layout = Layout::new(tmp.path(), &BuildSettings::default());
        let classification = classify(&tree, &layout).unwrap();
        let compiled: Vec<_> = classification.compiled().map(|u| u.header.clone()).collect();
        assert_eq!(compiled, vec![src.join("real.h")]);
        assert_eq!(classification.header_only().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_symlink_is_walked_once() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        touch(&src.join("a/x.h"));
        std::os::unix::fs::symlink(src.join("a"), src.join("b")).unwrap();

        let tree = scan_tree(&src, "h").unwrap();

        assert_eq!(tree.dirs, vec![src.join("a")]);
        assert_eq!(tree.headers, vec![src.join("a/x.h")]);
    }

    #[test]
    fn test_mirror_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        touch(&src.join("a/b/x.h"));
        let layout = Layout::new(tmp.path(), &BuildSettings::default());
        let tree = scan_tree(&src, "h").unwrap();

        mirror_dirs(&tree, &layout).unwrap();
        mirror_dirs(&tree, &layout).unwrap();

        assert!(tmp.path().join("build/src/a/b").is_dir());
    }
}
