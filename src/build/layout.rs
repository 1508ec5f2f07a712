use crate::config::BuildSettings;
use std::path::{Component, Path, PathBuf};

/// Where sources live and where their artifacts go.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    pub out_dir: PathBuf,
    pub header_ext: String,
    pub source_ext: String,
    pub object_ext: String,
}

impl Layout {
    pub fn new(root: &Path, settings: &BuildSettings) -> Self {
        Self {
            root: root.to_path_buf(),
            out_dir: root.join(&settings.out_dir),
            header_ext: settings.header_ext.clone(),
            source_ext: settings.source_ext.clone(),
            object_ext: settings.object_ext.clone(),
        }
    }

    /// `path` relative to the project root, keeping only normal components so
    /// the result can never escape the output directory when joined onto it.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect()
    }

    /// The counterpart of `path` under the output directory.
    pub fn mirror(&self, path: &Path) -> PathBuf {
        self.out_dir.join(self.relative(path))
    }

    pub fn object_for(&self, header: &Path) -> PathBuf {
        self.mirror(header).with_extension(&self.object_ext)
    }
}
