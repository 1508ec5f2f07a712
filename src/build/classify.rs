//! Header-only vs. compiled unit classification.
//!
//! A header is a compiled unit when an implementation file with the same stem
//! sits next to it (`foo.h` + `foo.cpp`). Otherwise it is header-only and its
//! directory becomes an include path for the entry point.

use super::layout::Layout;
use super::scan::SourceTree;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitKind {
    HeaderOnly,
    Compiled {
        implementation: PathBuf,
        object: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    pub header: PathBuf,
    pub kind: UnitKind,
}

impl CompilationUnit {
    pub fn implementation(&self) -> Option<&Path> {
        match &self.kind {
            UnitKind::Compiled { implementation, .. } => Some(implementation),
            UnitKind::HeaderOnly => None,
        }
    }

    pub fn object(&self) -> Option<&Path> {
        match &self.kind {
            UnitKind::Compiled { object, .. } => Some(object),
            UnitKind::HeaderOnly => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub units: Vec<CompilationUnit>,
    /// Absolute directories of header-only units, first-seen order, no duplicates.
    pub include_paths: Vec<PathBuf>,
}

impl Classification {
    pub fn compiled(&self) -> impl Iterator<Item = &CompilationUnit> {
        self.units
            .iter()
            .filter(|u| matches!(u.kind, UnitKind::Compiled { .. }))
    }

    pub fn header_only(&self) -> impl Iterator<Item = &CompilationUnit> {
        self.units
            .iter()
            .filter(|u| u.kind == UnitKind::HeaderOnly)
    }
}

pub fn classify(tree: &SourceTree, layout: &Layout) -> Result<Classification> {
    let mut classification = Classification::default();

    for header in &tree.headers {
        let implementation = header.with_extension(&layout.source_ext);
        let kind = if implementation.is_file() {
            UnitKind::Compiled {
                implementation,
                object: layout.object_for(header),
            }
        } else {
            let dir = header.parent().unwrap_or(&tree.root);
            let dir = fs::canonicalize(dir)
                .with_context(|| format!("Failed to resolve {}", dir.display()))?;
            if !classification.include_paths.contains(&dir) {
                classification.include_paths.push(dir);
            }
            UnitKind::HeaderOnly
        };

        classification.units.push(CompilationUnit {
            header: header.clone(),
            kind,
        });
    }

    Ok(classification)
}
