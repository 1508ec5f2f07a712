//! Timestamp-based staleness.
//!
//! Only the unit's own header and implementation are compared against the
//! object. Headers reached through `#include` are not tracked, so touching a
//! transitively included header does not trigger a rebuild.

use super::classify::{CompilationUnit, UnitKind};
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    UpToDate,
    /// No object file yet.
    Missing,
    /// Object is not strictly newer than every source.
    Outdated,
}

impl Staleness {
    pub fn is_stale(self) -> bool {
        self != Staleness::UpToDate
    }
}

/// Header-only units have nothing to rebuild and are always up to date.
pub fn check(unit: &CompilationUnit) -> Staleness {
    match &unit.kind {
        UnitKind::HeaderOnly => Staleness::UpToDate,
        UnitKind::Compiled {
            implementation,
            object,
        } => check_object(object, &[unit.header.as_path(), implementation.as_path()]),
    }
}

pub fn check_object(object: &Path, sources: &[&Path]) -> Staleness {
    let obj_time = match modified(object) {
        Ok(t) => t,
        Err(_) if !object.exists() => return Staleness::Missing,
        Err(_) => return Staleness::Outdated,
    };

    for source in sources {
        match modified(source) {
            Ok(src_time) if obj_time > src_time => {}
            // Unreadable source times are treated as changed; recompiling is safe.
            _ => return Staleness::Outdated,
        }
    }
    Staleness::UpToDate
}

fn modified(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::PathBuf;
    use std::time::Duration;

    fn write_at(path: &Path, time: SystemTime) {
        fs::write(path, "x").unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn unit(dir: &Path) -> CompilationUnit {
        CompilationUnit {
            header: dir.join("foo.h"),
            kind: UnitKind::Compiled {
                implementation: dir.join("foo.cpp"),
                object: dir.join("foo.o"),
            },
        }
    }

    fn ago(secs: u64) -> SystemTime {
        SystemTime::now() - Duration::from_secs(secs)
    }

    #[test]
    fn test_missing_object_is_stale() {
        let tmp = tempfile::tempdir().unwrap();
        write_at(&tmp.path().join("foo.h"), ago(100));
        write_at(&tmp.path().join("foo.cpp"), ago(100));

        assert_eq!(check(&unit(tmp.path())), Staleness::Missing);
    }

    #[test]
    fn test_object_newer_than_both_is_up_to_date() {
        let tmp = tempfile::tempdir().unwrap();
        write_at(&tmp.path().join("foo.h"), ago(100));
        write_at(&tmp.path().join("foo.cpp"), ago(90));
        write_at(&tmp.path().join("foo.o"), ago(10));

        assert_eq!(check(&unit(tmp.path())), Staleness::UpToDate);
    }

    #[test]
    fn test_touched_header_makes_object_stale() {
        let tmp = tempfile::tempdir().unwrap();
        write_at(&tmp.path().join("foo.h"), ago(5));
        write_at(&tmp.path().join("foo.cpp"), ago(100));
        write_at(&tmp.path().join("foo.o"), ago(10));

        assert_eq!(check(&unit(tmp.path())), Staleness::Outdated);
    }

    #[test]
    fn test_touched_implementation_makes_object_stale() {
        let tmp = tempfile::tempdir().unwrap();
        write_at(&tmp.path().join("foo.h"), ago(100));
        write_at(&tmp.path().join("foo.cpp"), ago(5));
        write_at(&tmp.path().join("foo.o"), ago(10));

        assert_eq!(check(&unit(tmp.path())), Staleness::Outdated);
    }

    #[test]
    fn test_equal_timestamps_are_stale() {
        let tmp = tempfile::tempdir().unwrap();
        let t = ago(50);
        write_at(&tmp.path().join("foo.h"), t);
        write_at(&tmp.path().join("foo.cpp"), t);
        write_at(&tmp.path().join("foo.o"), t);

        assert!(check(&unit(tmp.path())).is_stale());
    }

    #[test]
    fn test_recompiled_object_becomes_up_to_date() {
        let tmp = tempfile::tempdir().unwrap();
        write_at(&tmp.path().join("foo.h"), ago(100));
        write_at(&tmp.path().join("foo.cpp"), ago(20));
        write_at(&tmp.path().join("foo.o"), ago(60));
        let u = unit(tmp.path());
        assert!(check(&u).is_stale());

        write_at(&tmp.path().join("foo.o"), SystemTime::now());
        assert_eq!(check(&u), Staleness::UpToDate);
    }

    #[test]
    fn test_header_only_never_stale() {
        let u = CompilationUnit {
            header: PathBuf::from("/nowhere/x.h"),
            kind: UnitKind::HeaderOnly,
        };
        assert_eq!(check(&u), Staleness::UpToDate);
    }
}
