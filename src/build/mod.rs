mod clean;
pub mod classify;
mod core;
pub mod coverage;
mod feedback;
pub mod layout;
pub mod scan;
pub mod stale;
mod watcher;

pub use classify::{Classification, CompilationUnit, UnitKind, classify};
pub use clean::clean;
pub use self::core::{
    BuildContext, BuildOutput, BuildReport, BuildRequest, CompileCommand, EntryPoint,
    build_and_run, build_folder, write_compile_commands,
};
pub use coverage::{CoverageOutcome, CoverageReport, Verdict, evaluate, parse_summary, run_gate};
pub use feedback::FeedbackAnalyzer;
pub use layout::Layout;
pub use scan::{SourceTree, mirror_dirs, scan_tree};
pub use stale::Staleness;
pub use watcher::watch;
