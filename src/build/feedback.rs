use colored::*;

/// Turns a failed compile or link's stderr into a hint about what to fix.
pub struct FeedbackAnalyzer;

impl FeedbackAnalyzer {
    pub fn analyze(output: &str) -> Option<String> {
        // 1. Entry point without main()
        if output.contains("undefined reference to `main'")
            || output.contains("undefined reference to main")
        {
            return Some(format!(
                "The linked program has no {} function.\nCheck the entry file ({} / {} in incbuild.toml, or {}).",
                "main()".bold().yellow(),
                "main".bold().green(),
                "test_main".bold().green(),
                "--main".bold().green()
            ));
        }

        // 2. Unresolved symbol, usually a missing -l flag
        if output.contains("undefined reference to") || output.contains("Undefined symbols") {
            return Some(format!(
                "It looks like a {} error.\nA library may be missing from {} in incbuild.toml (e.g. {}).",
                "Linker".bold().red(),
                "[build] extras".bold().yellow(),
                "-lwebsockets".bold().green()
            ));
        }

        // 3. Missing header
        if output.contains("fatal error: ") && output.contains("No such file or directory") {
            return Some(format!(
                "It looks like a {} error.\nAdd the library's include directory to {} (e.g. {}).",
                "Missing Header".bold().red(),
                "[build] extras".bold().yellow(),
                "-I/usr/include/SDL2".bold().green()
            ));
        }

        None
    }
}
