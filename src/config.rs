use crate::error::BuildError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "incbuild.toml";

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub build: BuildSettings,
    pub coverage: CoverageSettings,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BuildSettings {
    /// Falls back to `$CXX`, then `g++`.
    pub compiler: Option<String>,
    pub options: Vec<String>,
    pub release_options: Vec<String>,
    pub debug_options: Vec<String>,
    pub coverage_options: Vec<String>,
    pub out_dir: String,
    pub source_dir: String,
    pub tests_dir: String,
    pub main: String,
    pub test_main: String,
    pub executable: String,
    pub test_executable: String,
    pub header_ext: String,
    pub source_ext: String,
    pub object_ext: String,
    /// Include/library flags appended to every compile and link (`-I`, `-L`, `-l`).
    pub extras: Vec<String>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            compiler: None,
            options: strings(&["-std=c++17", "-Wall", "-Wextra", "-Werror", "-Wpedantic"]),
            release_options: strings(&["-O3"]),
            debug_options: strings(&["-O0", "-g"]),
            coverage_options: strings(&["-fprofile-arcs", "-ftest-coverage"]),
            out_dir: "build".into(),
            source_dir: "src".into(),
            tests_dir: "tests".into(),
            main: "main.cpp".into(),
            test_main: "tests.cpp".into(),
            executable: "main".into(),
            test_executable: "unittests".into(),
            header_ext: "h".into(),
            source_ext: "cpp".into(),
            object_ext: "o".into(),
            extras: Vec::new(),
        }
    }
}

impl BuildSettings {
    pub fn compiler(&self) -> String {
        if let Some(compiler) = &self.compiler {
            return compiler.clone();
        }
        std::env::var("CXX")
            .ok()
            .filter(|cxx| !cxx.trim().is_empty())
            .unwrap_or_else(|| "g++".to_string())
    }

    /// `extras` entries may hold several flags (`"-lSDL2 -lSDL2_ttf"`).
    pub fn extra_flags(&self) -> Vec<String> {
        self.extras
            .iter()
            .flat_map(|e| e.split_whitespace())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CoverageSettings {
    pub threshold: f64,
    pub data_file: String,
    pub report_dir: String,
    /// Files stripped from the coverage data before the report is rendered.
    pub exclude: Vec<String>,
    pub capture: Vec<String>,
    pub filter: Vec<String>,
    pub render: Vec<String>,
    pub summary: Vec<String>,
}

impl Default for CoverageSettings {
    fn default() -> Self {
        Self {
            threshold: 95.0,
            data_file: "coverage.info".into(),
            report_dir: "coverage".into(),
            exclude: Vec::new(),
            capture: strings(&[
                "lcov",
                "--no-external",
                "--directory",
                ".",
                "--capture",
                "--output-file",
                "{data}",
            ]),
            filter: strings(&["php", "lcov-fixer.php"]),
            render: strings(&[
                "genhtml",
                "-s",
                "--demangle-cpp",
                "-o",
                "{report}",
                "--dark-mode",
                "{data}",
            ]),
            summary: strings(&["lcov", "--summary", "{data}"]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Config {
    pub fn validate(&self) -> Result<(), BuildError> {
        let b = &self.build;
        if let Some(compiler) = &b.compiler
            && compiler.trim().is_empty()
        {
            return Err(BuildError::config("[build] compiler must not be empty"));
        }
        for (key, value) in [
            ("out_dir", &b.out_dir),
            ("source_dir", &b.source_dir),
            ("tests_dir", &b.tests_dir),
            ("executable", &b.executable),
            ("test_executable", &b.test_executable),
            ("header_ext", &b.header_ext),
            ("source_ext", &b.source_ext),
            ("object_ext", &b.object_ext),
        ] {
            if value.trim().is_empty() {
                return Err(BuildError::config(format!("[build] {key} must not be empty")));
            }
        }
        if b.header_ext == b.source_ext {
            return Err(BuildError::config(
                "[build] header_ext and source_ext must differ",
            ));
        }

        let c = &self.coverage;
        if !(0.0..=100.0).contains(&c.threshold) {
            return Err(BuildError::config(format!(
                "[coverage] threshold must be between 0 and 100, got {}",
                c.threshold
            )));
        }
        for (key, cmd) in [
            ("capture", &c.capture),
            ("filter", &c.filter),
            ("render", &c.render),
            ("summary", &c.summary),
        ] {
            if cmd.is_empty() {
                return Err(BuildError::config(format!(
                    "[coverage] {key} command must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Loads `path`, or the defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: Config = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Debug,
    Release,
}

impl BuildMode {
    pub fn options<'a>(&self, settings: &'a BuildSettings) -> &'a [String] {
        match self {
            BuildMode::Debug => &settings.debug_options,
            BuildMode::Release => &settings.release_options,
        }
    }
}

/// Raw command-line switches, before validation.
#[derive(Debug, Clone, Default)]
pub struct Flags {
    pub clean: bool,
    pub release: bool,
    pub debug: bool,
    pub tests: bool,
    pub exec: bool,
    pub main: Option<String>,
    pub watch: bool,
    pub verbose: bool,
}

/// A validated request: what to clean, build and run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub clean: bool,
    pub mode: Option<BuildMode>,
    pub tests: bool,
    pub exec: bool,
    pub main_override: Option<String>,
    pub watch: bool,
    pub verbose: bool,
}

impl Invocation {
    pub fn from_flags(flags: Flags) -> Result<Self, BuildError> {
        let mode = match (flags.debug, flags.release) {
            (true, true) => {
                return Err(BuildError::config(
                    "Exactly one of --debug or --release may be given (use --help for more info)",
                ));
            }
            (true, false) => Some(BuildMode::Debug),
            (false, true) => Some(BuildMode::Release),
            (false, false) => None,
        };

        if mode.is_none() {
            if !flags.clean {
                return Err(BuildError::config(
                    "Nothing to do: pass --debug, --release or --clean (use --help for more info)",
                ));
            }
            if flags.tests || flags.exec || flags.watch || flags.main.is_some() {
                return Err(BuildError::config(
                    "--tests, --exec, --main and --watch need --debug or --release",
                ));
            }
        }

        if let Some(main) = &flags.main
            && main.trim().is_empty()
        {
            return Err(BuildError::config("--main needs a file name"));
        }

        Ok(Self {
            clean: flags.clean,
            mode,
            tests: flags.tests,
            exec: flags.exec,
            main_override: flags.main,
            watch: flags.watch,
            verbose: flags.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_classic_layout() {
        let config = Config::default();
        assert_eq!(config.build.source_dir, "src");
        assert_eq!(config.build.main, "main.cpp");
        assert_eq!(config.build.test_executable, "unittests");
        assert_eq!(config.coverage.threshold, 95.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[build]
compiler = "clang++"
extras = ["-I/opt/eigen", "-lSDL2 -lSDL2_ttf"]

[coverage]
exclude = ["libs/nlopt/build/nlopt.hpp"]
"#,
        )
        .unwrap();

        assert_eq!(config.build.compiler(), "clang++");
        assert_eq!(config.build.out_dir, "build");
        assert_eq!(
            config.build.extra_flags(),
            vec!["-I/opt/eigen", "-lSDL2", "-lSDL2_ttf"]
        );
        assert_eq!(config.coverage.exclude.len(), 1);
        assert_eq!(config.coverage.summary[0], "lcov");
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let mut config = Config::default();
        config.coverage.threshold = 120.0;
        assert!(matches!(
            config.validate(),
            Err(BuildError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_empty_tool_command() {
        let mut config = Config::default();
        config.coverage.summary.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.build.tests_dir, "tests");
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[coverage]\nthreshold = -1.0\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.downcast_ref::<BuildError>().is_some());
    }

    #[test]
    fn test_debug_and_release_are_exclusive() {
        let flags = Flags {
            debug: true,
            release: true,
            ..Default::default()
        };
        assert!(Invocation::from_flags(flags).is_err());
    }

    #[test]
    fn test_some_mode_is_required() {
        assert!(Invocation::from_flags(Flags::default()).is_err());
        let tests_only = Flags {
            clean: true,
            tests: true,
            ..Default::default()
        };
        assert!(Invocation::from_flags(tests_only).is_err());
    }

    #[test]
    fn test_clean_alone_is_valid() {
        let inv = Invocation::from_flags(Flags {
            clean: true,
            ..Default::default()
        })
        .unwrap();
        assert!(inv.clean);
        assert_eq!(inv.mode, None);
    }

    #[test]
    fn test_release_options_selected() {
        let inv = Invocation::from_flags(Flags {
            release: true,
            tests: true,
            ..Default::default()
        })
        .unwrap();
        let settings = BuildSettings::default();
        assert_eq!(inv.mode, Some(BuildMode::Release));
        assert_eq!(inv.mode.unwrap().options(&settings), ["-O3"]);
    }
}
