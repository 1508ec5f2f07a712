use super::classify::{Classification, UnitKind, classify};
use super::clean::clean;
use super::coverage::{self, CoverageOutcome};
use super::feedback::FeedbackAnalyzer;
use super::layout::Layout;
use super::scan::{mirror_dirs, scan_tree};
use super::stale;
use crate::config::{BuildSettings, Config, Invocation};
use crate::process::{CommandLine, CommandRunner, ExecutionResult, RunOptions};
use crate::ui;
use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Compiler, flags and layout shared by every step of one invocation.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub layout: Layout,
    pub compiler: String,
    /// `-I`/`-L`/`-l` flags appended to every compile and link.
    pub extras: Vec<String>,
    pub verbose: bool,
}

impl BuildContext {
    pub fn new(root: &Path, settings: &BuildSettings, verbose: bool) -> Self {
        Self {
            layout: Layout::new(root, settings),
            compiler: settings.compiler(),
            extras: settings.extra_flags(),
            verbose,
        }
    }

    /// `<compiler> <options> -c <source> -o <object> <flags> <extras>`
    fn compile(
        &self,
        options: &[String],
        source: &Path,
        object: &Path,
        flags: &[String],
    ) -> CommandLine {
        CommandLine::new(&self.compiler)
            .args(options.iter().cloned())
            .arg("-c")
            .path_arg(source)
            .arg("-o")
            .path_arg(object)
            .args(flags.iter().cloned())
            .args(self.extras.iter().cloned())
            .current_dir(&self.layout.root)
    }

    fn compile_command(&self, cmd: &CommandLine, source: &Path) -> CompileCommand {
        CompileCommand {
            directory: self.layout.root.to_string_lossy().into_owned(),
            command: cmd.to_string(),
            file: source.to_string_lossy().into_owned(),
        }
    }
}

/// The source file holding `main()`, and the executable it links into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub source: String,
    pub executable: String,
}

#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Source folder, relative to the project root.
    pub folder: String,
    pub options: Vec<String>,
    /// Without an entry point only the unit objects are built.
    pub entry: Option<EntryPoint>,
    /// Objects from an earlier build linked in as-is.
    pub prebuilt_objects: Vec<PathBuf>,
}

/// One entry of `compile_commands.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileCommand {
    pub directory: String,
    pub command: String,
    pub file: String,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Every unit object, whether rebuilt or not.
    pub unit_objects: Vec<PathBuf>,
    pub include_paths: Vec<PathBuf>,
    pub entry_object: Option<PathBuf>,
    pub executable: Option<PathBuf>,
    /// Unit objects recompiled by this build.
    pub compiled: Vec<PathBuf>,
    pub up_to_date: usize,
    pub commands: Vec<CompileCommand>,
}

// --- CORE: Build one source folder ---
pub fn build_folder(
    runner: &dyn CommandRunner,
    ctx: &BuildContext,
    request: &BuildRequest,
) -> Result<BuildOutput> {
    let folder = ctx.layout.root.join(&request.folder);
    ui::step(&format!("Build: {}", request.folder));

    // 1. Discover and classify
    ui::step("Collecting subfolders and header files...");
    let tree = scan_tree(&folder, &ctx.layout.header_ext)?;

    ui::step(&format!(
        "Creating build folder and subfolders ({})...",
        request.folder
    ));
    mirror_dirs(&tree, &ctx.layout)?;

    let classification = classify(&tree, &ctx.layout)?;
    if ctx.verbose {
        report_units(&classification, &ctx.layout);
    }

    let mut output = BuildOutput {
        include_paths: classification.include_paths.clone(),
        ..Default::default()
    };

    // 2. Compile stale units
    ui::step("Compiling changed units...");
    let units: Vec<_> = classification.compiled().collect();
    let pb = progress_bar(units.len());

    for unit in units {
        let (Some(implementation), Some(object)) = (unit.implementation(), unit.object()) else {
            continue;
        };
        let cmd = ctx.compile(&request.options, implementation, object, &[]);
        output
            .commands
            .push(ctx.compile_command(&cmd, implementation));
        output.unit_objects.push(object.to_path_buf());

        let staleness = stale::check(unit);
        let name = ctx.layout.relative(implementation);
        if staleness.is_stale() {
            pb.set_message(format!("{}", name.display()));
            pb.suspend(|| run_step(runner, &cmd))?;
            output.compiled.push(object.to_path_buf());
        } else {
            output.up_to_date += 1;
            if ctx.verbose {
                pb.suspend(|| ui::detail(&format!("up to date: {}", name.display())));
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let Some(entry) = &request.entry else {
        return Ok(output);
    };

    // 3. Entry point, with header-only directories on the include path
    let include_flags: Vec<String> = output
        .include_paths
        .iter()
        .map(|p| format!("-I{}", p.display()))
        .collect();
    let source = folder.join(&entry.source);
    let entry_object = ctx
        .layout
        .out_dir
        .join(format!("{}.{}", entry.executable, ctx.layout.object_ext));
    let executable = ctx.layout.out_dir.join(&entry.executable);

    ui::step("Compiling the main file...");
    let cmd = ctx.compile(&request.options, &source, &entry_object, &include_flags);
    output.commands.push(ctx.compile_command(&cmd, &source));
    run_step(runner, &cmd)?;

    // 4. Link
    ui::step("Linking objects to executable...");
    let link = CommandLine::new(&ctx.compiler)
        .args(request.options.iter().cloned())
        .arg("-o")
        .path_arg(&executable)
        .path_arg(&entry_object)
        .args(
            output
                .unit_objects
                .iter()
                .chain(&request.prebuilt_objects)
                .map(|p| p.to_string_lossy().into_owned()),
        )
        .args(include_flags)
        .args(ctx.extras.iter().cloned())
        .current_dir(&ctx.layout.root);
    run_step(runner, &link)?;

    output.entry_object = Some(entry_object);
    output.executable = Some(executable);
    Ok(output)
}

/// Runs a compile or link step; on failure prints a hint before erroring out.
fn run_step(runner: &dyn CommandRunner, cmd: &CommandLine) -> Result<ExecutionResult> {
    let result = runner.run(cmd, RunOptions::default().allow_failure())?;
    if result.spawned()
        && !result.success()
        && let Some(hint) = FeedbackAnalyzer::analyze(&result.stderr)
    {
        println!("{} {}", "💡".yellow(), hint);
    }
    Ok(result.check(cmd)?)
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn report_units(classification: &Classification, layout: &Layout) {
    for unit in &classification.units {
        let header = layout.relative(&unit.header);
        match &unit.kind {
            UnitKind::Compiled { object, .. } => ui::detail(&format!(
                "compiled     {} -> {}",
                header.display(),
                layout.relative(object).display()
            )),
            UnitKind::HeaderOnly => ui::detail(&format!("header-only  {}", header.display())),
        }
    }
    for path in &classification.include_paths {
        ui::detail(&format!("include      {}", path.display()));
    }
}

/// Writes the clang compilation database for editors and tooling.
pub fn write_compile_commands(out_dir: &Path, commands: &[CompileCommand]) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join("compile_commands.json");
    let json_str = serde_json::to_string_pretty(commands)?;
    fs::write(&path, json_str).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub app: BuildOutput,
    pub tests: Option<BuildOutput>,
    pub coverage: Option<CoverageOutcome>,
}

// --- COMMAND: Clean, build, test & run ---
/// Returns `None` when the invocation only cleaned.
pub fn build_and_run(
    runner: &dyn CommandRunner,
    config: &Config,
    invocation: &Invocation,
    root: &Path,
) -> Result<Option<BuildReport>> {
    if invocation.clean {
        clean(root, config)?;
    }
    let Some(mode) = invocation.mode else {
        return Ok(None);
    };

    let start_time = Instant::now();
    let settings = &config.build;
    let ctx = BuildContext::new(root, settings, invocation.verbose);

    let mut options = settings.options.clone();
    options.extend_from_slice(mode.options(settings));

    // --main names the test entry on test builds, the program entry otherwise.
    let main_source = match (&invocation.main_override, invocation.tests) {
        (Some(main), false) => main.clone(),
        _ => settings.main.clone(),
    };
    let app = build_folder(
        runner,
        &ctx,
        &BuildRequest {
            folder: settings.source_dir.clone(),
            options: options.clone(),
            entry: Some(EntryPoint {
                source: main_source,
                executable: settings.executable.clone(),
            }),
            prebuilt_objects: Vec::new(),
        },
    )?;
    let mut report = BuildReport {
        app,
        ..Default::default()
    };

    if invocation.tests {
        let mut test_options = options;
        test_options.extend_from_slice(&settings.coverage_options);
        let test_source = invocation
            .main_override
            .clone()
            .unwrap_or_else(|| settings.test_main.clone());
        let tests = build_folder(
            runner,
            &ctx,
            &BuildRequest {
                folder: settings.tests_dir.clone(),
                options: test_options,
                entry: Some(EntryPoint {
                    source: test_source,
                    executable: settings.test_executable.clone(),
                }),
                prebuilt_objects: report.app.unit_objects.clone(),
            },
        )?;
        report.tests = Some(tests);
    }

    let outputs: Vec<&BuildOutput> = std::iter::once(&report.app)
        .chain(report.tests.as_ref())
        .collect();
    let commands: Vec<CompileCommand> = outputs
        .iter()
        .flat_map(|o| o.commands.iter().cloned())
        .collect();
    write_compile_commands(&ctx.layout.out_dir, &commands)?;

    let compiled: usize = outputs.iter().map(|o| o.compiled.len()).sum();
    let up_to_date: usize = outputs.iter().map(|o| o.up_to_date).sum();
    ui::success(&format!(
        "Build finished in {:.2?} ({} recompiled, {} up to date)",
        start_time.elapsed(),
        compiled,
        up_to_date
    ));

    if invocation.exec {
        match &report.tests {
            Some(tests) => {
                let exe = tests
                    .executable
                    .as_deref()
                    .context("Test build produced no executable")?;
                report.coverage = Some(coverage::run_gate(runner, &config.coverage, root, exe)?);
            }
            None => {
                let exe = report
                    .app
                    .executable
                    .as_deref()
                    .context("Build produced no executable")?;
                ui::step("Running application:");
                let cmd = CommandLine::new(exe.to_string_lossy()).current_dir(root);
                runner.run(&cmd, RunOptions::default())?.check(&cmd)?;
            }
        }
    }

    Ok(Some(report))
}
