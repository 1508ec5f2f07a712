//! Terminal output helpers.
//!
//! All user-facing progress goes through these so the build log has one
//! consistent look:
//!
//! ```text
//! → Collecting subfolders and header files...
//! $ g++ -std=c++17 -c src/foo.cpp -o build/src/foo.o
//! ✓ Build finished in 1.42s
//! ```

use colored::*;

/// A pipeline stage starting.
pub fn step(msg: &str) {
    println!("{} {}", "→".cyan(), msg.cyan());
}

pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg.green());
}

pub fn warn(msg: &str) {
    println!("{} {}", "!".yellow(), msg.yellow());
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "x".red(), msg.red());
}

/// Echo of an external command line before it runs.
pub fn command(line: &str) {
    println!("{} {}", "$".dimmed(), line);
}

/// Secondary detail line, only printed in verbose mode by callers.
pub fn detail(msg: &str) {
    println!("   {}", msg.dimmed());
}
