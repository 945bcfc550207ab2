use alignment::Reporter;
use colored::Colorize;

/// Print a plain message
pub fn msg(msg: &str) {
    println!("{msg}");
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a bold heading
pub fn heading(title: &str) {
    println!("{}", title.bold());
}

// ============================================================================
// Reporter
// ============================================================================

/// Prints alignment progress to the terminal.
///
/// Detail lines (diffs) only show in verbose mode.
pub struct TerminalReporter {
    verbose: bool,
}

impl TerminalReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Reporter for TerminalReporter {
    fn heading(&mut self, text: &str) {
        heading(text);
    }

    fn item(&mut self, text: &str) {
        msg(text);
    }

    fn warn(&mut self, text: &str) {
        warn(text);
    }

    fn error(&mut self, text: &str) {
        error(text);
    }

    fn detail(&mut self, text: &str) {
        if self.verbose {
            for line in text.lines() {
                let line = if line.starts_with('+') {
                    line.green()
                } else if line.starts_with('-') {
                    line.red()
                } else {
                    line.normal()
                };
                println!("    {line}");
            }
        }
    }
}
