//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the cvrag CLI.

use owo_colors::OwoColorize;

use crate::rag::RagAnswer;
use crate::types::ScoredFragment;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {}", message.dimmed().italic());
        } else {
            println!("\n  Hint: {}", message);
        }
    }

    /// Print an answer followed by the numbered sources it was grounded on
    pub fn answer(&self, answer: &RagAnswer) {
        self.header("Answer");
        for line in answer.answer.lines() {
            if answer.failed && self.colored {
                println!("  {}", line.red());
            } else {
                println!("  {}", line);
            }
        }

        self.header("Sources");
        if answer.contexts.is_empty() {
            self.info("no fragments retrieved");
        }
        for ctx in &answer.contexts {
            println!("  {}", self.source_line(ctx));
        }

        if self.colored {
            println!("\n  {}", format!("via {}", answer.backend).dimmed());
        } else {
            println!("\n  via {}", answer.backend);
        }
    }

    /// One line per context: `[n] source (score)`
    pub fn source_line(&self, ctx: &ScoredFragment) -> String {
        let index = format!("[{}]", ctx.rank + 1);
        let score = format!("({:.3})", ctx.score);
        if self.colored {
            format!("{} {} {}", index.cyan().bold(), ctx.source().bright_white(), score.dimmed())
        } else {
            format!("{} {} {}", index, ctx.source(), score)
        }
    }
}
