//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the DocQA CLI.

use crate::rag::IngestionReport;
use owo_colors::OwoColorize;

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

    /// Print the startup banner
    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n   {} {}\n",
                "DocQA".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!("\n   DocQA v{}\n", env!("CARGO_PKG_VERSION"));
        }
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

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print the output of one completed pipeline stage
    pub fn stage(&self, stage: &str, field: &str, value: &str) {
        if self.colored {
            println!(
                "\n  {} {}",
                format!("[{}]", stage).bright_cyan().bold(),
                format!("-> {}", field).dimmed()
            );
        } else {
            println!("\n  [{}] -> {}", stage, field);
        }
        println!("{}", value);
    }

    /// Print an ingestion summary
    pub fn report(&self, report: &IngestionReport) {
        self.header("Ingestion Report");
        self.kv(
            "documents",
            &format!("{}/{}", report.documents_loaded, report.urls_attempted),
        );
        self.kv("chunks", &report.chunks.to_string());
        self.kv("embedding batches", &report.embedding_batches.to_string());
        self.kv("dimensions", &report.dimensions.to_string());
        self.kv("index", &report.index_dir.display().to_string());
        self.kv("elapsed", &format!("{} ms", report.duration_ms));

        if !report.failures.is_empty() {
            self.warning(&format!("{} source(s) skipped:", report.failures.len()));
            for failure in &report.failures {
                self.list_item(&format!("{} ({})", failure.url, failure.error));
            }
        }
    }
}
