//! Diagnostic system for errors and warnings
//!
//! All static-phase errors (lexing, parsing, resolution, type checking) flow
//! through the unified Diagnostic type, ensuring consistent formatting across
//! the whole front half of the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use termcolor::{Color, ColorSpec, WriteColor};

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    /// Fatal error that prevents compilation
    Error,
    /// Warning that doesn't prevent compilation
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message (error or warning)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub level: DiagnosticLevel,
    /// Error code (e.g., "RL2001")
    pub code: String,
    /// Main diagnostic message
    pub message: String,
    /// Source line number (1-based)
    pub line: u32,
    /// Short label describing the offending construct
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub label: String,
    /// Additional notes (optional)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
    /// Suggested fix (optional)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic with code
    pub fn error_with_code(code: impl Into<String>, message: impl Into<String>, line: u32) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            code: code.into(),
            message: message.into(),
            line,
            label: String::new(),
            notes: Vec::new(),
            help: None,
        }
    }

    /// Create a new warning diagnostic with code
    pub fn warning_with_code(
        code: impl Into<String>,
        message: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            code: code.into(),
            message: message.into(),
            line,
            label: String::new(),
            notes: Vec::new(),
            help: None,
        }
    }

    /// Set the label (short description of the offending construct)
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Add a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Add a help message
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Format as human-readable string
    pub fn to_human_string(&self) -> String {
        let mut output = String::new();

        // Header: error[RL2001]: x is not declared
        output.push_str(&format!("{}[{}]: {}\n", self.level, self.code, self.message));

        // Location: --> line 12
        output.push_str(&format!("  --> line {}\n", self.line));

        if !self.label.is_empty() {
            output.push_str(&format!("   = {}\n", self.label));
        }
        for note in &self.notes {
            output.push_str(&format!("   = note: {}\n", note));
        }
        if let Some(help) = &self.help {
            output.push_str(&format!("   = help: {}\n", help));
        }

        output
    }

    /// Render with color to a terminal-capable writer
    pub fn emit_colored(&self, out: &mut dyn WriteColor) -> std::io::Result<()> {
        let color = match self.level {
            DiagnosticLevel::Error => Color::Red,
            DiagnosticLevel::Warning => Color::Yellow,
        };
        out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        write!(out, "{}[{}]", self.level, self.code)?;
        out.reset()?;
        writeln!(out, ": {}", self.message)?;
        writeln!(out, "  --> line {}", self.line)?;
        if !self.label.is_empty() {
            writeln!(out, "   = {}", self.label)?;
        }
        for note in &self.notes {
            writeln!(out, "   = note: {}", note)?;
        }
        if let Some(help) = &self.help {
            writeln!(out, "   = help: {}", help)?;
        }
        Ok(())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_format_includes_code_and_line() {
        let diag = Diagnostic::error_with_code("RL2001", "x is not declared", 4)
            .with_help("declare it with `let x = ...;`".to_string());
        let text = diag.to_human_string();
        assert!(text.starts_with("error[RL2001]: x is not declared"));
        assert!(text.contains("--> line 4"));
        assert!(text.contains("help: declare it"));
    }

    #[test]
    fn warning_level_renders_as_warning() {
        let diag = Diagnostic::warning_with_code("RL0001", "unused variable", 1);
        assert!(diag.to_human_string().starts_with("warning[RL0001]"));
    }
}
