/// cli/src/output.rs
/// Output utilities for the reform CLI
/// description: styled line printing and table rendering shared by the
/// subcommands. Styling goes through `console` so it is dropped
/// automatically when stdout is not a terminal.

use std::io::{self, Write};

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL};
use console::Style;
use reform_core::location::{Location, Span};
use reform_core::policy::{Policy, SpecRevision};
use reform_core::{Level, ReformErrorExt};

/// Rendering or writing the command's result failed.
#[derive(Debug)]
pub struct OutputError {
    message: String,
}

impl OutputError {
    pub fn new(message: impl Into<String>) -> Self {
        OutputError { message: message.into() }
    }
}

impl From<io::Error> for OutputError {
    fn from(err: io::Error) -> Self {
        OutputError::new(format!("failed to write output: {}", err))
    }
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for OutputError {}

impl ReformErrorExt for OutputError {
    fn level(&self) -> Level {
        Level::Error
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn issuer(&self) -> String {
        "reform.cli.output".to_string()
    }

    fn span(&self) -> Option<Span> {
        None
    }

    fn location(&self) -> Option<Location> {
        None
    }
}

impl From<OutputError> for Box<dyn ReformErrorExt> {
    fn from(err: OutputError) -> Self {
        Box::new(err)
    }
}

/// Styles for different output elements
pub struct FormatStyle {
    pub title: Style,
    pub info: Style,
    pub warning: Style,
    pub error: Style,
    pub success: Style,
}

impl Default for FormatStyle {
    fn default() -> Self {
        FormatStyle {
            title: Style::new().bold().underlined(),
            info: Style::new().cyan(),
            warning: Style::new().yellow(),
            error: Style::new().red().bold(),
            success: Style::new().green().bold(),
        }
    }
}

/// Printer that writes styled lines into any `Write`.
pub struct OutputHandler<T: Write> {
    out: T,
    formatting: FormatStyle,
}

impl<T: Write> OutputHandler<T> {
    pub fn new(out: T) -> Self {
        OutputHandler {
            out,
            formatting: FormatStyle::default(),
        }
    }

    /// Write one line, styled when `style` is given.
    pub fn line(&mut self, text: &str, style: Option<&Style>) -> io::Result<()> {
        match style {
            Some(s) => writeln!(self.out, "{}", s.apply_to(text)),
            None => writeln!(self.out, "{}", text),
        }
    }

    pub fn title(&mut self, text: &str) -> io::Result<()> {
        let style = self.formatting.title.clone();
        self.line(text, Some(&style))
    }
    pub fn info(&mut self, text: &str) -> io::Result<()> {
        let style = self.formatting.info.clone();
        self.line(text, Some(&style))
    }
    pub fn warning(&mut self, text: &str) -> io::Result<()> {
        let style = self.formatting.warning.clone();
        self.line(text, Some(&style))
    }
    pub fn error(&mut self, text: &str) -> io::Result<()> {
        let style = self.formatting.error.clone();
        self.line(text, Some(&style))
    }
    pub fn success(&mut self, text: &str) -> io::Result<()> {
        let style = self.formatting.success.clone();
        self.line(text, Some(&style))
    }
    pub fn message(&mut self, text: &str) -> io::Result<()> {
        self.line(text, None)
    }

    /// Write pre-rendered text untouched.
    pub fn raw(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{}", text)?;
        if !text.ends_with('\n') {
            writeln!(self.out)?;
        }
        Ok(())
    }
}

fn policy_cells(policy: &Policy) -> Vec<Cell> {
    vec![
        Cell::new(format!("{:?}", policy.attribute_lookup)),
        Cell::new(format!("{:?}", policy.enter_exit_order)),
        Cell::new(format!("{:?}", policy.position_attribution)),
        Cell::new(format!("{:?}", policy.input_shape)),
        Cell::new(if policy.publish_exception { "yes" } else { "no" }),
    ]
}

/// Render policy rows as a table, one row per `(revision, async)` pair.
pub fn policy_table(rows: &[(SpecRevision, bool, Policy)]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "revision",
            "form",
            "attribute lookup",
            "enter/exit order",
            "positions",
            "input shape",
            "publish",
        ]);
    for (revision, is_async, policy) in rows {
        let mut cells = vec![
            Cell::new(revision.to_string()),
            Cell::new(if *is_async { "async" } else { "sync" }),
        ];
        cells.extend(policy_cells(policy));
        table.add_row(cells);
    }
    table
}
