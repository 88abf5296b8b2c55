// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Translation errors and their reporting

use codespan_reporting::diagnostic::{Diagnostic as CodespanDiagnostic, Label, Severity as CodespanSeverity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::termcolor::WriteColor;
use codespan_reporting::term::{emit, Config};
use source_model::{Location, Provenance, QualifiedName};
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslationError {
    /// A construct with no target mapping; fails its unit only
    #[error("unsupported construct: {construct}")]
    UnsupportedConstruct { construct: String, location: Location },
    /// Two distinct names mangle to one identifier; fails the run
    #[error("name collision: `{first}` and `{second}` both translate to `{ident}`")]
    NameCollision {
        ident: String,
        first: QualifiedName,
        second: QualifiedName,
    },
    /// A name was looked up before registration. Internal defect.
    #[error("internal error: `{name}` was never registered")]
    UnknownSymbol { name: String },
    /// Reported by the front-end; passed through uninterpreted
    #[error("front-end failure: {message}")]
    FrontEndFailure { message: String },
}

pub type TranslationResult<T> = Result<T, TranslationError>;

impl TranslationError {
    pub fn unsupported(construct: impl Into<String>, location: Location) -> Self {
        TranslationError::UnsupportedConstruct {
            construct: construct.into(),
            location,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TranslationError::UnsupportedConstruct { .. } => "UnsupportedConstruct",
            TranslationError::NameCollision { .. } => "NameCollision",
            TranslationError::UnknownSymbol { .. } => "UnknownSymbol",
            TranslationError::FrontEndFailure { .. } => "FrontEndFailure",
        }
    }

    /// Errors that make the whole run's output ambiguous
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(self, TranslationError::NameCollision { .. })
    }

    pub fn location(&self) -> Option<Location> {
        match self {
            TranslationError::UnsupportedConstruct { location, .. } if location.is_known() => Some(*location),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One reported condition, attributed to a unit when it has one
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Source path of the unit (`None` for run-level conditions)
    pub unit: Option<String>,
    pub location: Option<Location>,
    pub severity: Severity,
    pub kind: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn error(unit: Option<&Provenance>, error: &TranslationError) -> Self {
        Self {
            unit: unit.map(|p| p.source_path().to_string()),
            location: error.location(),
            severity: Severity::Error,
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn warning(unit: Option<&Provenance>, message: impl Into<String>) -> Self {
        Self {
            unit: unit.map(|p| p.source_path().to_string()),
            location: None,
            severity: Severity::Warning,
            kind: "Warning",
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (&self.unit, self.location) {
            (Some(unit), Some(loc)) => write!(f, "{}:{}:{}: ", unit, loc.line, loc.column)?,
            (Some(unit), None) => write!(f, "{}: ", unit)?,
            _ => {}
        }
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Run-wide error and warning tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub errors: usize,
    pub warnings: usize,
}

impl Tally {
    pub fn of(diagnostics: &[Diagnostic]) -> Self {
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        Self {
            errors,
            warnings: diagnostics.len() - errors,
        }
    }
}

/// Byte offset of a 1-based line/column in `text`
fn offset_of(text: &str, location: Location) -> Option<usize> {
    let line_start = if location.line <= 1 {
        0
    } else {
        text.match_indices('\n')
            .nth(location.line as usize - 2)
            .map(|(i, _)| i + 1)?
    };
    let offset = line_start + location.column.saturating_sub(1) as usize;
    (offset <= text.len()).then_some(offset)
}

/// Render diagnostics to a terminal writer.
///
/// `source_text` supplies the contents of a unit's source path when it is
/// available; diagnostics with a location then get a labelled snippet.
pub fn report_diagnostics<W: WriteColor>(
    writer: &mut W,
    diagnostics: &[Diagnostic],
    source_text: impl Fn(&str) -> Option<String>,
) -> Result<(), codespan_reporting::files::Error> {
    let config = Config::default();
    let mut files = SimpleFiles::new();
    for diag in diagnostics {
        let severity = match diag.severity {
            Severity::Error => CodespanSeverity::Error,
            Severity::Warning => CodespanSeverity::Warning,
        };
        let mut rendered = CodespanDiagnostic::new(severity)
            .with_code(diag.kind)
            .with_message(&diag.message);

        let snippet = diag.unit.as_ref().and_then(|unit| {
            let location = diag.location?;
            let text = source_text(unit)?;
            let offset = offset_of(&text, location)?;
            Some((unit.clone(), text, offset))
        });
        match snippet {
            Some((unit, text, offset)) => {
                let end = (offset + 1).min(text.len());
                let file = files.add(unit, text);
                rendered = rendered.with_labels(vec![Label::primary(file, offset..end)]);
            }
            None => {
                if let Some(unit) = &diag.unit {
                    let at = match diag.location {
                        Some(loc) => format!("{}:{}:{}", unit, loc.line, loc.column),
                        None => unit.clone(),
                    };
                    rendered = rendered.with_notes(vec![format!("in {}", at)]);
                }
            }
        }
        emit(writer, &config, &files, &rendered)?;
    }
    Ok(())
}
