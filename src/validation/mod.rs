//! CSV validation engine.
//!
//! Pre-conversion layer that reports data problems with row and column detail
//! before any activity objects are built. Three tiers:
//!
//! - [`checks`] - stateless cell checks ([`checks::Check`]);
//! - [`rules`] - per-table column rule sets keyed by [`TableId`];
//! - [`cross`] / [`folder`] - relationships across tables and the folder
//!   orchestrator ([`folder::validate_folder`]).
//!
//! Only [`Severity::Error`] issues make a report invalid; warnings ride along.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::schema::{Row, TableSpec};

pub mod checks;
pub mod cross;
pub mod folder;
pub mod rules;

pub use checks::Check;
pub use cross::validate_cross;
pub use folder::validate_folder;
pub use rules::{rules_for, ColumnRule};

// =============================================================================
// Issue Model
// =============================================================================

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Categorized issue codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    // Field-level
    RequiredField,
    InvalidDate,
    InvalidDatetime,
    InvalidInteger,
    InvalidDecimal,
    InvalidEnum,
    InvalidPercentage,
    InvalidBoolean,
    InvalidUrl,
    InvalidCurrency,
    InvalidLanguage,
    InvalidCrsCode,
    // Structural
    MissingColumn,
    MissingFile,
    EmptyFile,
    DuplicateRow,
    // Cross-table
    OrphanReference,
    PercentageSum,
    // Everything else
    Custom,
}

/// A single problem found in the CSV data.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// 1-based row number; the header is row 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ValidationIssue {
    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            file_name: None,
            row_number: None,
            column_name: None,
            value: None,
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    pub fn in_file(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn at_row(mut self, row_number: usize) -> Self {
        self.row_number = Some(row_number);
        self
    }

    pub fn in_column(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = Some(column_name.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(file_name) = &self.file_name {
            parts.push(file_name.clone());
        }
        if let Some(row) = self.row_number {
            parts.push(format!("row {row}"));
        }
        if let Some(column) = &self.column_name {
            parts.push(format!("column '{column}'"));
        }
        let prefix = format!("[{}]", self.severity.as_str().to_uppercase());
        if parts.is_empty() {
            write!(f, "{prefix} {}", self.message)
        } else {
            write!(f, "{prefix} {}: {}", parts.join(", "), self.message)
        }
    }
}

/// Aggregated validation outcome.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no error-severity issue is present.
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }
}

// =============================================================================
// Per-File Engine
// =============================================================================

/// Validate one CSV file against its table's column rules.
///
/// Rows are numbered from 2 so messages line up with a spreadsheet view.
/// A required column that is empty produces one error and suppresses the
/// remaining checks for that cell; non-empty cells run every paired check.
pub fn validate_file(path: &Path, spec: &TableSpec) -> ValidationReport {
    let mut report = ValidationReport::new();
    let file_name = file_label(path);

    if !path.exists() {
        report.push(
            ValidationIssue::error(
                IssueCode::MissingFile,
                format!("File not found: {file_name}"),
            )
            .in_file(&file_name),
        );
        return report;
    }

    let (headers, rows) = match read_rows(path) {
        Ok(read) => read,
        Err(e) => {
            report.push(
                ValidationIssue::error(IssueCode::Custom, format!("Error reading CSV: {e}"))
                    .in_file(&file_name),
            );
            return report;
        }
    };

    if rows.is_empty() {
        report.push(
            ValidationIssue::warning(
                IssueCode::EmptyFile,
                format!("File has no data rows: {file_name}"),
            )
            .in_file(&file_name),
        );
        return report;
    }

    for column in spec.columns {
        if !headers.iter().any(|h| h == column) {
            report.push(
                ValidationIssue::warning(
                    IssueCode::MissingColumn,
                    format!("Expected column '{column}' not found"),
                )
                .in_file(&file_name)
                .in_column(*column),
            );
        }
    }

    let table_rules = rules_for(spec.id);
    for (row_idx, row) in rows.iter().enumerate() {
        let row_number = row_idx + 2;
        for rule in &table_rules {
            let value = row.get(rule.column).map(|v| v.trim()).unwrap_or("");
            if rule.required && value.is_empty() {
                report.push(
                    ValidationIssue::error(
                        IssueCode::RequiredField,
                        format!("Required field '{}' is empty", rule.column),
                    )
                    .in_file(&file_name)
                    .at_row(row_number)
                    .in_column(rule.column)
                    .with_value(value),
                );
                continue;
            }
            if value.is_empty() {
                continue;
            }
            for (check, code) in &rule.checks {
                if let Some(message) = check.apply(value) {
                    report.push(
                        ValidationIssue::error(*code, message)
                            .in_file(&file_name)
                            .at_row(row_number)
                            .in_column(rule.column)
                            .with_value(value),
                    );
                }
            }
        }
    }

    report
}

/// Read a CSV file into header-keyed rows. Ragged records are tolerated;
/// short rows simply leave cells absent.
pub fn read_rows(path: &Path) -> Result<(Vec<String>, Vec<Row>), csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = Row::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            row.insert(header.clone(), cell.to_string());
        }
        rows.push(row);
    }
    Ok((headers, rows))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// =============================================================================
// Tests
// =============================================================================
