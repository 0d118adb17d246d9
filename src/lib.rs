//! # iati-tables - IATI activity XML / CSV mapping and validation
//!
//! iati-tables maps IATI 2.03 activity XML documents onto a folder of flat
//! CSV tables that non-technical staff can edit in a spreadsheet, validates
//! the edited tables, and rebuilds standard XML from them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  IATI XML   │────▶│   extract   │────▶│ CSV tables  │────▶│ validation  │
//! │   (2.03)    │     │ (roxmltree) │     │ (16 files)  │     │  (reports)  │
//! └─────────────┘     └─────────────┘     └──────┬──────┘     └─────────────┘
//!                                                │
//!                                                ▼
//!                                         ┌─────────────┐     ┌─────────────┐
//!                                         │    build    │────▶│  IATI XML   │
//!                                         │  (models)   │     │ (quick-xml) │
//!                                         └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use iati_tables::TableConverter;
//! use std::path::Path;
//!
//! fn main() {
//!     let mut converter = TableConverter::new();
//!     converter.xml_to_tables("activities.xml", Path::new("./tables"), true);
//!     converter.tables_to_xml(Path::new("./tables"), Path::new("rebuilt.xml"), true, true);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (Activity, Transaction, Narrative)
//! - [`schema`] - Table layout, column lists, and file naming
//! - [`extract`] - XML document to table rows
//! - [`build`] - Table rows to activity models
//! - [`xml`] - Activity models to XML text
//! - [`validation`] - Per-cell and cross-file CSV validation
//! - [`convert`] - Folder-level conversion orchestration

// Core modules
pub mod error;
pub mod models;
pub mod schema;

// XML -> tables
pub mod extract;

// Tables -> XML
pub mod build;
pub mod xml;

// Validation
pub mod validation;

// Orchestration
pub mod convert;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{BuildError, ConvertError, ExtractError, ValidationError, XmlError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Activity,
    ActivityDateType,
    Budget,
    CodeList,
    DocumentLink,
    IatiActivities,
    Indicator,
    Location,
    Narrative,
    Transaction,
};

// =============================================================================
// Re-exports - Schema
// =============================================================================

pub use schema::{cell, locate_table_file, Row, TableId, TableSet, TableSpec, TABLES};

// =============================================================================
// Re-exports - Extraction
// =============================================================================

pub use extract::{extract_document, parse_document, root_linked_data_default};

// =============================================================================
// Re-exports - Building
// =============================================================================

pub use build::build_activities;
pub use xml::to_xml_string;

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    rules_for,
    validate_cross,
    validate_file,
    validate_folder,
    Check,
    ColumnRule,
    IssueCode,
    Severity,
    ValidationIssue,
    ValidationReport,
};

// =============================================================================
// Re-exports - Conversion
// =============================================================================

pub use convert::TableConverter;
