//! Conversion orchestration between an XML file and a folder of CSV tables.
//!
//! [`TableConverter`] is the public entry point used by the CLI. Its
//! operations return a plain `bool` and record what went wrong (or what was
//! merely suspicious) in `latest_errors` / `latest_warnings`, so callers can
//! report without unwinding. A `summary.txt` sidecar written next to the
//! tables carries the conversion timestamp, per-table record counts, and the
//! root attributes that have no table column of their own.

use std::fs;
use std::path::Path;

use crate::build::build_activities;
use crate::error::{ConvertError, ConvertResult, ExtractError};
use crate::extract::{extract_document, parse_document, root_linked_data_default};
use crate::models::IatiActivities;
use crate::schema::{cell, locate_table_file, Row, TableId, TableSet, TableSpec, TABLES};
use crate::validation::{read_rows, validate_folder};
use crate::xml::to_xml_string;

// =============================================================================
// Converter
// =============================================================================

/// Bidirectional XML / CSV-folder converter.
#[derive(Debug, Default)]
pub struct TableConverter {
    /// Errors from the most recent operation.
    pub latest_errors: Vec<String>,
    /// Warnings from the most recent operation.
    pub latest_warnings: Vec<String>,
}

impl TableConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert an XML document to a folder of CSV tables.
    ///
    /// `xml_input` is a file path if one exists there, otherwise it is taken
    /// as inline XML. With `overwrite` the output folder is recreated from
    /// scratch. Every table file is written, header included, even when it
    /// has no rows. On failure, files written so far are left in place.
    pub fn xml_to_tables(&mut self, xml_input: &str, output_folder: &Path, overwrite: bool) -> bool {
        self.latest_errors.clear();
        self.latest_warnings.clear();

        match convert_xml_to_tables(xml_input, output_folder, overwrite) {
            Ok(()) => {
                eprintln!(
                    "✅ Successfully converted XML to CSV files in: {}",
                    output_folder.display()
                );
                true
            }
            Err(e) => {
                eprintln!("❌ Error converting XML to CSV: {e}");
                self.latest_errors.push(e.to_string());
                false
            }
        }
    }

    /// Convert a folder of CSV tables to one XML document.
    ///
    /// With `validate_tables` the folder validator runs first and any
    /// error-severity issue aborts the conversion. With `validate_output` the
    /// generated document is re-parsed as a well-formedness check; a failure
    /// there still leaves the written file on disk but flips the result.
    pub fn tables_to_xml(
        &mut self,
        input_folder: &Path,
        xml_output: &Path,
        validate_output: bool,
        validate_tables: bool,
    ) -> bool {
        self.latest_errors.clear();
        self.latest_warnings.clear();

        if !input_folder.is_dir() {
            let e = ConvertError::FolderNotFound(input_folder.display().to_string());
            eprintln!("❌ Error: {e}");
            self.latest_errors.push(e.to_string());
            return false;
        }

        if validate_tables {
            let report = validate_folder(input_folder);
            self.latest_warnings
                .extend(report.warnings().map(|i| i.to_string()));
            if !report.is_valid() {
                self.latest_errors
                    .extend(report.errors().map(|i| i.to_string()));
                return false;
            }
        }

        let xml = match assemble_xml(input_folder) {
            Ok(xml) => xml,
            Err(e) => {
                eprintln!("❌ Error converting CSV to XML: {e}");
                self.latest_errors.push(e.to_string());
                return false;
            }
        };

        if let Err(e) = fs::write(xml_output, &xml) {
            eprintln!("❌ Error converting CSV to XML: {e}");
            self.latest_errors.push(ConvertError::Io(e).to_string());
            return false;
        }

        if validate_output {
            if let Err(e) = roxmltree::Document::parse(&xml) {
                eprintln!("⚠️  Warning: generated XML failed the schema check: {e}");
                self.latest_errors = vec![format!("Schema: {e}")];
                return false;
            }
        }

        eprintln!(
            "✅ Successfully converted CSV files to XML: {}",
            xml_output.display()
        );
        true
    }

    /// Write template CSV files (optionally a subset of tables), plus a
    /// README describing the folder layout.
    pub fn generate_templates(
        &mut self,
        output_folder: &Path,
        include_examples: bool,
        tables: Option<&[TableId]>,
    ) -> bool {
        self.latest_errors.clear();
        self.latest_warnings.clear();

        match write_templates(output_folder, include_examples, tables) {
            Ok(()) => {
                eprintln!("✅ Generated CSV templates in: {}", output_folder.display());
                true
            }
            Err(e) => {
                eprintln!("❌ Error generating templates: {e}");
                self.latest_errors.push(e.to_string());
                false
            }
        }
    }
}

// =============================================================================
// XML -> Tables
// =============================================================================

fn convert_xml_to_tables(
    xml_input: &str,
    output_folder: &Path,
    overwrite: bool,
) -> ConvertResult<()> {
    if output_folder.exists() && overwrite {
        fs::remove_dir_all(output_folder)?;
    }
    fs::create_dir_all(output_folder)?;

    let xml = load_xml_input(xml_input)?;
    let document = parse_document(&xml)?;
    let tables = extract_document(&document);
    let linked_data_default = root_linked_data_default(&document);

    for spec in TABLES.iter() {
        write_table(&output_folder.join(spec.filename), spec, tables.rows(spec.id))?;
    }
    write_summary(output_folder, &tables, &linked_data_default)?;
    Ok(())
}

fn load_xml_input(xml_input: &str) -> ConvertResult<String> {
    let path = Path::new(xml_input);
    if path.exists() {
        Ok(fs::read_to_string(path).map_err(ExtractError::Io)?)
    } else {
        Ok(xml_input.to_string())
    }
}

fn write_table(path: &Path, spec: &TableSpec, rows: &[Row]) -> ConvertResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(spec.columns)?;
    for row in rows {
        writer.write_record(spec.columns.iter().map(|column| cell(row, column)))?;
    }
    writer.flush().map_err(ConvertError::Io)?;
    Ok(())
}

fn write_summary(folder: &Path, tables: &TableSet, linked_data_default: &str) -> ConvertResult<()> {
    let mut summary = String::new();
    summary.push_str("IATI CSV Conversion Summary\n");
    summary.push_str(&"=".repeat(30));
    summary.push_str("\n\n");
    summary.push_str(&format!(
        "Conversion completed: {}\n\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    if !linked_data_default.is_empty() {
        summary.push_str("Root Attributes:\n");
        summary.push_str(&format!("  linked_data_default: {linked_data_default}\n"));
        summary.push('\n');
    }
    summary.push_str("Files created:\n");
    for spec in TABLES.iter() {
        summary.push_str(&format!(
            "  {}: {} records\n",
            spec.filename,
            tables.rows(spec.id).len()
        ));
    }
    summary.push_str(&format!(
        "\nTotal activities: {}\n",
        tables.rows(TableId::Activities).len()
    ));
    fs::write(folder.join("summary.txt"), summary)?;
    Ok(())
}

// =============================================================================
// Tables -> XML
// =============================================================================

fn assemble_xml(folder: &Path) -> ConvertResult<String> {
    let tables = read_tables(folder)?;
    let activities = build_activities(&tables)?;
    let mut document = IatiActivities::new(activities);
    document.linked_data_default = read_linked_data_default(folder)?;
    Ok(to_xml_string(&document)?)
}

/// Load every table that is present; absent tables stay empty. Files are
/// located like the validator does, so `ORG-transactions.csv` still counts.
fn read_tables(folder: &Path) -> ConvertResult<TableSet> {
    let mut tables = TableSet::new();
    for spec in TABLES.iter() {
        if let Some(path) = locate_table_file(folder, spec) {
            let (_, rows) = read_rows(&path)?;
            tables.set(spec.id, rows);
        }
    }
    Ok(tables)
}

/// Root attributes ride in `summary.txt` because they have no table column.
fn read_linked_data_default(folder: &Path) -> ConvertResult<String> {
    let path = folder.join("summary.txt");
    if !path.exists() {
        return Ok(String::new());
    }
    let content = fs::read_to_string(path)?;
    for line in content.lines() {
        if let Some(value) = line.trim().strip_prefix("linked_data_default:") {
            return Ok(value.trim().to_string());
        }
    }
    Ok(String::new())
}

// =============================================================================
// Templates
// =============================================================================

fn write_templates(
    folder: &Path,
    include_examples: bool,
    tables: Option<&[TableId]>,
) -> ConvertResult<()> {
    fs::create_dir_all(folder)?;
    let selected: Vec<TableId> = match tables {
        Some(subset) => subset.to_vec(),
        None => TableId::ALL.to_vec(),
    };
    for table in selected {
        let spec = table.spec();
        let rows = if include_examples {
            example_rows(table)
        } else {
            Vec::new()
        };
        write_table(&folder.join(spec.filename), spec, &rows)?;
    }
    fs::write(folder.join("README.md"), TEMPLATE_README)?;
    Ok(())
}

fn example_row(cells: &[(&str, &str)]) -> Row {
    cells
        .iter()
        .map(|(column, value)| ((*column).to_string(), (*value).to_string()))
        .collect()
}

/// Realistic sample rows for the template tables that benefit from them.
/// Tables without examples get a header-only template.
fn example_rows(table: TableId) -> Vec<Row> {
    match table {
        TableId::Activities => vec![example_row(&[
            ("activity_identifier", "XM-DAC-46002-CR-2025"),
            ("title", "Rural Road Infrastructure Development Project"),
            (
                "description",
                "This project aims to improve rural connectivity and market access through \
                 the rehabilitation and upgrading of 150km of rural roads in southeastern \
                 Costa Rica.",
            ),
            ("activity_status", "2"),
            ("activity_scope", "4"),
            ("default_currency", "USD"),
            ("humanitarian", "0"),
            ("hierarchy", "1"),
            ("xml_lang", "en"),
            ("reporting_org_ref", "XM-DAC-46002"),
            (
                "reporting_org_name",
                "Central American Bank for Economic Integration",
            ),
            ("reporting_org_type", "40"),
            ("reporting_org_role", "1"),
            ("planned_start_date", "2023-01-15"),
            ("actual_start_date", "2023-02-01"),
            ("planned_end_date", "2025-12-31"),
            ("recipient_country_code", "CR"),
            ("recipient_country_name", "Costa Rica"),
            ("recipient_country_lang", "es"),
            ("collaboration_type", "1"),
            ("default_flow_type", "10"),
            ("default_finance_type", "110"),
            ("default_aid_type", "C01"),
            ("default_tied_status", "5"),
        ])],
        TableId::ParticipatingOrgs => vec![
            example_row(&[
                ("activity_identifier", "XM-DAC-46002-CR-2025"),
                ("org_ref", "XM-DAC-46002"),
                (
                    "org_name",
                    "Central American Bank for Economic Integration",
                ),
                ("org_name_lang", "en"),
                ("org_type", "40"),
                ("role", "1"),
            ]),
            example_row(&[
                ("activity_identifier", "XM-DAC-46002-CR-2025"),
                ("org_ref", "CR-MOPT"),
                (
                    "org_name",
                    "Ministry of Public Works and Transportation, Costa Rica",
                ),
                ("org_name_lang", "es"),
                ("org_type", "10"),
                ("role", "4"),
            ]),
        ],
        TableId::ContactInfo => vec![example_row(&[
            ("activity_identifier", "XM-DAC-46002-CR-2025"),
            ("contact_type", "1"),
            (
                "organisation",
                "Central American Bank for Economic Integration",
            ),
            ("organisation_lang", "en"),
            ("department", "Infrastructure Projects Division"),
            ("department_lang", "en"),
            ("person_name", "Ana García"),
            ("person_name_lang", "es"),
            ("person_name_present", "1"),
            ("job_title", "Project Manager"),
            ("job_title_lang", "en"),
            ("telephone", "+506-2123-4567"),
            ("email", "ana.garcia@bcie.org"),
            ("email_present", "1"),
            ("website", "https://www.bcie.org"),
            ("mailing_address", "Tegucigalpa M.D.C., Honduras"),
            ("mailing_address_lang", "es"),
        ])],
        TableId::Results => vec![example_row(&[
            ("activity_identifier", "XM-DAC-46002-CR-2025"),
            ("result_ref", "result_1"),
            ("result_type", "1"),
            ("aggregation_status", "true"),
            ("title", "Improved rural road infrastructure"),
            (
                "description",
                "Rural roads rehabilitated and upgraded to improve connectivity",
            ),
        ])],
        TableId::Descriptions => vec![
            example_row(&[
                ("activity_identifier", "XM-DAC-46002-CR-2025"),
                ("description_type", "1"),
                ("description_sequence", "1"),
                ("narrative", "Primary activity description"),
                ("narrative_lang", "en"),
                ("narrative_sequence", "1"),
            ]),
            example_row(&[
                ("activity_identifier", "XM-DAC-46002-CR-2025"),
                ("description_type", "2"),
                ("description_sequence", "2"),
                ("narrative", "Secondary summary for beneficiaries"),
                ("narrative_lang", "en"),
                ("narrative_sequence", "1"),
            ]),
        ],
        TableId::Documents => vec![example_row(&[
            ("activity_identifier", "XM-DAC-46002-CR-2025"),
            ("url", "https://example.org/documents/project-summary.pdf"),
            ("format", "application/pdf"),
            ("title", "Project summary"),
            ("title_lang", "en"),
            ("description", "Detailed design and financing summary"),
            ("description_lang", "en"),
            ("category_code", "A01"),
            ("language_code", "en"),
            ("document_date", "2024-03-15"),
        ])],
        TableId::CountryBudgetItems => vec![example_row(&[
            ("activity_identifier", "XM-DAC-46002-CR-2025"),
            ("vocabulary", "1"),
            ("budget_item_code", "CR-2025-01"),
            ("budget_item_percentage", "50"),
            ("description", "Road rehabilitation"),
            ("description_lang", "en"),
        ])],
        _ => Vec::new(),
    }
}

const TEMPLATE_README: &str = r#"# IATI CSV Templates

This folder contains CSV templates for entering IATI activity data. Each CSV file represents a
different aspect of IATI activities:

## Files Description

- **activities.csv**: Main activity information (identifier, title, description, etc.)
- **participating_orgs.csv**: Organizations participating in activities
- **sectors.csv**: Sector classifications for activities
- **budgets.csv**: Budget information for activities
- **transactions.csv**: Financial transactions
- **locations.csv**: Geographic locations
- **documents.csv**: Document links
- **results.csv**: Results and outcomes
- **indicators.csv**: Indicators for results
- **contact_info.csv**: Contact information

## Key Relationships

- All files use `activity_identifier` to link data to specific activities
- The `activity_identifier` must match between files
- Results and indicators are linked via `result_ref`

## Usage Instructions

1. Start by filling out **activities.csv** with your main activity data
2. Add related data in other CSV files using the same `activity_identifier`
3. Use the conversion tool to generate IATI XML from these CSV files

## Important Notes

- The `activity_identifier` must be unique and follow IATI standards
- Dates should be in ISO format (YYYY-MM-DD)
- Use standard IATI code lists for codes (status, types, etc.)
- Empty fields are allowed but required fields should be filled

## Example Activity Identifier Format

`{organization-identifier}-{project-code}`

Example: `XM-DAC-46002-CR-2025`
"#;

// =============================================================================
// Tests
// =============================================================================
