//! Checks that span tables: foreign keys, sector percentage sums, the
//! result/indicator/period chain, and activity-date coverage.

use std::collections::{HashMap, HashSet};

use crate::models::codelist::ActivityDateType;
use crate::schema::{cell, Row, TableId, TableSet};
use crate::validation::{IssueCode, ValidationIssue, ValidationReport};

/// Tables that carry an `activity_identifier` foreign key.
const FK_TABLES: [TableId; 15] = [
    TableId::ParticipatingOrgs,
    TableId::Sectors,
    TableId::Budgets,
    TableId::Transactions,
    TableId::TransactionSectors,
    TableId::Locations,
    TableId::Documents,
    TableId::Results,
    TableId::Indicators,
    TableId::IndicatorPeriods,
    TableId::ActivityDate,
    TableId::ContactInfo,
    TableId::Conditions,
    TableId::Descriptions,
    TableId::CountryBudgetItems,
];

/// Run every cross-table check over loaded rows.
pub fn validate_cross(tables: &TableSet) -> ValidationReport {
    let mut report = ValidationReport::new();

    let activity_ids: HashSet<&str> = tables
        .rows(TableId::Activities)
        .iter()
        .map(|row| cell(row, "activity_identifier").trim())
        .filter(|aid| !aid.is_empty())
        .collect();

    for table in FK_TABLES {
        check_activity_fk(tables.rows(table), table, &activity_ids, &mut report);
    }

    check_sector_percentages(tables.rows(TableId::Sectors), &mut report);
    check_ref_chain(
        tables.rows(TableId::Results),
        tables.rows(TableId::Indicators),
        "result_ref",
        TableId::Indicators,
        "results.csv",
        &mut report,
    );
    check_ref_chain(
        tables.rows(TableId::Indicators),
        tables.rows(TableId::IndicatorPeriods),
        "indicator_ref",
        TableId::IndicatorPeriods,
        "indicators.csv",
        &mut report,
    );
    check_date_coverage(tables, &mut report);

    report
}

fn check_activity_fk(
    rows: &[Row],
    table: TableId,
    activity_ids: &HashSet<&str>,
    report: &mut ValidationReport,
) {
    let file_name = table.spec().filename;
    for (idx, row) in rows.iter().enumerate() {
        let aid = cell(row, "activity_identifier").trim();
        if !aid.is_empty() && !activity_ids.contains(aid) {
            report.push(
                ValidationIssue::error(
                    IssueCode::OrphanReference,
                    format!("activity_identifier '{aid}' not found in activities.csv"),
                )
                .in_file(file_name)
                .at_row(idx + 2)
                .in_column("activity_identifier")
                .with_value(aid),
            );
        }
    }
}

/// Percentages across an activity's sector rows should add up to about 100.
/// Unparseable cells are the per-file validator's problem and are skipped here.
fn check_sector_percentages(rows: &[Row], report: &mut ValidationReport) {
    let mut order: Vec<String> = Vec::new();
    let mut sums: HashMap<String, f64> = HashMap::new();
    for row in rows {
        let aid = cell(row, "activity_identifier").trim();
        let pct = cell(row, "percentage").trim();
        if aid.is_empty() || pct.is_empty() {
            continue;
        }
        if let Ok(value) = pct.parse::<f64>() {
            if !sums.contains_key(aid) {
                order.push(aid.to_string());
            }
            *sums.entry(aid.to_string()).or_insert(0.0) += value;
        }
    }
    for aid in order {
        let total = sums[&aid];
        if (total - 100.0).abs() > 0.01 {
            report.push(
                ValidationIssue::warning(
                    IssueCode::PercentageSum,
                    format!("Sector percentages for activity '{aid}' sum to {total}, expected ~100"),
                )
                .in_file("sectors.csv")
                .in_column("percentage"),
            );
        }
    }
}

/// A child table's reference column must point at a row of its parent table.
/// Skipped entirely when the parent has no refs, so partial folders validate.
fn check_ref_chain(
    parent_rows: &[Row],
    child_rows: &[Row],
    ref_column: &str,
    child_table: TableId,
    parent_file: &str,
    report: &mut ValidationReport,
) {
    let parent_refs: HashSet<&str> = parent_rows
        .iter()
        .map(|row| cell(row, ref_column).trim())
        .filter(|r| !r.is_empty())
        .collect();
    if parent_refs.is_empty() {
        return;
    }
    let file_name = child_table.spec().filename;
    for (idx, row) in child_rows.iter().enumerate() {
        let reference = cell(row, ref_column).trim();
        if !reference.is_empty() && !parent_refs.contains(reference) {
            report.push(
                ValidationIssue::error(
                    IssueCode::OrphanReference,
                    format!("{ref_column} '{reference}' not found in {parent_file}"),
                )
                .in_file(file_name)
                .at_row(idx + 2)
                .in_column(ref_column)
                .with_value(reference),
            );
        }
    }
}

/// Every activity needs at least one date, either in the inline columns or as
/// an `activity_date.csv` row.
fn check_date_coverage(tables: &TableSet, report: &mut ValidationReport) {
    let dated_ids: HashSet<&str> = tables
        .rows(TableId::ActivityDate)
        .iter()
        .map(|row| cell(row, "activity_identifier").trim())
        .filter(|aid| !aid.is_empty())
        .collect();

    for (idx, row) in tables.rows(TableId::Activities).iter().enumerate() {
        let aid = cell(row, "activity_identifier").trim();
        if aid.is_empty() {
            continue;
        }
        let has_inline_date = ActivityDateType::ALL
            .iter()
            .any(|kind| !cell(row, kind.main_column()).trim().is_empty());
        if !has_inline_date && !dated_ids.contains(aid) {
            report.push(
                ValidationIssue::error(
                    IssueCode::RequiredField,
                    format!(
                        "Activity '{aid}' has no activity-date: populate a date column or add \
                         a row to activity_date.csv"
                    ),
                )
                .in_file("activities.csv")
                .at_row(idx + 2),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> Row {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn activity(aid: &str) -> Row {
        row(&[("activity_identifier", aid), ("planned_start_date", "2024-01-01")])
    }

    #[test]
    fn test_orphan_reference_reported_with_row_number() {
        let mut tables = TableSet::new();
        tables.push(TableId::Activities, activity("AA-1"));
        tables.push(TableId::Sectors, row(&[("activity_identifier", "AA-1")]));
        tables.push(TableId::Sectors, row(&[("activity_identifier", "AA-9")]));
        let report = validate_cross(&tables);
        let orphans: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::OrphanReference)
            .collect();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].row_number, Some(3));
        assert_eq!(orphans[0].file_name.as_deref(), Some("sectors.csv"));
        assert_eq!(
            orphans[0].message,
            "activity_identifier 'AA-9' not found in activities.csv"
        );
    }

    #[test]
    fn test_empty_identifier_rows_are_skipped() {
        let mut tables = TableSet::new();
        tables.push(TableId::Activities, activity("AA-1"));
        tables.push(TableId::Budgets, row(&[("activity_identifier", "  ")]));
        let report = validate_cross(&tables);
        assert!(!report
            .issues
            .iter()
            .any(|i| i.code == IssueCode::OrphanReference));
    }

    #[test]
    fn test_sector_percentage_sum_warning() {
        let mut tables = TableSet::new();
        tables.push(TableId::Activities, activity("AA-1"));
        tables.push(TableId::Activities, activity("AA-2"));
        for (aid, pct) in [("AA-1", "60"), ("AA-1", "30"), ("AA-2", "60"), ("AA-2", "40")] {
            tables.push(
                TableId::Sectors,
                row(&[("activity_identifier", aid), ("percentage", pct)]),
            );
        }
        let report = validate_cross(&tables);
        let sums: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::PercentageSum)
            .collect();
        assert_eq!(sums.len(), 1);
        assert_eq!(sums[0].severity, crate::validation::Severity::Warning);
        assert!(sums[0].message.contains("'AA-1'"));
        assert_eq!(sums[0].row_number, None);
    }

    #[test]
    fn test_unparseable_percentages_left_to_file_checks() {
        let mut tables = TableSet::new();
        tables.push(TableId::Activities, activity("AA-1"));
        tables.push(
            TableId::Sectors,
            row(&[("activity_identifier", "AA-1"), ("percentage", "lots")]),
        );
        let report = validate_cross(&tables);
        assert!(!report.issues.iter().any(|i| i.code == IssueCode::PercentageSum));
    }

    #[test]
    fn test_indicator_chain_orphans() {
        let mut tables = TableSet::new();
        tables.push(TableId::Activities, activity("AA-1"));
        tables.push(
            TableId::Results,
            row(&[("activity_identifier", "AA-1"), ("result_ref", "r1")]),
        );
        tables.push(
            TableId::Indicators,
            row(&[
                ("activity_identifier", "AA-1"),
                ("result_ref", "r2"),
                ("indicator_ref", "i1"),
            ]),
        );
        tables.push(
            TableId::IndicatorPeriods,
            row(&[
                ("activity_identifier", "AA-1"),
                ("result_ref", "r1"),
                ("indicator_ref", "i9"),
            ]),
        );
        let report = validate_cross(&tables);
        let messages: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::OrphanReference)
            .map(|i| i.message.as_str())
            .collect();
        assert!(messages.contains(&"result_ref 'r2' not found in results.csv"));
        assert!(messages.contains(&"indicator_ref 'i9' not found in indicators.csv"));
    }

    #[test]
    fn test_chain_check_skipped_without_parent_rows() {
        let mut tables = TableSet::new();
        tables.push(TableId::Activities, activity("AA-1"));
        tables.push(
            TableId::Indicators,
            row(&[
                ("activity_identifier", "AA-1"),
                ("result_ref", "r1"),
                ("indicator_ref", "i1"),
            ]),
        );
        let report = validate_cross(&tables);
        assert!(!report
            .issues
            .iter()
            .any(|i| i.code == IssueCode::OrphanReference));
    }

    #[test]
    fn test_missing_activity_dates_error() {
        let mut tables = TableSet::new();
        tables.push(TableId::Activities, row(&[("activity_identifier", "ORG-001")]));
        let report = validate_cross(&tables);
        let date_errors: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::RequiredField && i.message.contains("activity-date"))
            .collect();
        assert_eq!(date_errors.len(), 1);
        assert!(date_errors[0].message.contains("ORG-001"));
        assert_eq!(date_errors[0].row_number, Some(2));
    }

    #[test]
    fn test_inline_date_satisfies_coverage() {
        let mut tables = TableSet::new();
        tables.push(TableId::Activities, activity("ORG-001"));
        let report = validate_cross(&tables);
        assert!(!report.issues.iter().any(|i| i.message.contains("activity-date")));
    }

    #[test]
    fn test_activity_date_row_satisfies_coverage() {
        let mut tables = TableSet::new();
        tables.push(TableId::Activities, row(&[("activity_identifier", "ORG-001")]));
        tables.push(
            TableId::ActivityDate,
            row(&[
                ("activity_identifier", "ORG-001"),
                ("type", "1"),
                ("iso_date", "2024-01-01"),
            ]),
        );
        let report = validate_cross(&tables);
        assert!(!report.issues.iter().any(|i| i.message.contains("activity-date")));
    }
}
