//! Canonical table schema for the CSV side of the conversion.
//!
//! One static configuration (table identities, file names, required-ness,
//! and bit-exact column orders) shared by extraction, build, validation, and
//! the converter. Nothing else in the crate defines column lists.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One CSV row: string-keyed cells, always text.
pub type Row = HashMap<String, String>;

/// Cell accessor with the empty string for absent columns.
pub fn cell<'a>(row: &'a Row, column: &str) -> &'a str {
    row.get(column).map(String::as_str).unwrap_or("")
}

// =============================================================================
// Table Identity
// =============================================================================

/// Identity of one table in the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableId {
    Activities,
    ParticipatingOrgs,
    Sectors,
    Budgets,
    Transactions,
    TransactionSectors,
    Locations,
    Documents,
    Results,
    Indicators,
    IndicatorPeriods,
    ActivityDate,
    ContactInfo,
    Conditions,
    Descriptions,
    CountryBudgetItems,
}

impl TableId {
    /// Every table, in canonical write order.
    pub const ALL: [TableId; 16] = [
        TableId::Activities,
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

    /// Stable snake_case key, also the file stem.
    pub fn key(self) -> &'static str {
        self.spec().key
    }

    /// Parse a key back to its table.
    pub fn from_key(key: &str) -> Option<TableId> {
        TableId::ALL.into_iter().find(|id| id.key() == key)
    }

    /// The canonical spec for this table.
    pub fn spec(self) -> &'static TableSpec {
        &TABLES[self as usize]
    }
}

// =============================================================================
// Table Specification
// =============================================================================

/// Static description of one table.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub id: TableId,
    /// Schema key and file stem.
    pub key: &'static str,
    /// File name on disk.
    pub filename: &'static str,
    /// Whether a conversion unit must contain this table.
    pub required: bool,
    /// Column names in write order. The first column is always
    /// `activity_identifier`.
    pub columns: &'static [&'static str],
}

/// The canonical schema, indexed by `TableId as usize`.
pub static TABLES: [TableSpec; 16] = [
    TableSpec {
        id: TableId::Activities,
        key: "activities",
        filename: "activities.csv",
        required: true,
        columns: &[
            "activity_identifier",
            "title",
            "title_lang",
            "description",
            "description_lang",
            "activity_status",
            "activity_scope",
            "default_currency",
            "humanitarian",
            "hierarchy",
            "last_updated_datetime",
            "xml_lang",
            "reporting_org_ref",
            "reporting_org_name",
            "reporting_org_name_lang",
            "reporting_org_type",
            "reporting_org_role",
            "reporting_org_secondary_reporter",
            "planned_start_date",
            "actual_start_date",
            "planned_end_date",
            "actual_end_date",
            "recipient_country_code",
            "recipient_country_percentage",
            "recipient_country_name",
            "recipient_country_lang",
            "recipient_region_code",
            "recipient_region_percentage",
            "recipient_region_name",
            "recipient_region_lang",
            "collaboration_type",
            "default_flow_type",
            "default_finance_type",
            "default_aid_type",
            "default_aid_type_vocabulary",
            "default_tied_status",
            "conditions_attached",
        ],
    },
    TableSpec {
        id: TableId::ParticipatingOrgs,
        key: "participating_orgs",
        filename: "participating_orgs.csv",
        required: false,
        columns: &[
            "activity_identifier",
            "org_ref",
            "org_name",
            "org_name_lang",
            "org_type",
            "role",
            "activity_id",
            "crs_channel_code",
        ],
    },
    TableSpec {
        id: TableId::Sectors,
        key: "sectors",
        filename: "sectors.csv",
        required: false,
        columns: &[
            "activity_identifier",
            "sector_code",
            "sector_name",
            "vocabulary",
            "vocabulary_uri",
            "percentage",
        ],
    },
    TableSpec {
        id: TableId::Budgets,
        key: "budgets",
        filename: "budgets.csv",
        required: false,
        columns: &[
            "activity_identifier",
            "budget_type",
            "budget_status",
            "period_start",
            "period_end",
            "value",
            "currency",
            "value_date",
        ],
    },
    TableSpec {
        id: TableId::Transactions,
        key: "transactions",
        filename: "transactions.csv",
        required: false,
        columns: &[
            "activity_identifier",
            "transaction_ref",
            "transaction_type",
            "transaction_date",
            "value",
            "currency",
            "value_date",
            "description",
            "description_lang",
            "provider_org_ref",
            "provider_org_name",
            "provider_org_lang",
            "provider_org_type",
            "receiver_org_ref",
            "receiver_org_name",
            "receiver_org_lang",
            "receiver_org_type",
            "receiver_org_activity_id",
            "disbursement_channel",
            "flow_type",
            "finance_type",
            "aid_type",
            "aid_type_vocabulary",
            "tied_status",
            "humanitarian",
            "recipient_region",
        ],
    },
    TableSpec {
        id: TableId::TransactionSectors,
        key: "transaction_sectors",
        filename: "transaction_sectors.csv",
        required: false,
        columns: &[
            "activity_identifier",
            "transaction_ref",
            "transaction_type",
            "sector_code",
            "sector_name",
            "vocabulary",
            "vocabulary_uri",
        ],
    },
    TableSpec {
        id: TableId::Locations,
        key: "locations",
        filename: "locations.csv",
        required: false,
        columns: &[
            "activity_identifier",
            "location_ref",
            "location_reach",
            "location_id_vocabulary",
            "location_id_code",
            "name",
            "name_lang",
            "description",
            "description_lang",
            "activity_description",
            "activity_description_lang",
            "latitude",
            "longitude",
            "exactness",
            "location_class",
            "feature_designation",
            "administrative_vocabulary",
            "administrative_level",
            "administrative_code",
            "administrative_country",
        ],
    },
    TableSpec {
        id: TableId::Documents,
        key: "documents",
        filename: "documents.csv",
        required: false,
        columns: &[
            "activity_identifier",
            "url",
            "format",
            "title",
            "title_lang",
            "description",
            "description_lang",
            "category_code",
            "language_code",
            "document_date",
        ],
    },
    TableSpec {
        id: TableId::Results,
        key: "results",
        filename: "results.csv",
        required: false,
        columns: &[
            "activity_identifier",
            "result_ref",
            "result_type",
            "aggregation_status",
            "title",
            "description",
        ],
    },
    TableSpec {
        id: TableId::Indicators,
        key: "indicators",
        filename: "indicators.csv",
        required: false,
        columns: &[
            "activity_identifier",
            "result_ref",
            "indicator_ref",
            "indicator_measure",
            "ascending",
            "aggregation_status",
            "title",
            "description",
            "baseline_year",
            "baseline_iso_date",
            "baseline_value",
            "baseline_comment",
        ],
    },
    TableSpec {
        id: TableId::IndicatorPeriods,
        key: "indicator_periods",
        filename: "indicator_periods.csv",
        required: false,
        columns: &[
            "activity_identifier",
            "result_ref",
            "indicator_ref",
            "period_start",
            "period_end",
            "target_value",
            "target_comment",
            "actual_value",
            "actual_comment",
        ],
    },
    TableSpec {
        id: TableId::ActivityDate,
        key: "activity_date",
        filename: "activity_date.csv",
        required: false,
        columns: &[
            "activity_identifier",
            "type",
            "iso_date",
            "narrative",
            "narrative_lang",
        ],
    },
    TableSpec {
        id: TableId::ContactInfo,
        key: "contact_info",
        filename: "contact_info.csv",
        required: false,
        columns: &[
            "activity_identifier",
            "contact_type",
            "organisation",
            "organisation_lang",
            "department",
            "department_lang",
            "person_name",
            "person_name_lang",
            "person_name_present",
            "job_title",
            "job_title_lang",
            "telephone",
            "email",
            "email_present",
            "website",
            "mailing_address",
            "mailing_address_lang",
        ],
    },
    TableSpec {
        id: TableId::Conditions,
        key: "conditions",
        filename: "conditions.csv",
        required: false,
        columns: &["activity_identifier", "condition_type", "condition_text"],
    },
    TableSpec {
        id: TableId::Descriptions,
        key: "descriptions",
        filename: "descriptions.csv",
        required: false,
        columns: &[
            "activity_identifier",
            "description_type",
            "description_sequence",
            "narrative",
            "narrative_lang",
            "narrative_sequence",
        ],
    },
    TableSpec {
        id: TableId::CountryBudgetItems,
        key: "country_budget_items",
        filename: "country_budget_items.csv",
        required: false,
        columns: &[
            "activity_identifier",
            "vocabulary",
            "budget_item_code",
            "budget_item_percentage",
            "description",
            "description_lang",
        ],
    },
];

// =============================================================================
// Table Set
// =============================================================================

/// In-memory rows for every table of one conversion unit.
///
/// Every table is present from construction, so a table with zero rows still
/// gets its header written and the validators see it as empty rather than
/// missing.
#[derive(Debug, Clone)]
pub struct TableSet {
    tables: HashMap<TableId, Vec<Row>>,
}

impl TableSet {
    pub fn new() -> Self {
        let tables = TableId::ALL.into_iter().map(|id| (id, Vec::new())).collect();
        TableSet { tables }
    }

    pub fn push(&mut self, id: TableId, row: Row) {
        self.tables.entry(id).or_default().push(row);
    }

    pub fn set(&mut self, id: TableId, rows: Vec<Row>) {
        self.tables.insert(id, rows);
    }

    pub fn rows(&self, id: TableId) -> &[Row] {
        self.tables.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self, id: TableId) -> usize {
        self.rows(id).len()
    }

    pub fn is_empty(&self, id: TableId) -> bool {
        self.rows(id).is_empty()
    }

    /// Append another set's rows table by table.
    pub fn merge(&mut self, other: TableSet) {
        for (id, rows) in other.tables {
            self.tables.entry(id).or_default().extend(rows);
        }
    }
}

impl Default for TableSet {
    fn default() -> Self {
        TableSet::new()
    }
}

// =============================================================================
// File Location
// =============================================================================

/// Locate a table's file in `folder`.
///
/// Exact names win; otherwise any `.csv` whose stem ends with the expected
/// stem matches, so publisher-prefixed files like `ORG-transactions.csv` are
/// picked up by validation and build alike.
pub fn locate_table_file(folder: &Path, spec: &TableSpec) -> Option<PathBuf> {
    let exact = folder.join(spec.filename);
    if exact.is_file() {
        return Some(exact);
    }

    let entries = std::fs::read_dir(folder).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if stem_matches(stem, spec.key) && path.is_file() {
                return Some(path);
            }
        }
    }
    None
}

/// A stem matches its table key exactly or with a separator-delimited prefix.
/// `transaction_sectors` must never satisfy a `sectors` lookup.
fn stem_matches(stem: &str, key: &str) -> bool {
    if stem == key {
        return true;
    }
    match stem.strip_suffix(key) {
        Some(prefix) => !prefix
            .chars()
            .last()
            .map_or(true, |c| c == '_' || c.is_alphanumeric()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_enum_index_matches_spec_order() {
        for id in TableId::ALL {
            assert_eq!(id.spec().id, id);
        }
    }

    #[test]
    fn test_only_activities_is_required() {
        let required: Vec<_> = TABLES.iter().filter(|t| t.required).collect();
        assert_eq!(required.len(), 1);
        assert_eq!(required[0].id, TableId::Activities);
    }

    #[test]
    fn test_every_table_keyed_by_activity_identifier() {
        for spec in &TABLES {
            assert_eq!(spec.columns[0], "activity_identifier", "{}", spec.key);
        }
    }

    #[test]
    fn test_key_round_trip() {
        for id in TableId::ALL {
            assert_eq!(TableId::from_key(id.key()), Some(id));
        }
        assert_eq!(TableId::from_key("nope"), None);
    }

    #[test]
    fn test_locate_table_file_prefers_exact_then_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let spec = TableId::Transactions.spec();

        assert!(locate_table_file(dir.path(), spec).is_none());

        let prefixed = dir.path().join("ORG-transactions.csv");
        File::create(&prefixed).unwrap();
        assert_eq!(locate_table_file(dir.path(), spec), Some(prefixed.clone()));

        let exact = dir.path().join("transactions.csv");
        File::create(&exact).unwrap();
        assert_eq!(locate_table_file(dir.path(), spec), Some(exact));
    }

    #[test]
    fn test_sectors_lookup_ignores_transaction_sector_files() {
        let dir = tempfile::tempdir().unwrap();
        let spec = TableId::Sectors.spec();
        File::create(dir.path().join("transaction_sectors.csv")).unwrap();
        File::create(dir.path().join("ORG-transaction_sectors.csv")).unwrap();
        assert!(locate_table_file(dir.path(), spec).is_none());

        let sectors = dir.path().join("ORG-sectors.csv");
        File::create(&sectors).unwrap();
        assert_eq!(locate_table_file(dir.path(), spec), Some(sectors));
    }

    #[test]
    fn test_cell_defaults_to_empty() {
        let mut row = Row::new();
        row.insert("title".into(), "Road project".into());
        assert_eq!(cell(&row, "title"), "Road project");
        assert_eq!(cell(&row, "missing"), "");
    }
}
