//! Domain models for IATI activities.
//!
//! This module contains the in-memory activity tree that sits between the flat
//! CSV tables and the XML document:
//!
//! - [`IatiActivities`] - Document root with version and generation metadata
//! - [`Activity`] - One aid activity with all nested entities
//! - [`Narrative`] - Language-tagged human-readable text
//! - [`IndicatorKey`] - Composite synthetic key joining indicator rows
//!
//! All code-valued fields stay as strings: the standard's code lists are
//! validated by the CSV validation engine, not enforced by the model.

use serde::{Deserialize, Serialize};

pub mod codelist;

pub use codelist::{ActivityDateType, CodeList};

// =============================================================================
// Narratives
// =============================================================================

/// Human-readable text with an optional language tag.
///
/// A `lang` of `None` means the source carried no `xml:lang` attribute; this
/// absence must survive a round trip, so it is never defaulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl Narrative {
    /// Narrative without a language tag.
    pub fn new(text: impl Into<String>) -> Self {
        Narrative {
            text: text.into(),
            lang: None,
        }
    }

    /// Narrative from CSV cells: the language is kept only when the cell is
    /// non-empty.
    pub fn from_cells(text: &str, lang: &str) -> Self {
        Narrative {
            text: text.to_string(),
            lang: if lang.is_empty() {
                None
            } else {
                Some(lang.to_string())
            },
        }
    }
}

// =============================================================================
// Tri-State Booleans
// =============================================================================

/// Parse a tri-state attribute cell: `''` stays absent, `'0'` is false, any
/// other value is true.
pub fn tri_state_from_cell(cell: &str) -> Option<bool> {
    match cell {
        "" => None,
        "0" => Some(false),
        _ => Some(true),
    }
}

/// Strict tri-state parse: only `'1'` and `'0'` are recognized, anything else
/// stays absent. Used for `secondary-reporter`.
pub fn tri_state_strict_from_cell(cell: &str) -> Option<bool> {
    match cell {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

/// Encode a tri-state back into its cell form.
pub fn tri_state_to_cell(value: Option<bool>) -> &'static str {
    match value {
        None => "",
        Some(false) => "0",
        Some(true) => "1",
    }
}

// =============================================================================
// Organisations
// =============================================================================

/// Organisation reference used by provider/receiver orgs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgRef {
    pub reference: String,
    pub org_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub narratives: Vec<Narrative>,
}

/// The organisation reporting the activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportingOrg {
    pub reference: String,
    pub org_type: String,
    /// Tri-state: absent, explicit false, explicit true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_reporter: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub narratives: Vec<Narrative>,
}

/// An organisation participating in the activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipatingOrg {
    pub role: String,
    pub reference: String,
    pub org_type: String,
    pub activity_id: String,
    pub crs_channel_code: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub narratives: Vec<Narrative>,
}

// =============================================================================
// Dates, Contact, Geography
// =============================================================================

/// One activity date (planned/actual start/end).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDate {
    pub date_type: String,
    pub iso_date: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub narratives: Vec<Narrative>,
}

/// Contact information, a singleton per activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub contact_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub organisation: Vec<Narrative>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub department: Vec<Narrative>,
    /// `Some` when the source carried a `person-name` element, even empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_name: Option<Vec<Narrative>>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub job_title: Vec<Narrative>,
    pub telephone: String,
    /// `Some` when the source carried an `email` element, even empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub website: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub mailing_address: Vec<Narrative>,
}

/// Country the activity benefits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipientCountry {
    pub code: String,
    pub percentage: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub narratives: Vec<Narrative>,
}

/// Supranational region the activity benefits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipientRegion {
    pub code: String,
    pub percentage: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub narratives: Vec<Narrative>,
}

/// Gazetteer-style location identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationId {
    pub vocabulary: String,
    pub code: String,
}

/// Administrative boundary reference for a location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Administrative {
    pub vocabulary: String,
    pub level: String,
    pub code: String,
    pub country: String,
}

/// WGS84 point, serialized as `<point srsName=…><pos>lat long</pos></point>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub srs_name: String,
    pub latitude: String,
    pub longitude: String,
}

impl Point {
    /// The SRS the standard mandates for `point` elements.
    pub const WGS84: &'static str = "http://www.opengis.net/def/crs/EPSG/0/4326";
}

/// Geographic location of the activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub reference: String,
    pub location_reach: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub name: Vec<Narrative>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub description: Vec<Narrative>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub activity_description: Vec<Narrative>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<Point>,
    pub exactness: String,
    pub location_class: String,
    pub feature_designation: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub administrative: Vec<Administrative>,
}

// =============================================================================
// Classifications
// =============================================================================

/// Sector classification, shared by activities and transactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorRef {
    pub code: String,
    pub vocabulary: String,
    pub vocabulary_uri: String,
    pub percentage: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub narratives: Vec<Narrative>,
}

/// Aid type code with its vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AidType {
    pub code: String,
    pub vocabulary: String,
}

/// One `budget-item` inside `country-budget-items`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetItem {
    pub code: String,
    pub percentage: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub description: Vec<Narrative>,
}

/// Country budget item group, one per vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryBudgetItems {
    pub vocabulary: String,
    pub items: Vec<BudgetItem>,
}

/// Condition attached to the activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub condition_type: String,
    pub text: String,
}

// =============================================================================
// Money
// =============================================================================

/// Activity budget for one period.
///
/// `value` stays the raw source text so a round trip reproduces it exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub budget_type: String,
    pub status: String,
    pub period_start: String,
    pub period_end: String,
    pub value: String,
    pub currency: String,
    pub value_date: String,
}

/// One financial transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_type: String,
    pub date: String,
    pub value: String,
    pub currency: String,
    pub value_date: String,
    pub reference: String,
    /// Tri-state, like the activity-level attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humanitarian: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub description: Vec<Narrative>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_org: Option<OrgRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_org: Option<OrgRef>,
    pub receiver_activity_id: String,
    pub disbursement_channel: String,
    pub flow_type: String,
    pub finance_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aid_type: Option<AidType>,
    pub tied_status: String,
    pub recipient_region: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sectors: Vec<SectorRef>,
}

// =============================================================================
// Documents
// =============================================================================

/// Link to an external document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentLink {
    pub url: String,
    pub format: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub title: Vec<Narrative>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub description: Vec<Narrative>,
    pub category_code: String,
    pub language_code: String,
    pub document_date: String,
}

// =============================================================================
// Results
// =============================================================================

/// Measured value with optional comment, for period targets and actuals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodMeasure {
    pub value: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub comment: Vec<Narrative>,
}

/// Reporting period of an indicator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPeriod {
    pub period_start: String,
    pub period_end: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PeriodMeasure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<PeriodMeasure>,
}

/// Baseline measurement for an indicator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorBaseline {
    pub year: i32,
    pub iso_date: String,
    pub value: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub comment: Vec<Narrative>,
}

/// Indicator measuring a result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub measure: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ascending: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation_status: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub title: Vec<Narrative>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub description: Vec<Narrative>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<IndicatorBaseline>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub periods: Vec<IndicatorPeriod>,
}

/// Result of the activity, with nested indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Result {
    pub result_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation_status: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub title: Vec<Narrative>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub description: Vec<Narrative>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub indicators: Vec<Indicator>,
}

// =============================================================================
// Descriptions / Related Activities
// =============================================================================

/// One description block, possibly multi-narrative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Description {
    /// Description type code; empty means the attribute is omitted.
    pub description_type: String,
    pub narratives: Vec<Narrative>,
}

/// Reference to another IATI activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedActivity {
    pub reference: String,
    pub activity_type: String,
}

// =============================================================================
// Activity
// =============================================================================

/// One aid activity: the root entity of the standard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub iati_identifier: String,
    pub reporting_org: ReportingOrg,
    /// Role of the reporting organisation, defaulting to implementing ("4").
    pub reporting_org_role: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub title: Vec<Narrative>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub descriptions: Vec<Description>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub participating_orgs: Vec<ParticipatingOrg>,
    /// Kept only when the code is a valid activity status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_scope: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub activity_dates: Vec<ActivityDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<ContactInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub recipient_countries: Vec<RecipientCountry>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub recipient_regions: Vec<RecipientRegion>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub locations: Vec<Location>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sectors: Vec<SectorRef>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub country_budget_items: Vec<CountryBudgetItems>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collaboration_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_flow_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_finance_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_aid_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_aid_type_vocabulary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_tied_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions_attached: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub budgets: Vec<Budget>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub transactions: Vec<Transaction>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub document_links: Vec<DocumentLink>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub related_activities: Vec<RelatedActivity>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub results: Vec<Result>,
    pub default_currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<String>,
    pub last_updated_datetime: String,
    pub xml_lang: String,
    /// Tri-state: absent, explicit false, explicit true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humanitarian: Option<bool>,
}

impl Activity {
    /// Fresh activity under `iati_identifier` with the standard defaults.
    pub fn new(iati_identifier: impl Into<String>) -> Self {
        Activity {
            iati_identifier: iati_identifier.into(),
            reporting_org_role: "4".to_string(),
            xml_lang: "en".to_string(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Document Root
// =============================================================================

/// The `iati-activities` document root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IatiActivities {
    pub version: String,
    pub generated_datetime: String,
    /// Root-level `linked-data-default`, round-tripped via the summary sidecar.
    pub linked_data_default: String,
    pub activities: Vec<Activity>,
}

impl IatiActivities {
    /// The standard version this crate produces.
    pub const VERSION: &'static str = "2.03";

    /// Root with a generation timestamp of now.
    pub fn new(activities: Vec<Activity>) -> Self {
        IatiActivities {
            version: Self::VERSION.to_string(),
            generated_datetime: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            linked_data_default: String::new(),
            activities,
        }
    }
}

// =============================================================================
// Synthetic Keys
// =============================================================================

/// Composite key joining indicator rows to their result and activity.
///
/// The standard gives indicators no natural identifier, so extraction mints
/// one from the three components; keeping them separate avoids collisions if a
/// component ever contains the rendered delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndicatorKey {
    pub activity_id: String,
    pub result_ref: String,
    /// 1-based position of the indicator within its result.
    pub ordinal: usize,
}

impl IndicatorKey {
    pub fn new(activity_id: impl Into<String>, result_ref: impl Into<String>, ordinal: usize) -> Self {
        IndicatorKey {
            activity_id: activity_id.into(),
            result_ref: result_ref.into(),
            ordinal,
        }
    }
}

impl std::fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "indicator_{}_{}_{}",
            self.activity_id, self.result_ref, self.ordinal
        )
    }
}

/// Synthetic key for a result lacking a `ref` attribute.
pub fn synthetic_result_ref(ordinal: usize) -> String {
    format!("result_{ordinal}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrative_from_cells_keeps_absence() {
        let tagged = Narrative::from_cells("Hola", "es");
        assert_eq!(tagged.lang.as_deref(), Some("es"));

        let untagged = Narrative::from_cells("Hello", "");
        assert!(untagged.lang.is_none());
    }

    #[test]
    fn test_tri_state_round_trip() {
        for cell in ["", "0", "1"] {
            let parsed = tri_state_from_cell(cell);
            assert_eq!(tri_state_to_cell(parsed), cell);
        }
        // Strict variant leaves unknown values absent.
        assert_eq!(tri_state_strict_from_cell("yes"), None);
        assert_eq!(tri_state_strict_from_cell("1"), Some(true));
        assert_eq!(tri_state_strict_from_cell("0"), Some(false));
    }

    #[test]
    fn test_indicator_key_display() {
        let key = IndicatorKey::new("XM-EX-1", "result_2", 3);
        assert_eq!(key.to_string(), "indicator_XM-EX-1_result_2_3");
    }

    #[test]
    fn test_activity_defaults() {
        let activity = Activity::new("XM-EX-1");
        assert_eq!(activity.reporting_org_role, "4");
        assert_eq!(activity.xml_lang, "en");
        assert!(activity.humanitarian.is_none());
        assert!(activity.transactions.is_empty());
    }

    #[test]
    fn test_synthetic_result_ref() {
        assert_eq!(synthetic_result_ref(1), "result_1");
    }
}
