//! Per-table column rule sets.
//!
//! Each table gets a declarative list of [`ColumnRule`]s pairing a column with
//! its checks and issue codes. Columns without rules are free-text.

use crate::models::codelist::{
    ACTIVITY_DATE_TYPE, ACTIVITY_SCOPE, ACTIVITY_STATUS, AID_TYPE_VOCABULARY, BUDGET_STATUS,
    BUDGET_TYPE, COLLABORATION_TYPE, CONDITION_TYPE, CONTACT_TYPE, DISBURSEMENT_CHANNEL,
    DOCUMENT_CATEGORY, FINANCE_TYPE, FLOW_TYPE, GEOGRAPHICAL_PRECISION, INDICATOR_MEASURE,
    LOCATION_ID_VOCABULARY, LOCATION_REACH, ORGANISATION_ROLE, ORGANISATION_TYPE, RESULT_TYPE,
    SECTOR_VOCABULARY, TIED_STATUS, TRANSACTION_TYPE,
};
use crate::schema::TableId;
use crate::validation::{Check, IssueCode};

/// Validation rule for one column.
#[derive(Debug, Clone)]
pub struct ColumnRule {
    pub column: &'static str,
    /// Empty values in required columns are errors.
    pub required: bool,
    pub checks: Vec<(Check, IssueCode)>,
}

impl ColumnRule {
    fn new(column: &'static str) -> Self {
        Self {
            column,
            required: false,
            checks: Vec::new(),
        }
    }

    fn required(column: &'static str) -> Self {
        Self {
            required: true,
            ..Self::new(column)
        }
    }

    fn check(mut self, check: Check, code: IssueCode) -> Self {
        self.checks.push((check, code));
        self
    }
}

// Shorthand used throughout the rule tables.
fn lang(column: &'static str) -> ColumnRule {
    ColumnRule::new(column).check(Check::Language, IssueCode::InvalidLanguage)
}

fn date(column: &'static str) -> ColumnRule {
    ColumnRule::new(column).check(Check::Date, IssueCode::InvalidDate)
}

fn flag(column: &'static str) -> ColumnRule {
    ColumnRule::new(column).check(Check::BooleanFlag, IssueCode::InvalidBoolean)
}

fn coded(column: &'static str, list: &'static crate::models::codelist::CodeList) -> ColumnRule {
    ColumnRule::new(column).check(Check::Code(list), IssueCode::InvalidEnum)
}

/// The rule set for one table.
pub fn rules_for(table: TableId) -> Vec<ColumnRule> {
    match table {
        TableId::Activities => vec![
            ColumnRule::required("activity_identifier"),
            ColumnRule::required("title"),
            lang("title_lang"),
            lang("description_lang"),
            ColumnRule::required("activity_status")
                .check(Check::Code(&ACTIVITY_STATUS), IssueCode::InvalidEnum),
            coded("activity_scope", &ACTIVITY_SCOPE),
            ColumnRule::new("default_currency").check(Check::Currency, IssueCode::InvalidCurrency),
            flag("humanitarian"),
            ColumnRule::new("hierarchy").check(Check::Integer, IssueCode::InvalidInteger),
            ColumnRule::new("last_updated_datetime")
                .check(Check::DateTime, IssueCode::InvalidDatetime),
            lang("xml_lang"),
            ColumnRule::required("reporting_org_ref"),
            lang("reporting_org_name_lang"),
            coded("reporting_org_type", &ORGANISATION_TYPE),
            coded("reporting_org_role", &ORGANISATION_ROLE),
            flag("reporting_org_secondary_reporter"),
            date("planned_start_date"),
            date("actual_start_date"),
            date("planned_end_date"),
            date("actual_end_date"),
            ColumnRule::new("recipient_country_percentage")
                .check(Check::Percentage, IssueCode::InvalidPercentage),
            lang("recipient_country_lang"),
            ColumnRule::new("recipient_region_percentage")
                .check(Check::Percentage, IssueCode::InvalidPercentage),
            lang("recipient_region_lang"),
            coded("collaboration_type", &COLLABORATION_TYPE),
            coded("default_flow_type", &FLOW_TYPE),
            coded("default_finance_type", &FINANCE_TYPE),
            coded("default_aid_type_vocabulary", &AID_TYPE_VOCABULARY),
            coded("default_tied_status", &TIED_STATUS),
            flag("conditions_attached"),
        ],
        TableId::ParticipatingOrgs => vec![
            ColumnRule::required("activity_identifier"),
            ColumnRule::required("role").check(Check::Code(&ORGANISATION_ROLE), IssueCode::InvalidEnum),
            coded("org_type", &ORGANISATION_TYPE),
            lang("org_name_lang"),
            ColumnRule::new("crs_channel_code").check(Check::CrsChannel, IssueCode::InvalidCrsCode),
        ],
        TableId::Sectors => vec![
            ColumnRule::required("activity_identifier"),
            ColumnRule::required("sector_code"),
            coded("vocabulary", &SECTOR_VOCABULARY),
            ColumnRule::new("vocabulary_uri").check(Check::Url, IssueCode::InvalidUrl),
            ColumnRule::new("percentage").check(Check::Percentage, IssueCode::InvalidPercentage),
        ],
        TableId::Budgets => vec![
            ColumnRule::required("activity_identifier"),
            ColumnRule::required("budget_type").check(Check::Code(&BUDGET_TYPE), IssueCode::InvalidEnum),
            ColumnRule::required("budget_status")
                .check(Check::Code(&BUDGET_STATUS), IssueCode::InvalidEnum),
            ColumnRule::required("period_start").check(Check::Date, IssueCode::InvalidDate),
            ColumnRule::required("period_end").check(Check::Date, IssueCode::InvalidDate),
            ColumnRule::required("value").check(Check::Decimal, IssueCode::InvalidDecimal),
            ColumnRule::new("currency").check(Check::Currency, IssueCode::InvalidCurrency),
            date("value_date"),
        ],
        TableId::Transactions => vec![
            ColumnRule::required("activity_identifier"),
            ColumnRule::required("transaction_type")
                .check(Check::Code(&TRANSACTION_TYPE), IssueCode::InvalidEnum),
            ColumnRule::required("transaction_date").check(Check::Date, IssueCode::InvalidDate),
            ColumnRule::required("value").check(Check::Decimal, IssueCode::InvalidDecimal),
            ColumnRule::new("currency").check(Check::Currency, IssueCode::InvalidCurrency),
            date("value_date"),
            lang("description_lang"),
            lang("provider_org_lang"),
            coded("provider_org_type", &ORGANISATION_TYPE),
            lang("receiver_org_lang"),
            coded("receiver_org_type", &ORGANISATION_TYPE),
            coded("disbursement_channel", &DISBURSEMENT_CHANNEL),
            coded("flow_type", &FLOW_TYPE),
            coded("finance_type", &FINANCE_TYPE),
            coded("aid_type_vocabulary", &AID_TYPE_VOCABULARY),
            coded("tied_status", &TIED_STATUS),
            flag("humanitarian"),
        ],
        TableId::TransactionSectors => vec![
            ColumnRule::required("activity_identifier"),
            ColumnRule::required("sector_code"),
            coded("transaction_type", &TRANSACTION_TYPE),
            coded("vocabulary", &SECTOR_VOCABULARY),
            ColumnRule::new("vocabulary_uri").check(Check::Url, IssueCode::InvalidUrl),
        ],
        TableId::Locations => vec![
            ColumnRule::required("activity_identifier"),
            coded("location_reach", &LOCATION_REACH),
            coded("location_id_vocabulary", &LOCATION_ID_VOCABULARY),
            lang("name_lang"),
            lang("description_lang"),
            lang("activity_description_lang"),
            ColumnRule::new("latitude").check(Check::Decimal, IssueCode::InvalidDecimal),
            ColumnRule::new("longitude").check(Check::Decimal, IssueCode::InvalidDecimal),
            coded("exactness", &GEOGRAPHICAL_PRECISION),
        ],
        TableId::Documents => vec![
            ColumnRule::required("activity_identifier"),
            ColumnRule::required("url").check(Check::Url, IssueCode::InvalidUrl),
            ColumnRule::required("format"),
            lang("title_lang"),
            lang("description_lang"),
            coded("category_code", &DOCUMENT_CATEGORY),
            lang("language_code"),
            date("document_date"),
        ],
        TableId::Results => vec![
            ColumnRule::required("activity_identifier"),
            ColumnRule::required("result_type").check(Check::Code(&RESULT_TYPE), IssueCode::InvalidEnum),
            flag("aggregation_status"),
        ],
        TableId::Indicators => vec![
            ColumnRule::required("activity_identifier"),
            ColumnRule::required("result_ref"),
            ColumnRule::required("indicator_measure")
                .check(Check::Code(&INDICATOR_MEASURE), IssueCode::InvalidEnum),
            flag("ascending"),
            flag("aggregation_status"),
            ColumnRule::new("baseline_year").check(Check::Integer, IssueCode::InvalidInteger),
            date("baseline_iso_date"),
        ],
        TableId::IndicatorPeriods => vec![
            ColumnRule::required("activity_identifier"),
            ColumnRule::required("result_ref"),
            ColumnRule::required("indicator_ref"),
            ColumnRule::required("period_start").check(Check::Date, IssueCode::InvalidDate),
            ColumnRule::required("period_end").check(Check::Date, IssueCode::InvalidDate),
        ],
        TableId::ActivityDate => vec![
            ColumnRule::required("activity_identifier"),
            ColumnRule::required("type").check(Check::Code(&ACTIVITY_DATE_TYPE), IssueCode::InvalidEnum),
            ColumnRule::required("iso_date").check(Check::Date, IssueCode::InvalidDate),
            lang("narrative_lang"),
        ],
        TableId::ContactInfo => vec![
            ColumnRule::required("activity_identifier"),
            coded("contact_type", &CONTACT_TYPE),
            lang("organisation_lang"),
            lang("department_lang"),
            lang("person_name_lang"),
            flag("person_name_present"),
            lang("job_title_lang"),
            flag("email_present"),
            ColumnRule::new("website").check(Check::Url, IssueCode::InvalidUrl),
            lang("mailing_address_lang"),
        ],
        TableId::Conditions => vec![
            ColumnRule::required("activity_identifier"),
            ColumnRule::required("condition_type")
                .check(Check::Code(&CONDITION_TYPE), IssueCode::InvalidEnum),
        ],
        TableId::Descriptions => vec![
            ColumnRule::required("activity_identifier"),
            ColumnRule::new("description_type").check(Check::Integer, IssueCode::InvalidInteger),
            ColumnRule::new("description_sequence").check(Check::Integer, IssueCode::InvalidInteger),
            lang("narrative_lang"),
            ColumnRule::new("narrative_sequence").check(Check::Integer, IssueCode::InvalidInteger),
        ],
        TableId::CountryBudgetItems => vec![
            ColumnRule::required("activity_identifier"),
            ColumnRule::required("vocabulary"),
            ColumnRule::required("budget_item_code"),
            ColumnRule::new("budget_item_percentage")
                .check(Check::Percentage, IssueCode::InvalidPercentage),
            lang("description_lang"),
        ],
    }
}
