//! Row-to-model assembly for the CSV-to-XML direction.
//!
//! Takes a [`TableSet`] read from a CSV folder and reassembles [`Activity`]
//! values, joining child tables to their parent through `activity_identifier`
//! and the synthetic result and indicator references.
//!
//! Where extraction is lazy, assembly is fail-fast: the first activity that
//! cannot be built aborts the batch with a [`BuildError::Activity`] naming
//! the offending identifier. Genuinely unusable codes (an activity-date type
//! outside 1-4, an unknown document category) are errors; softer problems are
//! tolerated the same way a permissive reader would: an invalid activity
//! status or scope drops the element, a baseline with an unparseable year is
//! skipped, and monetary values pass through as raw text.

use std::collections::HashMap;

use crate::error::{BuildError, BuildResult};
use crate::models::codelist;
use crate::models::{
    tri_state_from_cell, tri_state_strict_from_cell, Activity, ActivityDate, ActivityDateType,
    Administrative, AidType, Budget, BudgetItem, CodeList, Condition, ContactInfo,
    CountryBudgetItems, Description, DocumentLink, Indicator, IndicatorBaseline, IndicatorPeriod,
    Location, LocationId, Narrative, OrgRef, ParticipatingOrg, PeriodMeasure, Point,
    RecipientCountry, RecipientRegion, ReportingOrg, Result as ActivityResult, SectorRef,
    Transaction,
};
use crate::schema::{cell, Row, TableId, TableSet};

// =============================================================================
// Entry Point
// =============================================================================

/// Assemble every activity in the set, in activities-table order.
pub fn build_activities(tables: &TableSet) -> BuildResult<Vec<Activity>> {
    let mut activities = Vec::new();
    for main in tables.rows(TableId::Activities) {
        let activity_id = cell(main, "activity_identifier").to_string();
        let activity = build_activity(main, tables).map_err(|e| BuildError::Activity {
            activity_id: activity_id.clone(),
            detail: e.to_string(),
        })?;
        activities.push(activity);
    }
    Ok(activities)
}

/// Assemble one activity from its main row plus the child tables.
pub fn build_activity(main: &Row, tables: &TableSet) -> BuildResult<Activity> {
    let activity_id = cell(main, "activity_identifier");
    let mut activity = Activity::new(activity_id);

    let role = cell(main, "reporting_org_role");
    if !role.is_empty() {
        activity.reporting_org_role = role.to_string();
    }
    activity.reporting_org = ReportingOrg {
        reference: cell(main, "reporting_org_ref").to_string(),
        org_type: cell(main, "reporting_org_type").to_string(),
        secondary_reporter: tri_state_strict_from_cell(cell(
            main,
            "reporting_org_secondary_reporter",
        )),
        narratives: narratives_if_text(
            cell(main, "reporting_org_name"),
            cell(main, "reporting_org_name_lang"),
        ),
    };

    activity.title = narratives_if_text(cell(main, "title"), cell(main, "title_lang"));
    activity.activity_status = validated_code(cell(main, "activity_status"), &codelist::ACTIVITY_STATUS);
    activity.activity_scope = validated_code(cell(main, "activity_scope"), &codelist::ACTIVITY_SCOPE);
    activity.collaboration_type =
        validated_code(cell(main, "collaboration_type"), &codelist::COLLABORATION_TYPE);

    activity.default_currency = cell(main, "default_currency").to_string();
    activity.humanitarian = tri_state_from_cell(cell(main, "humanitarian"));
    activity.hierarchy = non_empty(cell(main, "hierarchy"));
    activity.last_updated_datetime = cell(main, "last_updated_datetime").to_string();
    let lang = cell(main, "xml_lang");
    if !lang.is_empty() {
        activity.xml_lang = lang.to_string();
    }

    activity.default_flow_type = non_empty(cell(main, "default_flow_type"));
    activity.default_finance_type = non_empty(cell(main, "default_finance_type"));
    activity.default_aid_type = non_empty(cell(main, "default_aid_type"));
    activity.default_aid_type_vocabulary = non_empty(cell(main, "default_aid_type_vocabulary"));
    activity.default_tied_status = non_empty(cell(main, "default_tied_status"));
    activity.conditions_attached = non_empty(cell(main, "conditions_attached"));

    activity.descriptions = build_descriptions(&rows_for(tables, TableId::Descriptions, activity_id));
    if activity.descriptions.is_empty() && !cell(main, "description").is_empty() {
        activity.descriptions.push(Description {
            description_type: String::new(),
            narratives: vec![Narrative::from_cells(
                cell(main, "description"),
                cell(main, "description_lang"),
            )],
        });
    }

    add_inline_dates(&mut activity, main);
    add_geography(&mut activity, main);

    for row in rows_for(tables, TableId::ParticipatingOrgs, activity_id) {
        activity.participating_orgs.push(build_participating_org(row));
    }
    for row in rows_for(tables, TableId::Sectors, activity_id) {
        activity.sectors.push(build_sector(row));
    }
    for row in rows_for(tables, TableId::Budgets, activity_id) {
        activity.budgets.push(build_budget(row));
    }

    let sector_rows = rows_for(tables, TableId::TransactionSectors, activity_id);
    for row in rows_for(tables, TableId::Transactions, activity_id) {
        activity.transactions.push(build_transaction(row, &sector_rows));
    }

    for row in rows_for(tables, TableId::Locations, activity_id) {
        activity.locations.push(build_location(row));
    }
    for row in rows_for(tables, TableId::Documents, activity_id) {
        activity.document_links.push(build_document(row)?);
    }
    for row in rows_for(tables, TableId::ActivityDate, activity_id) {
        activity.activity_dates.push(build_activity_date(row)?);
    }

    // Only one contact-info element is supported per activity.
    if let Some(row) = rows_for(tables, TableId::ContactInfo, activity_id).first() {
        activity.contact_info = Some(build_contact_info(row));
    }

    let indicator_rows = rows_for(tables, TableId::Indicators, activity_id);
    let period_rows = rows_for(tables, TableId::IndicatorPeriods, activity_id);
    for row in rows_for(tables, TableId::Results, activity_id) {
        let result_ref = cell(row, "result_ref");
        let indicators: Vec<&Row> = indicator_rows
            .iter()
            .copied()
            .filter(|r| cell(r, "result_ref") == result_ref)
            .collect();
        let periods: Vec<&Row> = period_rows
            .iter()
            .copied()
            .filter(|r| cell(r, "result_ref") == result_ref)
            .collect();
        activity.results.push(build_result(row, &indicators, &periods));
    }

    for row in rows_for(tables, TableId::Conditions, activity_id) {
        activity.conditions.push(Condition {
            condition_type: cell(row, "condition_type").to_string(),
            text: cell(row, "condition_text").to_string(),
        });
    }

    activity.country_budget_items =
        build_country_budget_items(&rows_for(tables, TableId::CountryBudgetItems, activity_id));

    Ok(activity)
}

// =============================================================================
// Row Helpers
// =============================================================================

fn rows_for<'a>(tables: &'a TableSet, id: TableId, activity_id: &str) -> Vec<&'a Row> {
    tables
        .rows(id)
        .iter()
        .filter(|r| cell(r, "activity_identifier") == activity_id)
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Keep a code only when it belongs to the list; anything else drops the
/// element rather than failing the activity.
fn validated_code(value: &str, list: &CodeList) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    if list.contains(value) {
        Some(value.to_string())
    } else {
        log::debug!("dropping invalid {} code '{}'", list.name, value);
        None
    }
}

/// One narrative when the text is present, none otherwise.
fn narratives_if_text(text: &str, lang: &str) -> Vec<Narrative> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Narrative::from_cells(text, lang)]
    }
}

/// One narrative when either text or language is present.
fn narratives_if_any(text: &str, lang: &str) -> Vec<Narrative> {
    if text.is_empty() && lang.is_empty() {
        Vec::new()
    } else {
        vec![Narrative::from_cells(text, lang)]
    }
}

/// `true`/`1`/`yes` in any case reads as true; everything else as false.
fn flag_is_true(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn safe_int(value: &str) -> i64 {
    value.trim().parse().unwrap_or(0)
}

// =============================================================================
// Main-Row Pieces
// =============================================================================

fn add_inline_dates(activity: &mut Activity, main: &Row) {
    for date_type in ActivityDateType::ALL {
        let value = cell(main, date_type.main_column());
        if !value.is_empty() {
            activity.activity_dates.push(ActivityDate {
                date_type: date_type.to_code().to_string(),
                iso_date: value.to_string(),
                narratives: Vec::new(),
            });
        }
    }
}

fn add_geography(activity: &mut Activity, main: &Row) {
    let country_code = cell(main, "recipient_country_code");
    if !country_code.is_empty() {
        activity.recipient_countries.push(RecipientCountry {
            code: country_code.to_string(),
            percentage: cell(main, "recipient_country_percentage").to_string(),
            narratives: narratives_if_any(
                cell(main, "recipient_country_name"),
                cell(main, "recipient_country_lang"),
            ),
        });
    }

    let region_code = cell(main, "recipient_region_code");
    if !region_code.is_empty() {
        activity.recipient_regions.push(RecipientRegion {
            code: region_code.to_string(),
            percentage: cell(main, "recipient_region_percentage").to_string(),
            narratives: narratives_if_any(
                cell(main, "recipient_region_name"),
                cell(main, "recipient_region_lang"),
            ),
        });
    }
}

// =============================================================================
// Descriptions
// =============================================================================

/// Regroup description rows into multi-narrative blocks, ordered by their
/// recorded sequence numbers.
fn build_descriptions(rows: &[&Row]) -> Vec<Description> {
    let mut sorted: Vec<&Row> = rows.to_vec();
    sorted.sort_by_key(|r| {
        (
            safe_int(cell(r, "description_sequence")),
            safe_int(cell(r, "narrative_sequence")),
        )
    });

    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Description> = HashMap::new();
    for row in sorted {
        let seq_cell = cell(row, "description_sequence");
        let seq = if seq_cell.is_empty() {
            (grouped.len() + 1).to_string()
        } else {
            seq_cell.to_string()
        };
        let entry = grouped.entry(seq.clone()).or_insert_with(|| {
            order.push(seq.clone());
            Description {
                description_type: cell(row, "description_type").to_string(),
                narratives: Vec::new(),
            }
        });
        entry.narratives.push(Narrative::from_cells(
            cell(row, "narrative"),
            cell(row, "narrative_lang"),
        ));
    }

    order.sort_by_key(|seq| safe_int(seq));
    order
        .into_iter()
        .filter_map(|seq| grouped.remove(&seq))
        .collect()
}

// =============================================================================
// Child Builders
// =============================================================================

fn build_participating_org(row: &Row) -> ParticipatingOrg {
    ParticipatingOrg {
        role: cell(row, "role").to_string(),
        reference: cell(row, "org_ref").to_string(),
        org_type: cell(row, "org_type").to_string(),
        activity_id: cell(row, "activity_id").to_string(),
        crs_channel_code: cell(row, "crs_channel_code").to_string(),
        narratives: narratives_if_any(cell(row, "org_name"), cell(row, "org_name_lang")),
    }
}

fn build_sector(row: &Row) -> SectorRef {
    SectorRef {
        code: cell(row, "sector_code").to_string(),
        vocabulary: cell(row, "vocabulary").to_string(),
        vocabulary_uri: cell(row, "vocabulary_uri").to_string(),
        percentage: cell(row, "percentage").to_string(),
        narratives: narratives_if_text(cell(row, "sector_name"), ""),
    }
}

fn build_budget(row: &Row) -> Budget {
    Budget {
        budget_type: cell(row, "budget_type").to_string(),
        status: cell(row, "budget_status").to_string(),
        period_start: cell(row, "period_start").to_string(),
        period_end: cell(row, "period_end").to_string(),
        value: cell(row, "value").to_string(),
        currency: cell(row, "currency").to_string(),
        value_date: cell(row, "value_date").to_string(),
    }
}

fn build_transaction(row: &Row, sector_rows: &[&Row]) -> Transaction {
    let transaction_ref = cell(row, "transaction_ref");
    let transaction_type = cell(row, "transaction_type");

    let mut transaction = Transaction {
        transaction_type: transaction_type.to_string(),
        date: cell(row, "transaction_date").to_string(),
        value: cell(row, "value").to_string(),
        currency: cell(row, "currency").to_string(),
        value_date: cell(row, "value_date").to_string(),
        reference: transaction_ref.to_string(),
        humanitarian: tri_state_from_cell(cell(row, "humanitarian")),
        description: narratives_if_any(cell(row, "description"), cell(row, "description_lang")),
        receiver_activity_id: cell(row, "receiver_org_activity_id").to_string(),
        disbursement_channel: cell(row, "disbursement_channel").to_string(),
        flow_type: cell(row, "flow_type").to_string(),
        finance_type: cell(row, "finance_type").to_string(),
        tied_status: cell(row, "tied_status").to_string(),
        recipient_region: cell(row, "recipient_region").to_string(),
        ..Default::default()
    };

    transaction.provider_org = build_transaction_org(row, "provider");
    transaction.receiver_org = build_transaction_org(row, "receiver");

    let aid_code = cell(row, "aid_type");
    if !aid_code.is_empty() {
        let vocabulary = cell(row, "aid_type_vocabulary");
        transaction.aid_type = Some(AidType {
            code: aid_code.to_string(),
            vocabulary: if vocabulary.is_empty() { "1" } else { vocabulary }.to_string(),
        });
    }

    // Sector rows are shared across the activity's transactions; pick the
    // ones matching this transaction's ref and type, dropping duplicates.
    let mut seen: Vec<(String, String)> = Vec::new();
    for sector in sector_rows {
        if cell(sector, "transaction_ref") != transaction_ref
            || cell(sector, "transaction_type") != transaction_type
        {
            continue;
        }
        let key = (
            cell(sector, "sector_code").to_string(),
            cell(sector, "vocabulary").to_string(),
        );
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        transaction.sectors.push(SectorRef {
            code: cell(sector, "sector_code").to_string(),
            vocabulary: cell(sector, "vocabulary").to_string(),
            vocabulary_uri: cell(sector, "vocabulary_uri").to_string(),
            percentage: String::new(),
            narratives: narratives_if_text(cell(sector, "sector_name"), ""),
        });
    }

    transaction
}

fn build_transaction_org(row: &Row, side: &str) -> Option<OrgRef> {
    let reference = cell(row, &format!("{side}_org_ref"));
    let name = cell(row, &format!("{side}_org_name"));
    let lang = cell(row, &format!("{side}_org_lang"));
    if reference.is_empty() && name.is_empty() && lang.is_empty() {
        return None;
    }
    Some(OrgRef {
        reference: reference.to_string(),
        org_type: cell(row, &format!("{side}_org_type")).to_string(),
        narratives: narratives_if_any(name, lang),
    })
}

fn build_location(row: &Row) -> Location {
    let mut location = Location {
        reference: cell(row, "location_ref").to_string(),
        location_reach: cell(row, "location_reach").to_string(),
        exactness: cell(row, "exactness").to_string(),
        location_class: cell(row, "location_class").to_string(),
        feature_designation: cell(row, "feature_designation").to_string(),
        name: narratives_if_any(cell(row, "name"), cell(row, "name_lang")),
        description: narratives_if_any(cell(row, "description"), cell(row, "description_lang")),
        activity_description: narratives_if_any(
            cell(row, "activity_description"),
            cell(row, "activity_description_lang"),
        ),
        ..Default::default()
    };

    let vocabulary = cell(row, "location_id_vocabulary");
    let code = cell(row, "location_id_code");
    if !vocabulary.is_empty() || !code.is_empty() {
        location.location_id = Some(LocationId {
            vocabulary: vocabulary.to_string(),
            code: code.to_string(),
        });
    }

    let latitude = cell(row, "latitude");
    let longitude = cell(row, "longitude");
    if !latitude.is_empty() && !longitude.is_empty() {
        location.point = Some(Point {
            srs_name: Point::WGS84.to_string(),
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
        });
    }

    let admin = Administrative {
        vocabulary: cell(row, "administrative_vocabulary").to_string(),
        level: cell(row, "administrative_level").to_string(),
        code: cell(row, "administrative_code").to_string(),
        country: cell(row, "administrative_country").to_string(),
    };
    if admin != Administrative::default() {
        location.administrative.push(admin);
    }

    location
}

fn build_document(row: &Row) -> BuildResult<DocumentLink> {
    let category = cell(row, "category_code");
    if !category.is_empty() && !codelist::DOCUMENT_CATEGORY.contains(category) {
        return Err(BuildError::InvalidCode {
            field: "document-link category".to_string(),
            value: category.to_string(),
        });
    }

    Ok(DocumentLink {
        url: cell(row, "url").to_string(),
        format: cell(row, "format").to_string(),
        title: narratives_if_any(cell(row, "title"), cell(row, "title_lang")),
        description: narratives_if_any(cell(row, "description"), cell(row, "description_lang")),
        category_code: category.to_string(),
        language_code: cell(row, "language_code").to_string(),
        document_date: cell(row, "document_date").to_string(),
    })
}

fn build_activity_date(row: &Row) -> BuildResult<ActivityDate> {
    let code = cell(row, "type");
    let date_type = ActivityDateType::from_code(code).ok_or_else(|| BuildError::InvalidCode {
        field: "activity-date type".to_string(),
        value: code.to_string(),
    })?;

    Ok(ActivityDate {
        date_type: date_type.to_code().to_string(),
        iso_date: cell(row, "iso_date").to_string(),
        narratives: narratives_if_text(cell(row, "narrative"), cell(row, "narrative_lang")),
    })
}

fn build_contact_info(row: &Row) -> ContactInfo {
    let mut contact = ContactInfo {
        contact_type: cell(row, "contact_type").to_string(),
        organisation: narratives_if_any(cell(row, "organisation"), cell(row, "organisation_lang")),
        department: narratives_if_any(cell(row, "department"), cell(row, "department_lang")),
        job_title: narratives_if_any(cell(row, "job_title"), cell(row, "job_title_lang")),
        telephone: cell(row, "telephone").to_string(),
        website: cell(row, "website").to_string(),
        mailing_address: narratives_if_any(
            cell(row, "mailing_address"),
            cell(row, "mailing_address_lang"),
        ),
        ..Default::default()
    };

    // Presence flags revive elements whose text was empty in the source.
    let person_name = cell(row, "person_name");
    let person_lang = cell(row, "person_name_lang");
    if cell(row, "person_name_present") == "1" || !person_name.is_empty() || !person_lang.is_empty()
    {
        contact.person_name = Some(vec![Narrative::from_cells(person_name, person_lang)]);
    }

    let email = cell(row, "email");
    if cell(row, "email_present") == "1" || !email.is_empty() {
        contact.email = Some(email.to_string());
    }

    contact
}

// =============================================================================
// Results
// =============================================================================

fn build_result(row: &Row, indicators: &[&Row], periods: &[&Row]) -> ActivityResult {
    let mut result = ActivityResult {
        result_type: cell(row, "result_type").to_string(),
        title: narratives_if_text(cell(row, "title"), ""),
        description: narratives_if_text(cell(row, "description"), ""),
        ..Default::default()
    };

    let aggregation = cell(row, "aggregation_status");
    if !aggregation.is_empty() {
        result.aggregation_status = Some(flag_is_true(aggregation));
    }

    for indicator_row in indicators {
        let mut indicator = build_indicator(indicator_row);
        let indicator_ref = cell(indicator_row, "indicator_ref");
        for period_row in periods {
            if cell(period_row, "indicator_ref") == indicator_ref {
                indicator.periods.push(build_indicator_period(period_row));
            }
        }
        result.indicators.push(indicator);
    }

    result
}

fn build_indicator(row: &Row) -> Indicator {
    let mut indicator = Indicator {
        measure: cell(row, "indicator_measure").to_string(),
        title: narratives_if_text(cell(row, "title"), ""),
        description: narratives_if_text(cell(row, "description"), ""),
        ..Default::default()
    };

    let ascending = cell(row, "ascending");
    if !ascending.is_empty() {
        indicator.ascending = Some(flag_is_true(ascending));
    }
    let aggregation = cell(row, "aggregation_status");
    if !aggregation.is_empty() {
        indicator.aggregation_status = Some(flag_is_true(aggregation));
    }

    // A baseline needs a numeric year; otherwise the whole block is skipped.
    let year_cell = cell(row, "baseline_year");
    if !year_cell.is_empty() {
        if let Ok(year) = year_cell.trim().parse::<i32>() {
            indicator.baseline = Some(IndicatorBaseline {
                year,
                iso_date: cell(row, "baseline_iso_date").to_string(),
                value: cell(row, "baseline_value").to_string(),
                comment: narratives_if_text(cell(row, "baseline_comment"), ""),
            });
        } else {
            log::debug!("skipping baseline with unparseable year '{}'", year_cell);
        }
    }

    indicator
}

fn build_indicator_period(row: &Row) -> IndicatorPeriod {
    let mut period = IndicatorPeriod {
        period_start: cell(row, "period_start").to_string(),
        period_end: cell(row, "period_end").to_string(),
        ..Default::default()
    };

    let target_value = cell(row, "target_value");
    if !target_value.is_empty() {
        period.target = Some(PeriodMeasure {
            value: target_value.to_string(),
            comment: narratives_if_text(cell(row, "target_comment"), ""),
        });
    }
    let actual_value = cell(row, "actual_value");
    if !actual_value.is_empty() {
        period.actual = Some(PeriodMeasure {
            value: actual_value.to_string(),
            comment: narratives_if_text(cell(row, "actual_comment"), ""),
        });
    }

    period
}

// =============================================================================
// Country Budget Items
// =============================================================================

/// Rows sharing a vocabulary fold into one `country-budget-items` group,
/// keeping first-seen vocabulary order.
fn build_country_budget_items(rows: &[&Row]) -> Vec<CountryBudgetItems> {
    let mut groups: Vec<CountryBudgetItems> = Vec::new();
    for row in rows {
        let vocabulary = cell(row, "vocabulary");
        let item = BudgetItem {
            code: cell(row, "budget_item_code").to_string(),
            percentage: cell(row, "budget_item_percentage").to_string(),
            description: narratives_if_text(cell(row, "description"), cell(row, "description_lang")),
        };
        match groups.iter_mut().find(|g| g.vocabulary == vocabulary) {
            Some(group) => group.items.push(item),
            None => groups.push(CountryBudgetItems {
                vocabulary: vocabulary.to_string(),
                items: vec![item],
            }),
        }
    }
    groups
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> Row {
        cells.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn with_activity(cells: &[(&str, &str)]) -> TableSet {
        let mut tables = TableSet::new();
        tables.push(TableId::Activities, row(cells));
        tables
    }

    #[test]
    fn test_minimal_activity_defaults() {
        let tables = with_activity(&[("activity_identifier", "XM-1")]);
        let activities = build_activities(&tables).unwrap();
        assert_eq!(activities.len(), 1);
        let activity = &activities[0];
        assert_eq!(activity.iati_identifier, "XM-1");
        assert_eq!(activity.reporting_org_role, "4");
        assert_eq!(activity.xml_lang, "en");
        assert_eq!(activity.activity_status, None);
        assert!(activity.title.is_empty());
    }

    #[test]
    fn test_tri_state_round_trip() {
        for (cell_value, expected) in [("", None), ("0", Some(false)), ("1", Some(true))] {
            let tables = with_activity(&[
                ("activity_identifier", "A"),
                ("humanitarian", cell_value),
            ]);
            let activity = &build_activities(&tables).unwrap()[0];
            assert_eq!(activity.humanitarian, expected, "cell {cell_value:?}");
        }
    }

    #[test]
    fn test_secondary_reporter_strict() {
        for (cell_value, expected) in
            [("1", Some(true)), ("0", Some(false)), ("yes", None), ("", None)]
        {
            let tables = with_activity(&[
                ("activity_identifier", "A"),
                ("reporting_org_secondary_reporter", cell_value),
            ]);
            let activity = &build_activities(&tables).unwrap()[0];
            assert_eq!(
                activity.reporting_org.secondary_reporter, expected,
                "cell {cell_value:?}"
            );
        }
    }

    #[test]
    fn test_invalid_status_dropped() {
        let tables = with_activity(&[
            ("activity_identifier", "A"),
            ("activity_status", "99"),
            ("activity_scope", "4"),
        ]);
        let activity = &build_activities(&tables).unwrap()[0];
        assert_eq!(activity.activity_status, None);
        assert_eq!(activity.activity_scope.as_deref(), Some("4"));
    }

    #[test]
    fn test_inline_dates() {
        let tables = with_activity(&[
            ("activity_identifier", "A"),
            ("planned_start_date", "2023-01-15"),
            ("actual_end_date", "2025-12-31"),
        ]);
        let activity = &build_activities(&tables).unwrap()[0];
        assert_eq!(activity.activity_dates.len(), 2);
        assert_eq!(activity.activity_dates[0].date_type, "1");
        assert_eq!(activity.activity_dates[0].iso_date, "2023-01-15");
        assert_eq!(activity.activity_dates[1].date_type, "4");
    }

    #[test]
    fn test_invalid_activity_date_type_fails_batch() {
        let mut tables = with_activity(&[("activity_identifier", "A")]);
        tables.push(
            TableId::ActivityDate,
            row(&[("activity_identifier", "A"), ("type", "9"), ("iso_date", "2024-01-01")]),
        );
        let err = build_activities(&tables).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'A'"), "{message}");
        assert!(message.contains("Invalid code '9'"), "{message}");
    }

    #[test]
    fn test_invalid_document_category_fails_batch() {
        let mut tables = with_activity(&[("activity_identifier", "A")]);
        tables.push(
            TableId::Documents,
            row(&[
                ("activity_identifier", "A"),
                ("url", "https://example.org/report.pdf"),
                ("category_code", "Z99"),
            ]),
        );
        let err = build_activities(&tables).unwrap_err();
        assert!(err.to_string().contains("Invalid code 'Z99'"));
    }

    #[test]
    fn test_description_grouping_and_order() {
        let mut tables = with_activity(&[("activity_identifier", "A")]);
        tables.push(
            TableId::Descriptions,
            row(&[
                ("activity_identifier", "A"),
                ("description_type", "1"),
                ("description_sequence", "2"),
                ("narrative", "Second block"),
                ("narrative_sequence", "1"),
            ]),
        );
        tables.push(
            TableId::Descriptions,
            row(&[
                ("activity_identifier", "A"),
                ("description_type", "2"),
                ("description_sequence", "1"),
                ("narrative", "First block, second narrative"),
                ("narrative_lang", "fr"),
                ("narrative_sequence", "2"),
            ]),
        );
        tables.push(
            TableId::Descriptions,
            row(&[
                ("activity_identifier", "A"),
                ("description_type", "2"),
                ("description_sequence", "1"),
                ("narrative", "First block, first narrative"),
                ("narrative_sequence", "1"),
            ]),
        );
        let activity = &build_activities(&tables).unwrap()[0];
        assert_eq!(activity.descriptions.len(), 2);
        assert_eq!(activity.descriptions[0].description_type, "2");
        assert_eq!(activity.descriptions[0].narratives.len(), 2);
        assert_eq!(activity.descriptions[0].narratives[0].text, "First block, first narrative");
        assert_eq!(activity.descriptions[0].narratives[1].lang.as_deref(), Some("fr"));
        assert_eq!(activity.descriptions[1].narratives[0].text, "Second block");
    }

    #[test]
    fn test_description_fallback_from_main_row() {
        let tables = with_activity(&[
            ("activity_identifier", "A"),
            ("description", "Main description"),
            ("description_lang", "en"),
        ]);
        let activity = &build_activities(&tables).unwrap()[0];
        assert_eq!(activity.descriptions.len(), 1);
        assert_eq!(activity.descriptions[0].narratives[0].text, "Main description");
        assert_eq!(activity.descriptions[0].narratives[0].lang.as_deref(), Some("en"));
    }

    #[test]
    fn test_transaction_sector_matching_and_dedup() {
        let mut tables = with_activity(&[("activity_identifier", "A")]);
        tables.push(
            TableId::Transactions,
            row(&[
                ("activity_identifier", "A"),
                ("transaction_ref", "t1"),
                ("transaction_type", "3"),
                ("value", "1000"),
            ]),
        );
        tables.push(
            TableId::Transactions,
            row(&[
                ("activity_identifier", "A"),
                ("transaction_ref", "t2"),
                ("transaction_type", "2"),
            ]),
        );
        for _ in 0..2 {
            tables.push(
                TableId::TransactionSectors,
                row(&[
                    ("activity_identifier", "A"),
                    ("transaction_ref", "t1"),
                    ("transaction_type", "3"),
                    ("sector_code", "11110"),
                    ("vocabulary", "1"),
                ]),
            );
        }
        tables.push(
            TableId::TransactionSectors,
            row(&[
                ("activity_identifier", "A"),
                ("transaction_ref", "t2"),
                ("transaction_type", "2"),
                ("sector_code", "12220"),
                ("vocabulary", "1"),
            ]),
        );
        let activity = &build_activities(&tables).unwrap()[0];
        assert_eq!(activity.transactions[0].sectors.len(), 1);
        assert_eq!(activity.transactions[0].sectors[0].code, "11110");
        assert_eq!(activity.transactions[0].value, "1000");
        assert_eq!(activity.transactions[1].sectors.len(), 1);
        assert_eq!(activity.transactions[1].sectors[0].code, "12220");
    }

    #[test]
    fn test_transaction_aid_type_vocabulary_default() {
        let mut tables = with_activity(&[("activity_identifier", "A")]);
        tables.push(
            TableId::Transactions,
            row(&[("activity_identifier", "A"), ("aid_type", "C01")]),
        );
        let activity = &build_activities(&tables).unwrap()[0];
        let aid_type = activity.transactions[0].aid_type.as_ref().unwrap();
        assert_eq!(aid_type.code, "C01");
        assert_eq!(aid_type.vocabulary, "1");
    }

    #[test]
    fn test_result_indicator_period_nesting() {
        let mut tables = with_activity(&[("activity_identifier", "A")]);
        tables.push(
            TableId::Results,
            row(&[
                ("activity_identifier", "A"),
                ("result_ref", "result_1"),
                ("result_type", "1"),
                ("title", "Outputs"),
            ]),
        );
        tables.push(
            TableId::Indicators,
            row(&[
                ("activity_identifier", "A"),
                ("result_ref", "result_1"),
                ("indicator_ref", "indicator_A_result_1_1"),
                ("indicator_measure", "1"),
                ("ascending", "true"),
            ]),
        );
        tables.push(
            TableId::IndicatorPeriods,
            row(&[
                ("activity_identifier", "A"),
                ("result_ref", "result_1"),
                ("indicator_ref", "indicator_A_result_1_1"),
                ("period_start", "2024-01-01"),
                ("period_end", "2024-12-31"),
                ("target_value", "10"),
                ("actual_value", "7"),
                ("actual_comment", "On track"),
            ]),
        );
        tables.push(
            TableId::IndicatorPeriods,
            row(&[
                ("activity_identifier", "A"),
                ("result_ref", "result_1"),
                ("indicator_ref", "indicator_A_result_1_2"),
                ("period_start", "2024-01-01"),
                ("period_end", "2024-12-31"),
            ]),
        );
        let activity = &build_activities(&tables).unwrap()[0];
        let result = &activity.results[0];
        assert_eq!(result.title[0].text, "Outputs");
        assert_eq!(result.indicators.len(), 1);
        let indicator = &result.indicators[0];
        assert_eq!(indicator.ascending, Some(true));
        assert_eq!(indicator.periods.len(), 1);
        let period = &indicator.periods[0];
        assert_eq!(period.target.as_ref().unwrap().value, "10");
        assert_eq!(period.actual.as_ref().unwrap().comment[0].text, "On track");
    }

    #[test]
    fn test_baseline_bad_year_skipped() {
        let mut tables = with_activity(&[("activity_identifier", "A")]);
        tables.push(
            TableId::Results,
            row(&[("activity_identifier", "A"), ("result_ref", "r1")]),
        );
        tables.push(
            TableId::Indicators,
            row(&[
                ("activity_identifier", "A"),
                ("result_ref", "r1"),
                ("indicator_ref", "i1"),
                ("baseline_year", "not-a-year"),
                ("baseline_value", "5"),
            ]),
        );
        let activity = &build_activities(&tables).unwrap()[0];
        assert!(activity.results[0].indicators[0].baseline.is_none());
    }

    #[test]
    fn test_contact_presence_flags() {
        let mut tables = with_activity(&[("activity_identifier", "A")]);
        tables.push(
            TableId::ContactInfo,
            row(&[
                ("activity_identifier", "A"),
                ("contact_type", "1"),
                ("person_name_present", "1"),
                ("email_present", "1"),
            ]),
        );
        let activity = &build_activities(&tables).unwrap()[0];
        let contact = activity.contact_info.as_ref().unwrap();
        let person = contact.person_name.as_ref().unwrap();
        assert_eq!(person[0].text, "");
        assert_eq!(contact.email.as_deref(), Some(""));
    }

    #[test]
    fn test_country_budget_items_grouped_by_vocabulary() {
        let mut tables = with_activity(&[("activity_identifier", "A")]);
        for (vocabulary, code) in [("2", "1.1.1"), ("2", "1.2.1"), ("4", "2.1.1")] {
            tables.push(
                TableId::CountryBudgetItems,
                row(&[
                    ("activity_identifier", "A"),
                    ("vocabulary", vocabulary),
                    ("budget_item_code", code),
                ]),
            );
        }
        let activity = &build_activities(&tables).unwrap()[0];
        assert_eq!(activity.country_budget_items.len(), 2);
        assert_eq!(activity.country_budget_items[0].vocabulary, "2");
        assert_eq!(activity.country_budget_items[0].items.len(), 2);
        assert_eq!(activity.country_budget_items[1].vocabulary, "4");
    }

    #[test]
    fn test_rows_for_other_activities_ignored() {
        let mut tables = with_activity(&[("activity_identifier", "A")]);
        tables.push(
            TableId::Sectors,
            row(&[("activity_identifier", "B"), ("sector_code", "11110")]),
        );
        let activity = &build_activities(&tables).unwrap()[0];
        assert!(activity.sectors.is_empty());
    }

    #[test]
    fn test_location_point_requires_both_coordinates() {
        let mut tables = with_activity(&[("activity_identifier", "A")]);
        tables.push(
            TableId::Locations,
            row(&[("activity_identifier", "A"), ("latitude", "9.93")]),
        );
        tables.push(
            TableId::Locations,
            row(&[
                ("activity_identifier", "A"),
                ("latitude", "9.93"),
                ("longitude", "-84.08"),
            ]),
        );
        let activity = &build_activities(&tables).unwrap()[0];
        assert!(activity.locations[0].point.is_none());
        let point = activity.locations[1].point.as_ref().unwrap();
        assert_eq!(point.srs_name, Point::WGS84);
        assert_eq!(point.latitude, "9.93");
    }
}
