//! XML-to-row extraction for IATI activity documents.
//!
//! Walks a parsed `iati-activities` document with [roxmltree] and flattens
//! each `iati-activity` element into rows for the relational tables described
//! by [`crate::schema`]. Extraction is lazy about bad data: missing elements
//! and attributes become empty cells, unknown codes are copied through
//! verbatim, and an activity without an `iati-identifier` still produces rows
//! (keyed by the empty identifier) so nothing is silently dropped.
//!
//! The entry points are:
//!
//! - [`parse_document`] - parse raw XML text
//! - [`extract_document`] - flatten every activity in a document
//! - [`extract_activity`] - flatten a single `iati-activity` element

use std::collections::HashSet;

use roxmltree::{Document, Node};

use crate::error::ExtractResult;
use crate::models::{synthetic_result_ref, IndicatorKey};
use crate::schema::{Row, TableId, TableSet};

/// Namespace URI for the reserved `xml:` prefix (`xml:lang`).
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

// =============================================================================
// Entry Points
// =============================================================================

/// Parse raw XML text into a [roxmltree] document.
pub fn parse_document(xml: &str) -> ExtractResult<Document<'_>> {
    Ok(Document::parse(xml)?)
}

/// Root attribute carried through to the conversion summary.
pub fn root_linked_data_default(doc: &Document) -> String {
    attr(doc.root_element(), "linked-data-default").to_string()
}

/// Flatten every `iati-activity` in the document into table rows.
pub fn extract_document(doc: &Document) -> TableSet {
    let mut tables = TableSet::new();
    for (index, activity) in doc
        .descendants()
        .filter(|n| n.is_element() && n.has_tag_name("iati-activity"))
        .enumerate()
    {
        let activity_id = child_text(activity, "iati-identifier");
        if activity_id.is_empty() {
            log::warn!(
                "activity {} has no iati-identifier; rows will carry an empty identifier",
                index + 1
            );
        }
        extract_activity(activity, &mut tables);
    }
    tables
}

/// Flatten one `iati-activity` element, appending its rows to `tables`.
pub fn extract_activity(activity: Node, tables: &mut TableSet) {
    let activity_id = child_text(activity, "iati-identifier");

    extract_main(activity, &activity_id, tables);
    extract_descriptions(activity, &activity_id, tables);
    extract_participating_orgs(activity, &activity_id, tables);
    extract_sectors(activity, &activity_id, tables);
    extract_budgets(activity, &activity_id, tables);
    extract_transactions(activity, &activity_id, tables);
    extract_locations(activity, &activity_id, tables);
    extract_documents(activity, &activity_id, tables);
    extract_results(activity, &activity_id, tables);
    extract_contact_info(activity, &activity_id, tables);
    extract_activity_dates(activity, &activity_id, tables);
    extract_conditions(activity, &activity_id, tables);
    extract_country_budget_items(activity, &activity_id, tables);
}

// =============================================================================
// Node Helpers
// =============================================================================

fn attr<'a>(node: Node<'a, '_>, name: &str) -> &'a str {
    node.attribute(name).unwrap_or("")
}

fn xml_lang<'a>(node: Node<'a, '_>) -> &'a str {
    node.attribute((XML_NS, "lang")).unwrap_or("")
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|n| n.is_element() && n.has_tag_name(name))
}

fn children<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Vec<Node<'a, 'i>> {
    node.children()
        .filter(|n| n.is_element() && n.has_tag_name(name))
        .collect()
}

/// Text content of a node, empty when the node is absent or has no text.
fn node_text(node: Option<Node>) -> String {
    node.and_then(|n| n.text()).unwrap_or("").to_string()
}

fn child_text(node: Node, name: &str) -> String {
    node_text(child(node, name))
}

/// `<parent>/<narrative>` text plus its `xml:lang`.
fn narrative_of(node: Option<Node>) -> (String, String) {
    match node.and_then(|n| child(n, "narrative")) {
        Some(narrative) => (node_text(Some(narrative)), xml_lang(narrative).to_string()),
        None => (String::new(), String::new()),
    }
}

fn set(row: &mut Row, column: &str, value: impl Into<String>) {
    row.insert(column.to_string(), value.into());
}

/// Fill in empty cells for every schema column the extractor did not set.
fn pad(mut row: Row, id: TableId) -> Row {
    for column in id.spec().columns {
        row.entry((*column).to_string()).or_default();
    }
    row
}

fn base_row(activity_id: &str) -> Row {
    let mut row = Row::new();
    set(&mut row, "activity_identifier", activity_id);
    row
}

/// Attribute with legacy `"0"` normalised to empty (used for transaction
/// finance-type, aid-type and tied-status, where some publishers emit `0`
/// as a null marker).
fn attr_zero_as_empty<'a>(node: Node<'a, '_>, name: &str) -> &'a str {
    let value = attr(node, name);
    if value == "0" {
        ""
    } else {
        value
    }
}

// =============================================================================
// Activities (main table)
// =============================================================================

fn extract_main(activity: Node, activity_id: &str, tables: &mut TableSet) {
    let mut row = base_row(activity_id);

    set(&mut row, "default_currency", attr(activity, "default-currency"));
    set(&mut row, "humanitarian", attr(activity, "humanitarian"));
    set(&mut row, "hierarchy", attr(activity, "hierarchy"));
    set(
        &mut row,
        "last_updated_datetime",
        attr(activity, "last-updated-datetime"),
    );
    let lang = activity.attribute((XML_NS, "lang")).unwrap_or("en");
    set(&mut row, "xml_lang", lang);

    let (title, title_lang) = narrative_of(child(activity, "title"));
    set(&mut row, "title", title);
    set(&mut row, "title_lang", title_lang);

    // Prefer the general-purpose description (type 1), fall back to the
    // first description of any type.
    let descriptions = children(activity, "description");
    let general = descriptions
        .iter()
        .find(|d| d.attribute("type") == Some("1"))
        .and_then(|d| child(*d, "narrative"))
        .or_else(|| descriptions.first().and_then(|d| child(*d, "narrative")));
    match general {
        Some(narrative) => {
            set(&mut row, "description", node_text(Some(narrative)));
            set(&mut row, "description_lang", xml_lang(narrative));
        }
        None => {
            set(&mut row, "description", "");
            set(&mut row, "description_lang", "");
        }
    }

    if let Some(status) = child(activity, "activity-status") {
        set(&mut row, "activity_status", attr(status, "code"));
    }
    if let Some(scope) = child(activity, "activity-scope") {
        set(&mut row, "activity_scope", attr(scope, "code"));
    }

    if let Some(reporting) = child(activity, "reporting-org") {
        set(&mut row, "reporting_org_ref", attr(reporting, "ref"));
        set(&mut row, "reporting_org_type", attr(reporting, "type"));
        set(
            &mut row,
            "reporting_org_secondary_reporter",
            attr(reporting, "secondary-reporter"),
        );
        set(&mut row, "reporting_org_role", attr(reporting, "role"));
        let (name, name_lang) = narrative_of(Some(reporting));
        set(&mut row, "reporting_org_name", name);
        set(&mut row, "reporting_org_name_lang", name_lang);
    }

    if let Some(country) = child(activity, "recipient-country") {
        set(&mut row, "recipient_country_code", attr(country, "code"));
        let (name, name_lang) = narrative_of(Some(country));
        set(&mut row, "recipient_country_name", name);
        set(&mut row, "recipient_country_lang", name_lang);
        set(&mut row, "recipient_country_percentage", attr(country, "percentage"));
    }

    if let Some(region) = child(activity, "recipient-region") {
        set(&mut row, "recipient_region_code", attr(region, "code"));
        let (name, name_lang) = narrative_of(Some(region));
        set(&mut row, "recipient_region_name", name);
        set(&mut row, "recipient_region_lang", name_lang);
        set(&mut row, "recipient_region_percentage", attr(region, "percentage"));
    }

    if let Some(collab) = child(activity, "collaboration-type") {
        set(&mut row, "collaboration_type", attr(collab, "code"));
    }
    if let Some(flow) = child(activity, "default-flow-type") {
        set(&mut row, "default_flow_type", attr(flow, "code"));
    }
    if let Some(finance) = child(activity, "default-finance-type") {
        set(&mut row, "default_finance_type", attr(finance, "code"));
    }
    if let Some(aid) = child(activity, "default-aid-type") {
        set(&mut row, "default_aid_type", attr(aid, "code"));
        set(&mut row, "default_aid_type_vocabulary", attr(aid, "vocabulary"));
    }
    if let Some(tied) = child(activity, "default-tied-status") {
        set(&mut row, "default_tied_status", attr(tied, "code"));
    }
    if let Some(conditions) = child(activity, "conditions") {
        set(&mut row, "conditions_attached", attr(conditions, "attached"));
    }

    tables.push(TableId::Activities, pad(row, TableId::Activities));
}

// =============================================================================
// Descriptions
// =============================================================================

fn extract_descriptions(activity: Node, activity_id: &str, tables: &mut TableSet) {
    for (desc_index, description) in children(activity, "description").into_iter().enumerate() {
        let narratives = children(description, "narrative");
        if narratives.is_empty() {
            // Keep the block itself even when it has no narrative text.
            let mut row = base_row(activity_id);
            set(&mut row, "description_type", attr(description, "type"));
            set(&mut row, "description_sequence", (desc_index + 1).to_string());
            set(&mut row, "narrative", "");
            set(&mut row, "narrative_lang", "");
            set(&mut row, "narrative_sequence", "1");
            tables.push(TableId::Descriptions, pad(row, TableId::Descriptions));
            continue;
        }
        for (narr_index, narrative) in narratives.into_iter().enumerate() {
            let mut row = base_row(activity_id);
            set(&mut row, "description_type", attr(description, "type"));
            set(&mut row, "description_sequence", (desc_index + 1).to_string());
            set(&mut row, "narrative", node_text(Some(narrative)));
            set(&mut row, "narrative_lang", xml_lang(narrative));
            set(&mut row, "narrative_sequence", (narr_index + 1).to_string());
            tables.push(TableId::Descriptions, pad(row, TableId::Descriptions));
        }
    }
}

// =============================================================================
// Participating Organisations
// =============================================================================

fn extract_participating_orgs(activity: Node, activity_id: &str, tables: &mut TableSet) {
    for org in children(activity, "participating-org") {
        let mut row = base_row(activity_id);
        set(&mut row, "org_ref", attr(org, "ref"));
        set(&mut row, "org_type", attr(org, "type"));
        set(&mut row, "role", attr(org, "role"));
        set(&mut row, "activity_id", attr(org, "activity-id"));
        set(&mut row, "crs_channel_code", attr(org, "crs-channel-code"));
        let (name, name_lang) = narrative_of(Some(org));
        set(&mut row, "org_name", name);
        set(&mut row, "org_name_lang", name_lang);
        tables.push(TableId::ParticipatingOrgs, pad(row, TableId::ParticipatingOrgs));
    }
}

// =============================================================================
// Sectors
// =============================================================================

fn extract_sectors(activity: Node, activity_id: &str, tables: &mut TableSet) {
    for sector in children(activity, "sector") {
        let mut row = base_row(activity_id);
        set(&mut row, "sector_code", attr(sector, "code"));
        let vocabulary = attr(sector, "vocabulary");
        set(&mut row, "vocabulary", if vocabulary.is_empty() { "1" } else { vocabulary });
        set(&mut row, "vocabulary_uri", attr(sector, "vocabulary-uri"));
        set(&mut row, "percentage", attr(sector, "percentage"));
        let (name, _) = narrative_of(Some(sector));
        set(&mut row, "sector_name", name);
        tables.push(TableId::Sectors, pad(row, TableId::Sectors));
    }
}

// =============================================================================
// Budgets
// =============================================================================

fn extract_budgets(activity: Node, activity_id: &str, tables: &mut TableSet) {
    for budget in children(activity, "budget") {
        let mut row = base_row(activity_id);
        set(&mut row, "budget_type", attr(budget, "type"));
        set(&mut row, "budget_status", attr(budget, "status"));
        set(
            &mut row,
            "period_start",
            child(budget, "period-start").map(|n| attr(n, "iso-date")).unwrap_or(""),
        );
        set(
            &mut row,
            "period_end",
            child(budget, "period-end").map(|n| attr(n, "iso-date")).unwrap_or(""),
        );
        let value = child(budget, "value");
        set(&mut row, "value", node_text(value));
        set(&mut row, "currency", value.map(|n| attr(n, "currency")).unwrap_or(""));
        set(&mut row, "value_date", value.map(|n| attr(n, "value-date")).unwrap_or(""));
        tables.push(TableId::Budgets, pad(row, TableId::Budgets));
    }
}

// =============================================================================
// Transactions
// =============================================================================

fn extract_transactions(activity: Node, activity_id: &str, tables: &mut TableSet) {
    // Sector duplicates are collapsed across the whole activity, so two
    // transactions with the same ref and type share one sector row.
    let mut seen_sectors: HashSet<(String, String, String, String)> = HashSet::new();

    for transaction in children(activity, "transaction") {
        let transaction_ref = attr(transaction, "ref").to_string();
        let transaction_type =
            node_attr(child(transaction, "transaction-type"), "code").to_string();

        let mut row = base_row(activity_id);
        set(&mut row, "transaction_ref", &transaction_ref);
        set(&mut row, "humanitarian", attr(transaction, "humanitarian"));
        set(&mut row, "transaction_type", &transaction_type);
        set(
            &mut row,
            "transaction_date",
            node_attr(child(transaction, "transaction-date"), "iso-date"),
        );

        let value = child(transaction, "value");
        set(&mut row, "value", node_text(value));
        set(&mut row, "currency", value.map(|n| attr(n, "currency")).unwrap_or(""));
        set(&mut row, "value_date", value.map(|n| attr(n, "value-date")).unwrap_or(""));

        let (desc, desc_lang) = narrative_of(child(transaction, "description"));
        set(&mut row, "description", desc);
        set(&mut row, "description_lang", desc_lang);

        if let Some(provider) = child(transaction, "provider-org") {
            set(&mut row, "provider_org_ref", attr(provider, "ref"));
            set(&mut row, "provider_org_type", attr(provider, "type"));
            let (name, name_lang) = narrative_of(Some(provider));
            set(&mut row, "provider_org_name", name);
            set(&mut row, "provider_org_lang", name_lang);
        }
        if let Some(receiver) = child(transaction, "receiver-org") {
            set(&mut row, "receiver_org_ref", attr(receiver, "ref"));
            set(&mut row, "receiver_org_type", attr(receiver, "type"));
            set(
                &mut row,
                "receiver_org_activity_id",
                attr(receiver, "receiver-activity-id"),
            );
            let (name, name_lang) = narrative_of(Some(receiver));
            set(&mut row, "receiver_org_name", name);
            set(&mut row, "receiver_org_lang", name_lang);
        }

        set(
            &mut row,
            "disbursement_channel",
            node_attr(child(transaction, "disbursement-channel"), "code"),
        );
        set(&mut row, "flow_type", node_attr(child(transaction, "flow-type"), "code"));
        if let Some(finance) = child(transaction, "finance-type") {
            set(&mut row, "finance_type", attr_zero_as_empty(finance, "code"));
        }
        if let Some(aid) = child(transaction, "aid-type") {
            set(&mut row, "aid_type", attr_zero_as_empty(aid, "code"));
            set(&mut row, "aid_type_vocabulary", attr(aid, "vocabulary"));
        }
        if let Some(tied) = child(transaction, "tied-status") {
            set(&mut row, "tied_status", attr_zero_as_empty(tied, "code"));
        }
        set(
            &mut row,
            "recipient_region",
            node_attr(child(transaction, "recipient-region"), "code"),
        );
        tables.push(TableId::Transactions, pad(row, TableId::Transactions));

        for sector in children(transaction, "sector") {
            let code = attr(sector, "code").to_string();
            let vocabulary = attr(sector, "vocabulary");
            let vocabulary = if vocabulary.is_empty() { "1" } else { vocabulary }.to_string();
            let key = (
                transaction_ref.clone(),
                transaction_type.clone(),
                code.clone(),
                vocabulary.clone(),
            );
            if !seen_sectors.insert(key) {
                continue;
            }
            let mut sector_row = base_row(activity_id);
            set(&mut sector_row, "transaction_ref", &transaction_ref);
            set(&mut sector_row, "transaction_type", &transaction_type);
            set(&mut sector_row, "sector_code", code);
            set(&mut sector_row, "vocabulary", vocabulary);
            set(&mut sector_row, "vocabulary_uri", attr(sector, "vocabulary-uri"));
            let (name, _) = narrative_of(Some(sector));
            set(&mut sector_row, "sector_name", name);
            tables.push(
                TableId::TransactionSectors,
                pad(sector_row, TableId::TransactionSectors),
            );
        }
    }
}

fn node_attr<'a>(node: Option<Node<'a, '_>>, name: &str) -> &'a str {
    node.map(|n| attr(n, name)).unwrap_or("")
}

// =============================================================================
// Locations
// =============================================================================

fn extract_locations(activity: Node, activity_id: &str, tables: &mut TableSet) {
    for location in children(activity, "location") {
        let mut row = base_row(activity_id);
        set(&mut row, "location_ref", attr(location, "ref"));

        // Standard form puts these on child elements; some legacy documents
        // carry them as attributes of <location> instead.
        set(
            &mut row,
            "location_reach",
            coded_child_or_attr(location, "location-reach", "reach"),
        );
        set(
            &mut row,
            "exactness",
            coded_child_or_attr(location, "exactness", "exactness"),
        );
        set(
            &mut row,
            "location_class",
            coded_child_or_attr(location, "location-class", "class"),
        );
        set(
            &mut row,
            "feature_designation",
            coded_child_or_attr(location, "feature-designation", "feature-designation"),
        );

        if let Some(location_id) = child(location, "location-id") {
            set(&mut row, "location_id_vocabulary", attr(location_id, "vocabulary"));
            set(&mut row, "location_id_code", attr(location_id, "code"));
        }

        let (name, name_lang) = narrative_of(child(location, "name"));
        set(&mut row, "name", name);
        set(&mut row, "name_lang", name_lang);
        let (desc, desc_lang) = narrative_of(child(location, "description"));
        set(&mut row, "description", desc);
        set(&mut row, "description_lang", desc_lang);
        let (activity_desc, activity_desc_lang) =
            narrative_of(child(location, "activity-description"));
        set(&mut row, "activity_description", activity_desc);
        set(&mut row, "activity_description_lang", activity_desc_lang);

        let pos = child(location, "point").map(|p| child_text(p, "pos")).unwrap_or_default();
        let coords: Vec<&str> = pos.split_whitespace().collect();
        if coords.len() >= 2 {
            set(&mut row, "latitude", coords[0]);
            set(&mut row, "longitude", coords[1]);
        } else {
            set(&mut row, "latitude", "");
            set(&mut row, "longitude", "");
        }

        if let Some(admin) = child(location, "administrative") {
            set(&mut row, "administrative_vocabulary", attr(admin, "vocabulary"));
            set(&mut row, "administrative_level", attr(admin, "level"));
            set(&mut row, "administrative_code", attr(admin, "code"));
            set(&mut row, "administrative_country", attr(admin, "country"));
        }

        tables.push(TableId::Locations, pad(row, TableId::Locations));
    }
}

fn coded_child_or_attr<'a>(node: Node<'a, '_>, child_name: &str, attr_name: &str) -> &'a str {
    match child(node, child_name) {
        Some(coded) => attr(coded, "code"),
        None => attr(node, attr_name),
    }
}

// =============================================================================
// Documents
// =============================================================================

fn extract_documents(activity: Node, activity_id: &str, tables: &mut TableSet) {
    for document in children(activity, "document-link") {
        let mut row = base_row(activity_id);
        set(&mut row, "url", attr(document, "url"));
        set(&mut row, "format", attr(document, "format"));

        let (title, title_lang) = narrative_of(child(document, "title"));
        set(&mut row, "title", title);
        set(&mut row, "title_lang", title_lang);
        let (desc, desc_lang) = narrative_of(child(document, "description"));
        set(&mut row, "description", desc);
        set(&mut row, "description_lang", desc_lang);

        set(&mut row, "category_code", node_attr(child(document, "category"), "code"));
        set(&mut row, "language_code", node_attr(child(document, "language"), "code"));

        let document_date = match child(document, "document-date") {
            Some(date) => attr(date, "iso-date"),
            None => attr(document, "document-date"),
        };
        set(&mut row, "document_date", document_date);

        tables.push(TableId::Documents, pad(row, TableId::Documents));
    }
}

// =============================================================================
// Results, Indicators, Indicator Periods
// =============================================================================

fn extract_results(activity: Node, activity_id: &str, tables: &mut TableSet) {
    for (result_index, result) in children(activity, "result").into_iter().enumerate() {
        let reference = attr(result, "ref");
        let result_ref = if reference.is_empty() {
            synthetic_result_ref(result_index + 1)
        } else {
            reference.to_string()
        };

        let mut row = base_row(activity_id);
        set(&mut row, "result_ref", &result_ref);
        set(&mut row, "result_type", attr(result, "type"));
        set(&mut row, "aggregation_status", attr(result, "aggregation-status"));
        let (title, _) = narrative_of(child(result, "title"));
        set(&mut row, "title", title);
        let (desc, _) = narrative_of(child(result, "description"));
        set(&mut row, "description", desc);
        tables.push(TableId::Results, pad(row, TableId::Results));

        for (indicator_index, indicator) in children(result, "indicator").into_iter().enumerate() {
            let key = IndicatorKey {
                activity_id: activity_id.to_string(),
                result_ref: result_ref.clone(),
                ordinal: indicator_index + 1,
            };
            let indicator_ref = key.to_string();

            let mut row = base_row(activity_id);
            set(&mut row, "result_ref", &result_ref);
            set(&mut row, "indicator_ref", &indicator_ref);
            set(&mut row, "indicator_measure", attr(indicator, "measure"));
            set(&mut row, "ascending", attr(indicator, "ascending"));
            set(&mut row, "aggregation_status", attr(indicator, "aggregation-status"));
            let (title, _) = narrative_of(child(indicator, "title"));
            set(&mut row, "title", title.trim());
            let (desc, _) = narrative_of(child(indicator, "description"));
            set(&mut row, "description", desc.trim());

            if let Some(baseline) = child(indicator, "baseline") {
                set(&mut row, "baseline_year", attr(baseline, "year"));
                set(&mut row, "baseline_iso_date", attr(baseline, "iso-date"));
                set(&mut row, "baseline_value", attr(baseline, "value"));
                let (comment, _) = narrative_of(child(baseline, "comment"));
                set(&mut row, "baseline_comment", comment.trim());
            }
            tables.push(TableId::Indicators, pad(row, TableId::Indicators));

            for period in children(indicator, "period") {
                let mut row = base_row(activity_id);
                set(&mut row, "result_ref", &result_ref);
                set(&mut row, "indicator_ref", &indicator_ref);
                set(
                    &mut row,
                    "period_start",
                    node_attr(child(period, "period-start"), "iso-date"),
                );
                set(
                    &mut row,
                    "period_end",
                    node_attr(child(period, "period-end"), "iso-date"),
                );
                set(&mut row, "target_value", node_attr(child(period, "target"), "value"));
                let (target_comment, _) =
                    narrative_of(child(period, "target").and_then(|t| child(t, "comment")));
                set(&mut row, "target_comment", target_comment);
                set(&mut row, "actual_value", node_attr(child(period, "actual"), "value"));
                let (actual_comment, _) =
                    narrative_of(child(period, "actual").and_then(|a| child(a, "comment")));
                set(&mut row, "actual_comment", actual_comment);
                tables.push(TableId::IndicatorPeriods, pad(row, TableId::IndicatorPeriods));
            }
        }
    }
}

// =============================================================================
// Contact Info
// =============================================================================

fn extract_contact_info(activity: Node, activity_id: &str, tables: &mut TableSet) {
    // Only the first contact-info block is tabulated.
    let Some(contact) = child(activity, "contact-info") else {
        return;
    };

    let mut row = base_row(activity_id);
    set(&mut row, "contact_type", attr(contact, "type"));

    let (organisation, organisation_lang) = narrative_of(child(contact, "organisation"));
    set(&mut row, "organisation", organisation);
    set(&mut row, "organisation_lang", organisation_lang);
    let (department, department_lang) = narrative_of(child(contact, "department"));
    set(&mut row, "department", department);
    set(&mut row, "department_lang", department_lang);

    let person_name = child(contact, "person-name");
    let (person, person_lang) = narrative_of(person_name);
    set(&mut row, "person_name", person);
    set(&mut row, "person_name_lang", person_lang);
    let person_present = person_name.and_then(|p| child(p, "narrative")).is_some();
    set(&mut row, "person_name_present", if person_present { "1" } else { "" });

    let (job_title, job_title_lang) = narrative_of(child(contact, "job-title"));
    set(&mut row, "job_title", job_title);
    set(&mut row, "job_title_lang", job_title_lang);

    set(&mut row, "telephone", child_text(contact, "telephone"));
    let email = child(contact, "email");
    set(&mut row, "email", node_text(email));
    set(&mut row, "email_present", if email.is_some() { "1" } else { "" });
    set(&mut row, "website", child_text(contact, "website"));

    let (address, address_lang) = narrative_of(child(contact, "mailing-address"));
    set(&mut row, "mailing_address", address);
    set(&mut row, "mailing_address_lang", address_lang);

    tables.push(TableId::ContactInfo, pad(row, TableId::ContactInfo));
}

// =============================================================================
// Activity Dates
// =============================================================================

fn extract_activity_dates(activity: Node, activity_id: &str, tables: &mut TableSet) {
    for date in children(activity, "activity-date") {
        let mut row = base_row(activity_id);
        set(&mut row, "type", attr(date, "type"));
        set(&mut row, "iso_date", attr(date, "iso-date"));
        let (narrative, narrative_lang) = narrative_of(Some(date));
        set(&mut row, "narrative", narrative);
        set(&mut row, "narrative_lang", narrative_lang);
        tables.push(TableId::ActivityDate, pad(row, TableId::ActivityDate));
    }
}

// =============================================================================
// Conditions
// =============================================================================

fn extract_conditions(activity: Node, activity_id: &str, tables: &mut TableSet) {
    let Some(conditions) = child(activity, "conditions") else {
        return;
    };
    for condition in children(conditions, "condition") {
        let mut row = base_row(activity_id);
        set(&mut row, "condition_type", attr(condition, "type"));
        let (text, _) = narrative_of(Some(condition));
        set(&mut row, "condition_text", text);
        tables.push(TableId::Conditions, pad(row, TableId::Conditions));
    }
}

// =============================================================================
// Country Budget Items
// =============================================================================

fn extract_country_budget_items(activity: Node, activity_id: &str, tables: &mut TableSet) {
    for block in children(activity, "country-budget-items") {
        let vocabulary = attr(block, "vocabulary");
        for item in children(block, "budget-item") {
            let mut row = base_row(activity_id);
            set(&mut row, "vocabulary", vocabulary);
            set(&mut row, "budget_item_code", attr(item, "code"));
            set(&mut row, "budget_item_percentage", attr(item, "percentage"));
            let (desc, desc_lang) = narrative_of(child(item, "description"));
            set(&mut row, "description", desc);
            set(&mut row, "description_lang", desc_lang);
            tables.push(TableId::CountryBudgetItems, pad(row, TableId::CountryBudgetItems));
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::cell;

    fn wrap(activity_body: &str) -> String {
        format!(
            "<iati-activities version=\"2.03\"><iati-activity>{}</iati-activity></iati-activities>",
            activity_body
        )
    }

    fn extract(body: &str) -> TableSet {
        let xml = wrap(body);
        let doc = Document::parse(&xml).unwrap();
        extract_document(&doc)
    }

    #[test]
    fn test_main_row_defaults() {
        let tables = extract("<iati-identifier>XM-1</iati-identifier>");
        let rows = tables.rows(TableId::Activities);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(cell(row, "activity_identifier"), "XM-1");
        assert_eq!(cell(row, "xml_lang"), "en");
        assert_eq!(cell(row, "humanitarian"), "");
        // Every schema column is present even when the source is sparse.
        for column in TableId::Activities.spec().columns {
            assert!(row.contains_key(*column), "missing column {column}");
        }
    }

    #[test]
    fn test_tri_state_flags_copied_verbatim() {
        let zero = extract("<iati-identifier>A</iati-identifier><transaction humanitarian=\"0\"/>");
        assert_eq!(cell(&zero.rows(TableId::Transactions)[0], "humanitarian"), "0");

        let one = extract("<iati-identifier>A</iati-identifier><transaction humanitarian=\"1\"/>");
        assert_eq!(cell(&one.rows(TableId::Transactions)[0], "humanitarian"), "1");

        let absent = extract("<iati-identifier>A</iati-identifier><transaction/>");
        assert_eq!(cell(&absent.rows(TableId::Transactions)[0], "humanitarian"), "");
    }

    #[test]
    fn test_description_preference_and_sequences() {
        let tables = extract(
            "<iati-identifier>A</iati-identifier>\
             <description type=\"2\"><narrative>Objectives</narrative></description>\
             <description type=\"1\">\
               <narrative xml:lang=\"en\">General</narrative>\
               <narrative xml:lang=\"fr\">Generale</narrative>\
             </description>",
        );
        let main = &tables.rows(TableId::Activities)[0];
        assert_eq!(cell(main, "description"), "General");
        assert_eq!(cell(main, "description_lang"), "en");

        let rows = tables.rows(TableId::Descriptions);
        assert_eq!(rows.len(), 3);
        assert_eq!(cell(&rows[0], "description_sequence"), "1");
        assert_eq!(cell(&rows[0], "narrative_sequence"), "1");
        assert_eq!(cell(&rows[0], "narrative"), "Objectives");
        assert_eq!(cell(&rows[1], "description_sequence"), "2");
        assert_eq!(cell(&rows[1], "narrative_sequence"), "1");
        assert_eq!(cell(&rows[2], "description_sequence"), "2");
        assert_eq!(cell(&rows[2], "narrative_sequence"), "2");
        assert_eq!(cell(&rows[2], "narrative_lang"), "fr");
    }

    #[test]
    fn test_description_without_narrative_keeps_block() {
        let tables = extract("<iati-identifier>A</iati-identifier><description type=\"3\"/>");
        let rows = tables.rows(TableId::Descriptions);
        assert_eq!(rows.len(), 1);
        assert_eq!(cell(&rows[0], "description_type"), "3");
        assert_eq!(cell(&rows[0], "narrative"), "");
        assert_eq!(cell(&rows[0], "narrative_sequence"), "1");
    }

    #[test]
    fn test_no_invented_language() {
        let tables = extract(
            "<iati-identifier>A</iati-identifier>\
             <title><narrative>No language here</narrative></title>",
        );
        let row = &tables.rows(TableId::Activities)[0];
        assert_eq!(cell(row, "title"), "No language here");
        assert_eq!(cell(row, "title_lang"), "");
    }

    #[test]
    fn test_sector_vocabulary_defaults_to_dac() {
        let tables = extract(
            "<iati-identifier>A</iati-identifier>\
             <sector code=\"11110\"/>\
             <sector code=\"1.1.1\" vocabulary=\"98\"/>",
        );
        let rows = tables.rows(TableId::Sectors);
        assert_eq!(cell(&rows[0], "vocabulary"), "1");
        assert_eq!(cell(&rows[1], "vocabulary"), "98");
    }

    #[test]
    fn test_transaction_sector_dedup() {
        let tables = extract(
            "<iati-identifier>A</iati-identifier>\
             <transaction ref=\"t1\">\
               <transaction-type code=\"3\"/>\
               <sector code=\"11110\"/>\
             </transaction>\
             <transaction ref=\"t1\">\
               <transaction-type code=\"3\"/>\
               <sector code=\"11110\"/>\
               <sector code=\"12220\"/>\
             </transaction>",
        );
        assert_eq!(tables.len(TableId::Transactions), 2);
        let sectors = tables.rows(TableId::TransactionSectors);
        assert_eq!(sectors.len(), 2);
        assert_eq!(cell(&sectors[0], "sector_code"), "11110");
        assert_eq!(cell(&sectors[1], "sector_code"), "12220");
    }

    #[test]
    fn test_transaction_zero_codes_dropped() {
        let tables = extract(
            "<iati-identifier>A</iati-identifier>\
             <transaction>\
               <finance-type code=\"0\"/>\
               <aid-type code=\"0\"/>\
               <tied-status code=\"0\"/>\
             </transaction>",
        );
        let row = &tables.rows(TableId::Transactions)[0];
        assert_eq!(cell(row, "finance_type"), "");
        assert_eq!(cell(row, "aid_type"), "");
        assert_eq!(cell(row, "tied_status"), "");
    }

    #[test]
    fn test_synthetic_result_and_indicator_refs() {
        let tables = extract(
            "<iati-identifier>XM-1</iati-identifier>\
             <result type=\"1\">\
               <indicator measure=\"1\"><title><narrative> Spaced </narrative></title></indicator>\
               <indicator measure=\"2\"/>\
             </result>\
             <result ref=\"outcome\" type=\"2\">\
               <indicator measure=\"1\">\
                 <period>\
                   <period-start iso-date=\"2024-01-01\"/>\
                   <period-end iso-date=\"2024-12-31\"/>\
                   <target value=\"10\"/>\
                 </period>\
               </indicator>\
             </result>",
        );
        let results = tables.rows(TableId::Results);
        assert_eq!(cell(&results[0], "result_ref"), "result_1");
        assert_eq!(cell(&results[1], "result_ref"), "outcome");

        let indicators = tables.rows(TableId::Indicators);
        assert_eq!(cell(&indicators[0], "indicator_ref"), "indicator_XM-1_result_1_1");
        assert_eq!(cell(&indicators[0], "title"), "Spaced");
        assert_eq!(cell(&indicators[1], "indicator_ref"), "indicator_XM-1_result_1_2");
        assert_eq!(cell(&indicators[2], "indicator_ref"), "indicator_XM-1_outcome_1");

        let periods = tables.rows(TableId::IndicatorPeriods);
        assert_eq!(periods.len(), 1);
        assert_eq!(cell(&periods[0], "indicator_ref"), "indicator_XM-1_outcome_1");
        assert_eq!(cell(&periods[0], "target_value"), "10");
        assert_eq!(cell(&periods[0], "actual_value"), "");
    }

    #[test]
    fn test_location_legacy_attributes() {
        let tables = extract(
            "<iati-identifier>A</iati-identifier>\
             <location reach=\"1\" exactness=\"2\" class=\"3\" feature-designation=\"PPLA\">\
               <point srsName=\"http://www.opengis.net/def/crs/EPSG/0/4326\">\
                 <pos>9.93 -84.08</pos>\
               </point>\
             </location>\
             <location>\
               <location-reach code=\"2\"/>\
               <exactness code=\"1\"/>\
             </location>",
        );
        let rows = tables.rows(TableId::Locations);
        assert_eq!(cell(&rows[0], "location_reach"), "1");
        assert_eq!(cell(&rows[0], "exactness"), "2");
        assert_eq!(cell(&rows[0], "location_class"), "3");
        assert_eq!(cell(&rows[0], "feature_designation"), "PPLA");
        assert_eq!(cell(&rows[0], "latitude"), "9.93");
        assert_eq!(cell(&rows[0], "longitude"), "-84.08");
        assert_eq!(cell(&rows[1], "location_reach"), "2");
        assert_eq!(cell(&rows[1], "exactness"), "1");
    }

    #[test]
    fn test_contact_info_first_block_only() {
        let tables = extract(
            "<iati-identifier>A</iati-identifier>\
             <contact-info type=\"1\">\
               <person-name><narrative>Ana Mora</narrative></person-name>\
               <email>ana@example.org</email>\
             </contact-info>\
             <contact-info type=\"2\"/>",
        );
        let rows = tables.rows(TableId::ContactInfo);
        assert_eq!(rows.len(), 1);
        assert_eq!(cell(&rows[0], "contact_type"), "1");
        assert_eq!(cell(&rows[0], "person_name_present"), "1");
        assert_eq!(cell(&rows[0], "email"), "ana@example.org");
        assert_eq!(cell(&rows[0], "email_present"), "1");
    }

    #[test]
    fn test_country_budget_items_share_vocabulary() {
        let tables = extract(
            "<iati-identifier>A</iati-identifier>\
             <country-budget-items vocabulary=\"2\">\
               <budget-item code=\"1.1.1\" percentage=\"60\"/>\
               <budget-item code=\"1.2.1\" percentage=\"40\">\
                 <description><narrative>Teaching</narrative></description>\
               </budget-item>\
             </country-budget-items>",
        );
        let rows = tables.rows(TableId::CountryBudgetItems);
        assert_eq!(rows.len(), 2);
        assert_eq!(cell(&rows[0], "vocabulary"), "2");
        assert_eq!(cell(&rows[1], "vocabulary"), "2");
        assert_eq!(cell(&rows[1], "description"), "Teaching");
    }

    #[test]
    fn test_missing_identifier_still_extracts() {
        let tables = extract("<title><narrative>No id</narrative></title>");
        let rows = tables.rows(TableId::Activities);
        assert_eq!(rows.len(), 1);
        assert_eq!(cell(&rows[0], "activity_identifier"), "");
        assert_eq!(cell(&rows[0], "title"), "No id");
    }

    #[test]
    fn test_document_date_both_forms() {
        let tables = extract(
            "<iati-identifier>A</iati-identifier>\
             <document-link url=\"https://example.org/a.pdf\" format=\"application/pdf\">\
               <document-date iso-date=\"2024-03-01\"/>\
             </document-link>\
             <document-link url=\"https://example.org/b.pdf\" document-date=\"2024-04-01\"/>",
        );
        let rows = tables.rows(TableId::Documents);
        assert_eq!(cell(&rows[0], "document_date"), "2024-03-01");
        assert_eq!(cell(&rows[1], "document_date"), "2024-04-01");
    }
}
