//! XML serialization of the activity tree.
//!
//! Writes an [`IatiActivities`] document with [quick_xml], two-space indented,
//! in the element order the standard prescribes. The writer is the inverse of
//! [`crate::extract`]: everything the extractor reads is serialized, empty
//! attributes and empty optional elements are omitted, and raw monetary text
//! is emitted verbatim.

use std::io::{Cursor, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::XmlResult;
use crate::models::{
    tri_state_to_cell, Activity, ActivityDate, Budget, Condition, ContactInfo, CountryBudgetItems,
    DocumentLink, IatiActivities, Indicator, IndicatorPeriod, Location, Narrative,
    ParticipatingOrg, Result as ActivityResult, SectorRef, Transaction,
};

// =============================================================================
// Entry Point
// =============================================================================

/// Serialize a whole document to a string, with declaration and trailing
/// newline.
pub fn to_xml_string(document: &IatiActivities) -> XmlResult<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    document.write_xml(&mut writer)?;
    let mut bytes = writer.into_inner().into_inner();
    bytes.push(b'\n');
    Ok(String::from_utf8(bytes)?)
}

/// Serialization into a [quick_xml] event stream.
pub trait ToXml<W: Write> {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()>;
}

// =============================================================================
// Event Helpers
// =============================================================================

/// Start tag; attributes with empty values are dropped.
fn write_start<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    attrs: &[(&str, &str)],
) -> XmlResult<()> {
    writer.write_event(Event::Start(element(tag, attrs)))?;
    Ok(())
}

fn write_end<W: Write>(writer: &mut Writer<W>, tag: &str) -> XmlResult<()> {
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Self-closing tag; attributes with empty values are dropped.
fn write_empty<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    attrs: &[(&str, &str)],
) -> XmlResult<()> {
    writer.write_event(Event::Empty(element(tag, attrs)))?;
    Ok(())
}

/// Element wrapping character data.
fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    attrs: &[(&str, &str)],
    text: &str,
) -> XmlResult<()> {
    write_start(writer, tag, attrs)?;
    if !text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    write_end(writer, tag)
}

/// `<tag code="…"/>`, skipped entirely when the code is empty.
fn write_coded<W: Write>(writer: &mut Writer<W>, tag: &str, code: &str) -> XmlResult<()> {
    if code.is_empty() {
        return Ok(());
    }
    write_empty(writer, tag, &[("code", code)])
}

/// `<tag iso-date="…"/>`, skipped entirely when the date is empty.
fn write_dated<W: Write>(writer: &mut Writer<W>, tag: &str, iso_date: &str) -> XmlResult<()> {
    if iso_date.is_empty() {
        return Ok(());
    }
    write_empty(writer, tag, &[("iso-date", iso_date)])
}

fn write_narratives<W: Write>(writer: &mut Writer<W>, narratives: &[Narrative]) -> XmlResult<()> {
    for narrative in narratives {
        let lang = narrative.lang.as_deref().unwrap_or("");
        write_text_element(writer, "narrative", &[("xml:lang", lang)], &narrative.text)?;
    }
    Ok(())
}

/// Wrapper element holding narratives. Empty narratives collapse to a
/// self-closing tag.
fn write_narrative_block<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    attrs: &[(&str, &str)],
    narratives: &[Narrative],
) -> XmlResult<()> {
    if narratives.is_empty() {
        return write_empty(writer, tag, attrs);
    }
    write_start(writer, tag, attrs)?;
    write_narratives(writer, narratives)?;
    write_end(writer, tag)
}

fn element<'a>(tag: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(tag);
    for (name, value) in attrs {
        if !value.is_empty() {
            start.push_attribute((*name, *value));
        }
    }
    start
}

// =============================================================================
// Document Root
// =============================================================================

impl<W: Write> ToXml<W> for IatiActivities {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        write_start(
            writer,
            "iati-activities",
            &[
                ("version", &self.version),
                ("generated-datetime", &self.generated_datetime),
                ("linked-data-default", &self.linked_data_default),
            ],
        )?;
        for activity in &self.activities {
            activity.write_xml(writer)?;
        }
        write_end(writer, "iati-activities")
    }
}

// =============================================================================
// Activity
// =============================================================================

impl<W: Write> ToXml<W> for Activity {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        let last_updated = if self.last_updated_datetime.is_empty() {
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
        } else {
            self.last_updated_datetime.clone()
        };
        write_start(
            writer,
            "iati-activity",
            &[
                ("default-currency", &self.default_currency),
                ("hierarchy", self.hierarchy.as_deref().unwrap_or("")),
                ("last-updated-datetime", &last_updated),
                ("xml:lang", &self.xml_lang),
                ("humanitarian", tri_state_to_cell(self.humanitarian)),
            ],
        )?;

        write_text_element(writer, "iati-identifier", &[], &self.iati_identifier)?;

        write_narrative_block(
            writer,
            "reporting-org",
            &[
                ("ref", &self.reporting_org.reference),
                ("type", &self.reporting_org.org_type),
                ("role", &self.reporting_org_role),
                (
                    "secondary-reporter",
                    tri_state_to_cell(self.reporting_org.secondary_reporter),
                ),
            ],
            &self.reporting_org.narratives,
        )?;

        write_narrative_block(writer, "title", &[], &self.title)?;

        for description in &self.descriptions {
            write_narrative_block(
                writer,
                "description",
                &[("type", &description.description_type)],
                &description.narratives,
            )?;
        }

        for org in &self.participating_orgs {
            org.write_xml(writer)?;
        }

        if let Some(status) = &self.activity_status {
            write_coded(writer, "activity-status", status)?;
        }

        for date in &self.activity_dates {
            date.write_xml(writer)?;
        }

        if let Some(contact) = &self.contact_info {
            contact.write_xml(writer)?;
        }

        if let Some(scope) = &self.activity_scope {
            write_coded(writer, "activity-scope", scope)?;
        }

        for country in &self.recipient_countries {
            write_narrative_block(
                writer,
                "recipient-country",
                &[("code", &country.code), ("percentage", &country.percentage)],
                &country.narratives,
            )?;
        }
        for region in &self.recipient_regions {
            write_narrative_block(
                writer,
                "recipient-region",
                &[("code", &region.code), ("percentage", &region.percentage)],
                &region.narratives,
            )?;
        }

        for location in &self.locations {
            location.write_xml(writer)?;
        }

        for sector in &self.sectors {
            sector.write_xml(writer)?;
        }

        for group in &self.country_budget_items {
            group.write_xml(writer)?;
        }

        if let Some(collaboration) = &self.collaboration_type {
            write_coded(writer, "collaboration-type", collaboration)?;
        }
        if let Some(flow) = &self.default_flow_type {
            write_coded(writer, "default-flow-type", flow)?;
        }
        if let Some(finance) = &self.default_finance_type {
            write_coded(writer, "default-finance-type", finance)?;
        }
        if let Some(aid) = &self.default_aid_type {
            write_empty(
                writer,
                "default-aid-type",
                &[
                    ("code", aid),
                    (
                        "vocabulary",
                        self.default_aid_type_vocabulary.as_deref().unwrap_or(""),
                    ),
                ],
            )?;
        }
        if let Some(tied) = &self.default_tied_status {
            write_coded(writer, "default-tied-status", tied)?;
        }

        for budget in &self.budgets {
            budget.write_xml(writer)?;
        }
        for transaction in &self.transactions {
            transaction.write_xml(writer)?;
        }
        for document in &self.document_links {
            document.write_xml(writer)?;
        }

        for related in &self.related_activities {
            write_empty(
                writer,
                "related-activity",
                &[("ref", &related.reference), ("type", &related.activity_type)],
            )?;
        }

        if self.conditions_attached.is_some() || !self.conditions.is_empty() {
            write_start(
                writer,
                "conditions",
                &[("attached", self.conditions_attached.as_deref().unwrap_or(""))],
            )?;
            for condition in &self.conditions {
                condition.write_xml(writer)?;
            }
            write_end(writer, "conditions")?;
        }

        for result in &self.results {
            result.write_xml(writer)?;
        }

        write_end(writer, "iati-activity")
    }
}

// =============================================================================
// Children
// =============================================================================

impl<W: Write> ToXml<W> for ParticipatingOrg {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        write_narrative_block(
            writer,
            "participating-org",
            &[
                ("role", &self.role),
                ("ref", &self.reference),
                ("type", &self.org_type),
                ("activity-id", &self.activity_id),
                ("crs-channel-code", &self.crs_channel_code),
            ],
            &self.narratives,
        )
    }
}

impl<W: Write> ToXml<W> for ActivityDate {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        write_narrative_block(
            writer,
            "activity-date",
            &[("type", &self.date_type), ("iso-date", &self.iso_date)],
            &self.narratives,
        )
    }
}

impl<W: Write> ToXml<W> for ContactInfo {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        write_start(writer, "contact-info", &[("type", &self.contact_type)])?;
        if !self.organisation.is_empty() {
            write_narrative_block(writer, "organisation", &[], &self.organisation)?;
        }
        if !self.department.is_empty() {
            write_narrative_block(writer, "department", &[], &self.department)?;
        }
        if let Some(person_name) = &self.person_name {
            write_narrative_block(writer, "person-name", &[], person_name)?;
        }
        if !self.job_title.is_empty() {
            write_narrative_block(writer, "job-title", &[], &self.job_title)?;
        }
        if !self.telephone.is_empty() {
            write_text_element(writer, "telephone", &[], &self.telephone)?;
        }
        if let Some(email) = &self.email {
            write_text_element(writer, "email", &[], email)?;
        }
        if !self.website.is_empty() {
            write_text_element(writer, "website", &[], &self.website)?;
        }
        if !self.mailing_address.is_empty() {
            write_narrative_block(writer, "mailing-address", &[], &self.mailing_address)?;
        }
        write_end(writer, "contact-info")
    }
}

impl<W: Write> ToXml<W> for Location {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        write_start(writer, "location", &[("ref", &self.reference)])?;
        write_coded(writer, "location-reach", &self.location_reach)?;
        if let Some(location_id) = &self.location_id {
            write_empty(
                writer,
                "location-id",
                &[
                    ("vocabulary", &location_id.vocabulary),
                    ("code", &location_id.code),
                ],
            )?;
        }
        if !self.name.is_empty() {
            write_narrative_block(writer, "name", &[], &self.name)?;
        }
        if !self.description.is_empty() {
            write_narrative_block(writer, "description", &[], &self.description)?;
        }
        if !self.activity_description.is_empty() {
            write_narrative_block(writer, "activity-description", &[], &self.activity_description)?;
        }
        for admin in &self.administrative {
            write_empty(
                writer,
                "administrative",
                &[
                    ("vocabulary", &admin.vocabulary),
                    ("level", &admin.level),
                    ("code", &admin.code),
                    ("country", &admin.country),
                ],
            )?;
        }
        if let Some(point) = &self.point {
            write_start(writer, "point", &[("srsName", &point.srs_name)])?;
            let pos = format!("{} {}", point.latitude, point.longitude);
            write_text_element(writer, "pos", &[], &pos)?;
            write_end(writer, "point")?;
        }
        write_coded(writer, "exactness", &self.exactness)?;
        write_coded(writer, "location-class", &self.location_class)?;
        write_coded(writer, "feature-designation", &self.feature_designation)?;
        write_end(writer, "location")
    }
}

impl<W: Write> ToXml<W> for SectorRef {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        write_narrative_block(
            writer,
            "sector",
            &[
                ("code", &self.code),
                ("vocabulary", &self.vocabulary),
                ("vocabulary-uri", &self.vocabulary_uri),
                ("percentage", &self.percentage),
            ],
            &self.narratives,
        )
    }
}

impl<W: Write> ToXml<W> for CountryBudgetItems {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        write_start(
            writer,
            "country-budget-items",
            &[("vocabulary", &self.vocabulary)],
        )?;
        for item in &self.items {
            let attrs = [("code", item.code.as_str()), ("percentage", item.percentage.as_str())];
            if item.description.is_empty() {
                write_empty(writer, "budget-item", &attrs)?;
            } else {
                write_start(writer, "budget-item", &attrs)?;
                write_narrative_block(writer, "description", &[], &item.description)?;
                write_end(writer, "budget-item")?;
            }
        }
        write_end(writer, "country-budget-items")
    }
}

impl<W: Write> ToXml<W> for Budget {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        write_start(
            writer,
            "budget",
            &[("type", &self.budget_type), ("status", &self.status)],
        )?;
        write_dated(writer, "period-start", &self.period_start)?;
        write_dated(writer, "period-end", &self.period_end)?;
        write_text_element(
            writer,
            "value",
            &[("currency", &self.currency), ("value-date", &self.value_date)],
            &self.value,
        )?;
        write_end(writer, "budget")
    }
}

impl<W: Write> ToXml<W> for Transaction {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        write_start(
            writer,
            "transaction",
            &[
                ("ref", &self.reference),
                ("humanitarian", tri_state_to_cell(self.humanitarian)),
            ],
        )?;
        write_coded(writer, "transaction-type", &self.transaction_type)?;
        write_dated(writer, "transaction-date", &self.date)?;
        write_text_element(
            writer,
            "value",
            &[("currency", &self.currency), ("value-date", &self.value_date)],
            &self.value,
        )?;
        if !self.description.is_empty() {
            write_narrative_block(writer, "description", &[], &self.description)?;
        }
        if let Some(provider) = &self.provider_org {
            write_narrative_block(
                writer,
                "provider-org",
                &[("ref", &provider.reference), ("type", &provider.org_type)],
                &provider.narratives,
            )?;
        }
        if let Some(receiver) = &self.receiver_org {
            write_narrative_block(
                writer,
                "receiver-org",
                &[
                    ("ref", &receiver.reference),
                    ("type", &receiver.org_type),
                    ("receiver-activity-id", &self.receiver_activity_id),
                ],
                &receiver.narratives,
            )?;
        }
        write_coded(writer, "disbursement-channel", &self.disbursement_channel)?;
        for sector in &self.sectors {
            sector.write_xml(writer)?;
        }
        write_coded(writer, "recipient-region", &self.recipient_region)?;
        write_coded(writer, "flow-type", &self.flow_type)?;
        write_coded(writer, "finance-type", &self.finance_type)?;
        if let Some(aid_type) = &self.aid_type {
            write_empty(
                writer,
                "aid-type",
                &[("code", &aid_type.code), ("vocabulary", &aid_type.vocabulary)],
            )?;
        }
        write_coded(writer, "tied-status", &self.tied_status)?;
        write_end(writer, "transaction")
    }
}

impl<W: Write> ToXml<W> for DocumentLink {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        write_start(
            writer,
            "document-link",
            &[("url", &self.url), ("format", &self.format)],
        )?;
        write_narrative_block(writer, "title", &[], &self.title)?;
        if !self.description.is_empty() {
            write_narrative_block(writer, "description", &[], &self.description)?;
        }
        write_coded(writer, "category", &self.category_code)?;
        write_coded(writer, "language", &self.language_code)?;
        write_dated(writer, "document-date", &self.document_date)?;
        write_end(writer, "document-link")
    }
}

impl<W: Write> ToXml<W> for Condition {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        write_start(writer, "condition", &[("type", &self.condition_type)])?;
        write_text_element(writer, "narrative", &[], &self.text)?;
        write_end(writer, "condition")
    }
}

// =============================================================================
// Results
// =============================================================================

impl<W: Write> ToXml<W> for ActivityResult {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        write_start(
            writer,
            "result",
            &[
                ("type", &self.result_type),
                ("aggregation-status", tri_state_to_cell(self.aggregation_status)),
            ],
        )?;
        if !self.title.is_empty() {
            write_narrative_block(writer, "title", &[], &self.title)?;
        }
        if !self.description.is_empty() {
            write_narrative_block(writer, "description", &[], &self.description)?;
        }
        for indicator in &self.indicators {
            indicator.write_xml(writer)?;
        }
        write_end(writer, "result")
    }
}

impl<W: Write> ToXml<W> for Indicator {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        write_start(
            writer,
            "indicator",
            &[
                ("measure", &self.measure),
                ("ascending", tri_state_to_cell(self.ascending)),
                ("aggregation-status", tri_state_to_cell(self.aggregation_status)),
            ],
        )?;
        if !self.title.is_empty() {
            write_narrative_block(writer, "title", &[], &self.title)?;
        }
        if !self.description.is_empty() {
            write_narrative_block(writer, "description", &[], &self.description)?;
        }
        if let Some(baseline) = &self.baseline {
            let year = baseline.year.to_string();
            let attrs = [
                ("year", year.as_str()),
                ("iso-date", baseline.iso_date.as_str()),
                ("value", baseline.value.as_str()),
            ];
            if baseline.comment.is_empty() {
                write_empty(writer, "baseline", &attrs)?;
            } else {
                write_start(writer, "baseline", &attrs)?;
                write_narrative_block(writer, "comment", &[], &baseline.comment)?;
                write_end(writer, "baseline")?;
            }
        }
        for period in &self.periods {
            period.write_xml(writer)?;
        }
        write_end(writer, "indicator")
    }
}

impl<W: Write> ToXml<W> for IndicatorPeriod {
    fn write_xml(&self, writer: &mut Writer<W>) -> XmlResult<()> {
        write_start(writer, "period", &[])?;
        write_dated(writer, "period-start", &self.period_start)?;
        write_dated(writer, "period-end", &self.period_end)?;
        for (tag, measure) in [("target", &self.target), ("actual", &self.actual)] {
            if let Some(measure) = measure {
                let attrs = [("value", measure.value.as_str())];
                if measure.comment.is_empty() {
                    write_empty(writer, tag, &attrs)?;
                } else {
                    write_start(writer, tag, &attrs)?;
                    write_narrative_block(writer, "comment", &[], &measure.comment)?;
                    write_end(writer, tag)?;
                }
            }
        }
        write_end(writer, "period")
    }
}

// =============================================================================
// Tests
// =============================================================================
