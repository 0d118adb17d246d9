//! IATI 2.03 code lists.
//!
//! Each list is a named static [`CodeList`] used by the CSV validation engine
//! for membership checks. The handful of lists the build engine interprets
//! (rather than passes through as text) also get a typed enum with
//! `from_code`/`to_code`.

// =============================================================================
// Code List Descriptor
// =============================================================================

/// A named set of valid code values.
///
/// Membership is compared by code value, never by display name.
#[derive(Debug, Clone, Copy)]
pub struct CodeList {
    /// Codelist name as published by the standard.
    pub name: &'static str,
    /// Valid code values.
    pub codes: &'static [&'static str],
}

impl CodeList {
    /// Whether `code` is a member of this list.
    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(&code)
    }
}

// =============================================================================
// Code Lists
// =============================================================================

pub static ACTIVITY_STATUS: CodeList = CodeList {
    name: "ActivityStatus",
    codes: &["1", "2", "3", "4", "5", "6"],
};

pub static ACTIVITY_SCOPE: CodeList = CodeList {
    name: "ActivityScope",
    codes: &["1", "2", "3", "4", "5", "6", "7", "8"],
};

pub static ACTIVITY_DATE_TYPE: CodeList = CodeList {
    name: "ActivityDateType",
    codes: &["1", "2", "3", "4"],
};

pub static AID_TYPE: CodeList = CodeList {
    name: "AidType",
    codes: &[
        "A01", "A02", "B01", "B02", "B021", "B022", "B03", "B031", "B032", "B033", "B04", "C01",
        "D01", "D02", "E01", "E02", "F01", "G01", "H01", "H02", "H03", "H04", "H05", "H06",
    ],
};

pub static AID_TYPE_VOCABULARY: CodeList = CodeList {
    name: "AidTypeVocabulary",
    codes: &["1", "2", "3", "4"],
};

pub static BUDGET_STATUS: CodeList = CodeList {
    name: "BudgetStatus",
    codes: &["1", "2"],
};

pub static BUDGET_TYPE: CodeList = CodeList {
    name: "BudgetType",
    codes: &["1", "2"],
};

pub static COLLABORATION_TYPE: CodeList = CodeList {
    name: "CollaborationType",
    codes: &["1", "2", "3", "4", "6", "7", "8"],
};

pub static CONDITION_TYPE: CodeList = CodeList {
    name: "ConditionType",
    codes: &["1", "2", "3"],
};

pub static CONTACT_TYPE: CodeList = CodeList {
    name: "ContactType",
    codes: &["1", "2", "3", "4"],
};

pub static DISBURSEMENT_CHANNEL: CodeList = CodeList {
    name: "DisbursementChannel",
    codes: &["1", "2", "3", "4"],
};

pub static DOCUMENT_CATEGORY: CodeList = CodeList {
    name: "DocumentCategory",
    codes: &[
        "A01", "A02", "A03", "A04", "A05", "A06", "A07", "A08", "A09", "A10", "A11", "A12", "B01",
        "B02", "B03", "B04", "B05", "B06", "B07", "B08", "B09", "B10", "B11", "B12", "B13", "B14",
        "B15", "B16", "B17", "B18",
    ],
};

pub static FINANCE_TYPE: CodeList = CodeList {
    name: "FinanceType",
    codes: &[
        "110", "1100", "210", "310", "311", "4", "421", "422", "423", "424", "425", "431", "432",
        "433", "510", "520", "530", "610", "611", "612", "613", "614", "615", "616", "617", "618",
        "620", "621", "622", "623", "624", "625", "626", "627", "630", "631", "632", "633", "634",
        "635", "636", "637", "638", "639",
    ],
};

pub static FLOW_TYPE: CodeList = CodeList {
    name: "FlowType",
    codes: &["10", "21", "22", "30", "36", "37", "40", "50"],
};

pub static GEOGRAPHICAL_PRECISION: CodeList = CodeList {
    name: "GeographicalPrecision",
    codes: &["1", "2", "3", "4", "5", "6", "7", "8", "9"],
};

pub static INDICATOR_MEASURE: CodeList = CodeList {
    name: "IndicatorMeasure",
    codes: &["1", "2", "3", "4", "5"],
};

pub static LOCATION_REACH: CodeList = CodeList {
    name: "LocationReach",
    codes: &["1", "2"],
};

pub static LOCATION_ID_VOCABULARY: CodeList = CodeList {
    name: "GeographicVocabulary",
    codes: &["A1", "A2", "A3", "A4", "G1", "G2"],
};

pub static ORGANISATION_ROLE: CodeList = CodeList {
    name: "OrganisationRole",
    codes: &["1", "2", "3", "4"],
};

pub static ORGANISATION_TYPE: CodeList = CodeList {
    name: "OrganisationType",
    codes: &[
        "10", "11", "15", "21", "22", "23", "24", "30", "40", "60", "70", "71", "72", "73", "80",
        "90",
    ],
};

pub static RELATED_ACTIVITY_TYPE: CodeList = CodeList {
    name: "RelatedActivityType",
    codes: &["1", "2", "3", "4", "5"],
};

pub static RESULT_TYPE: CodeList = CodeList {
    name: "ResultType",
    codes: &["1", "2", "3", "9"],
};

pub static SECTOR_VOCABULARY: CodeList = CodeList {
    name: "SectorVocabulary",
    codes: &["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "98", "99"],
};

pub static TIED_STATUS: CodeList = CodeList {
    name: "TiedStatus",
    codes: &["3", "4", "5"],
};

pub static TRANSACTION_TYPE: CodeList = CodeList {
    name: "TransactionType",
    codes: &["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13"],
};

/// DAC CRS channel codes, top two levels of the hierarchy.
///
/// The full published list also carries per-organisation entries under these;
/// category-level validation is what the conversion needs.
pub static CRS_CHANNEL_CODES: CodeList = CodeList {
    name: "CRSChannelCode",
    codes: &[
        "10000", "11000", "11001", "11002", "11003", "11004", "12000", "12001", "12002", "12003",
        "12004", "13000", "20000", "21000", "21500", "22000", "23000", "30000", "31000", "32000",
        "40000", "41000", "42000", "43000", "44000", "45000", "46000", "46002", "46003", "46004",
        "46005", "46012", "47000", "50000", "51000", "60000", "61000", "62000", "63000", "90000",
    ],
};

// =============================================================================
// Activity Date Type
// =============================================================================

/// The four activity-date kinds of the standard.
///
/// These map onto the inline date columns of the activities table; the build
/// engine rejects rows carrying any other code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityDateType {
    /// Planned start (1).
    PlannedStart,
    /// Actual start (2).
    ActualStart,
    /// Planned end (3).
    PlannedEnd,
    /// Actual end (4).
    ActualEnd,
}

impl ActivityDateType {
    /// All four kinds, in code order.
    pub const ALL: [ActivityDateType; 4] = [
        ActivityDateType::PlannedStart,
        ActivityDateType::ActualStart,
        ActivityDateType::PlannedEnd,
        ActivityDateType::ActualEnd,
    ];

    /// Parse from the standard's code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(Self::PlannedStart),
            "2" => Some(Self::ActualStart),
            "3" => Some(Self::PlannedEnd),
            "4" => Some(Self::ActualEnd),
            _ => None,
        }
    }

    /// Convert to the standard's code string.
    pub fn to_code(&self) -> &'static str {
        match self {
            Self::PlannedStart => "1",
            Self::ActualStart => "2",
            Self::PlannedEnd => "3",
            Self::ActualEnd => "4",
        }
    }

    /// The activities-table column this date kind occupies when inlined.
    pub fn main_column(&self) -> &'static str {
        match self {
            Self::PlannedStart => "planned_start_date",
            Self::ActualStart => "actual_start_date",
            Self::PlannedEnd => "planned_end_date",
            Self::ActualEnd => "actual_end_date",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_membership() {
        assert!(ACTIVITY_STATUS.contains("2"));
        assert!(!ACTIVITY_STATUS.contains("99"));
        assert!(SECTOR_VOCABULARY.contains("98"));
        assert!(FINANCE_TYPE.contains("110"));
        assert!(!FINANCE_TYPE.contains("1"));
        assert!(CRS_CHANNEL_CODES.contains("10000"));
        assert!(!CRS_CHANNEL_CODES.contains("XXXXX"));
    }

    #[test]
    fn test_activity_date_type_round_trip() {
        for code in ACTIVITY_DATE_TYPE.codes {
            let parsed = ActivityDateType::from_code(code).unwrap();
            assert_eq!(parsed.to_code(), *code);
        }
        assert!(ActivityDateType::from_code("5").is_none());
        assert!(ActivityDateType::from_code("").is_none());
    }

    #[test]
    fn test_date_type_main_columns() {
        assert_eq!(
            ActivityDateType::PlannedStart.main_column(),
            "planned_start_date"
        );
        assert_eq!(ActivityDateType::ActualEnd.main_column(), "actual_end_date");
    }
}
