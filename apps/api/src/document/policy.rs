//! Which template sheets survive into a generated document.
//!
//! Two independent axes decide it: the applicants' age bands select at most
//! one consent/advice clause sheet, and a residence outside the home locality
//! pulls in the address sheets used for mailing the notice.

pub const APPLICATION_SHEET: &str = "APPLICATION";
pub const NOTICE_SHEET: &str = "Notice";

/// Always kept, in this order.
pub const BASE_SHEETS: [&str; 2] = [APPLICATION_SHEET, NOTICE_SHEET];

/// Kept when either applicant lives outside the home locality.
pub const LOCALITY_SHEETS: [&str; 2] = ["AddressBACKnotice", "EnvelopeAddress"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBand {
    /// Under 18; no clause applies.
    Minor,
    /// 18 to 20: parental consent required.
    Consent,
    /// 21 to 24: parental advice required.
    Advice,
    Adult,
}

impl AgeBand {
    pub fn of(age: u32) -> Self {
        match age {
            0..=17 => AgeBand::Minor,
            18..=20 => AgeBand::Consent,
            21..=24 => AgeBand::Advice,
            25..=u32::MAX => AgeBand::Adult,
        }
    }
}

/// `(bride band, groom band, clause sheet)`. First match wins; the rows are
/// mutually exclusive so order only matters for readability.
pub const CLAUSE_TABLE: [(AgeBand, AgeBand, &str); 8] = [
    (AgeBand::Consent, AgeBand::Adult, "CONSENT F"),
    (AgeBand::Adult, AgeBand::Consent, "CONSENT M"),
    (AgeBand::Consent, AgeBand::Consent, "CONSENT M&F"),
    (AgeBand::Advice, AgeBand::Adult, "ADVICE F"),
    (AgeBand::Adult, AgeBand::Advice, "ADVICE M"),
    (AgeBand::Advice, AgeBand::Advice, "ADVICE M&F"),
    (AgeBand::Consent, AgeBand::Advice, "ADVICE M-CONSENT F"),
    (AgeBand::Advice, AgeBand::Consent, "ADVICE F-CONSENT M"),
];

pub fn legal_clause_sheet(groom_age: u32, bride_age: u32) -> Option<&'static str> {
    let groom = AgeBand::of(groom_age);
    let bride = AgeBand::of(bride_age);
    CLAUSE_TABLE
        .iter()
        .find(|(b, g, _)| *b == bride && *g == groom)
        .map(|(_, _, sheet)| *sheet)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionInput {
    pub groom_age: u32,
    pub bride_age: u32,
    pub groom_is_local: bool,
    pub bride_is_local: bool,
}

/// Names of the sheets to keep: the base sheets, the clause sheet if any, and
/// the locality sheets when either applicant is non-local.
pub fn retained_sheets(input: &SelectionInput) -> Vec<&'static str> {
    let mut sheets = BASE_SHEETS.to_vec();
    if let Some(clause) = legal_clause_sheet(input.groom_age, input.bride_age) {
        sheets.push(clause);
    }
    if !(input.groom_is_local && input.bride_is_local) {
        sheets.extend(LOCALITY_SHEETS);
    }
    sheets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(groom_age: u32, bride_age: u32) -> SelectionInput {
        SelectionInput {
            groom_age,
            bride_age,
            groom_is_local: true,
            bride_is_local: true,
        }
    }

    #[test]
    fn test_age_band_edges() {
        assert_eq!(AgeBand::of(0), AgeBand::Minor);
        assert_eq!(AgeBand::of(17), AgeBand::Minor);
        assert_eq!(AgeBand::of(18), AgeBand::Consent);
        assert_eq!(AgeBand::of(20), AgeBand::Consent);
        assert_eq!(AgeBand::of(21), AgeBand::Advice);
        assert_eq!(AgeBand::of(24), AgeBand::Advice);
        assert_eq!(AgeBand::of(25), AgeBand::Adult);
        assert_eq!(AgeBand::of(u32::MAX), AgeBand::Adult);
    }

    #[test]
    fn test_young_bride_adult_groom_keeps_consent_f_only() {
        assert_eq!(
            retained_sheets(&local(30, 19)),
            vec!["APPLICATION", "Notice", "CONSENT F"]
        );
    }

    #[test]
    fn test_each_band_pair_selects_its_sheet() {
        let cases = [
            (30, 19, "CONSENT F"),
            (19, 30, "CONSENT M"),
            (20, 18, "CONSENT M&F"),
            (25, 22, "ADVICE F"),
            (23, 40, "ADVICE M"),
            (21, 24, "ADVICE M&F"),
            (22, 19, "ADVICE M-CONSENT F"),
            (18, 24, "ADVICE F-CONSENT M"),
        ];
        for (groom, bride, sheet) in cases {
            assert_eq!(
                legal_clause_sheet(groom, bride),
                Some(sheet),
                "groom {groom}, bride {bride}"
            );
        }
    }

    #[test]
    fn test_adults_and_minors_get_no_clause() {
        assert_eq!(legal_clause_sheet(25, 25), None);
        assert_eq!(legal_clause_sheet(60, 31), None);
        assert_eq!(legal_clause_sheet(17, 16), None);
        assert_eq!(legal_clause_sheet(0, 0), None);
        // A minor paired with anyone matches no row either.
        assert_eq!(legal_clause_sheet(17, 19), None);
        assert_eq!(legal_clause_sheet(30, 12), None);
        assert_eq!(retained_sheets(&local(40, 40)), vec!["APPLICATION", "Notice"]);
    }

    #[test]
    fn test_at_most_one_clause_sheet_for_any_ages() {
        for groom in 0..40 {
            for bride in 0..40 {
                let sheets = retained_sheets(&local(groom, bride));
                let clauses = sheets
                    .iter()
                    .filter(|s| CLAUSE_TABLE.iter().any(|(_, _, c)| *c == **s))
                    .count();
                assert!(clauses <= 1, "groom {groom}, bride {bride}: {sheets:?}");
            }
        }
    }

    #[test]
    fn test_non_local_applicant_adds_address_sheets() {
        let input = SelectionInput {
            groom_is_local: false,
            ..local(30, 30)
        };
        assert_eq!(
            retained_sheets(&input),
            vec!["APPLICATION", "Notice", "AddressBACKnotice", "EnvelopeAddress"]
        );

        let input = SelectionInput {
            bride_is_local: false,
            ..local(30, 19)
        };
        assert_eq!(
            retained_sheets(&input),
            vec![
                "APPLICATION",
                "Notice",
                "CONSENT F",
                "AddressBACKnotice",
                "EnvelopeAddress"
            ]
        );
    }
}
