//! Application record: the structured input of the compositor, and the flat
//! JSON shape the portal front-end posts.
//!
//! The front-end sends every field as an optional string keyed `g*` (groom) or
//! `b*` (bride). Nothing is rejected for being incomplete: missing or `null`
//! fields become empty strings, ages become 0 unless they parse.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

// ────────────────────────────────────────────────────────────────────────────
// Domain record
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonName {
    pub first: String,
    pub middle: String,
    pub last: String,
}

impl PersonName {
    pub fn is_blank(&self) -> bool {
        [&self.first, &self.middle, &self.last]
            .iter()
            .all(|part| part.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Residence {
    pub province: String,
    pub town: String,
    pub barangay: String,
}

/// The parent or guardian giving consent or advice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Giver {
    pub name: PersonName,
    pub relationship: String,
}

/// One side of the application. Empty `country`, `citizenship` and
/// `marital_status` fall back to the template defaults when written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applicant {
    pub name: PersonName,
    /// Written verbatim; the portal already formats it.
    pub birth_date: String,
    pub age: u32,
    pub residence: Residence,
    pub country: String,
    pub citizenship: String,
    pub religion: String,
    pub marital_status: String,
    pub father: PersonName,
    /// Maiden name.
    pub mother: PersonName,
    pub giver: Giver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoAttachment {
    pub path: PathBuf,
    /// Declared format (`jpg`, `jpeg`, `png`, `gif`). Falls back to the file
    /// extension when absent.
    pub format_hint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationRecord {
    pub groom: Applicant,
    pub bride: Applicant,
    pub photo: Option<PhotoAttachment>,
    pub application_code: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Wire shape
// ────────────────────────────────────────────────────────────────────────────

/// Flat request body of `POST /api/generate-excel`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApplicationPayload {
    pub g_first: Option<String>,
    pub g_middle: Option<String>,
    pub g_last: Option<String>,
    pub g_bday: Option<String>,
    #[serde(deserialize_with = "lenient_age")]
    pub g_age: u32,
    pub g_town: Option<String>,
    pub g_prov: Option<String>,
    pub g_brgy: Option<String>,
    pub g_country: Option<String>,
    pub g_citizen: Option<String>,
    pub g_religion: Option<String>,
    pub g_status: Option<String>,
    pub g_fath_f: Option<String>,
    pub g_fath_m: Option<String>,
    pub g_fath_l: Option<String>,
    pub g_moth_f: Option<String>,
    pub g_moth_m: Option<String>,
    pub g_moth_l: Option<String>,
    pub g_giver_f: Option<String>,
    pub g_giver_m: Option<String>,
    pub g_giver_l: Option<String>,
    pub g_giver_relation: Option<String>,

    pub b_first: Option<String>,
    pub b_middle: Option<String>,
    pub b_last: Option<String>,
    pub b_bday: Option<String>,
    #[serde(deserialize_with = "lenient_age")]
    pub b_age: u32,
    pub b_town: Option<String>,
    pub b_prov: Option<String>,
    pub b_brgy: Option<String>,
    pub b_country: Option<String>,
    pub b_citizen: Option<String>,
    pub b_religion: Option<String>,
    pub b_status: Option<String>,
    pub b_fath_f: Option<String>,
    pub b_fath_m: Option<String>,
    pub b_fath_l: Option<String>,
    pub b_moth_f: Option<String>,
    pub b_moth_m: Option<String>,
    pub b_moth_l: Option<String>,
    pub b_giver_f: Option<String>,
    pub b_giver_m: Option<String>,
    pub b_giver_l: Option<String>,
    pub b_giver_relation: Option<String>,

    pub application_code: Option<String>,
    pub image_extension: Option<String>,
    pub photo_file: Option<String>,
}

/// Accepts a number or a numeric string. Fractional numbers are truncated
/// toward zero; anything else, including negatives, reads as 0.
fn lenient_age<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let age = match value {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|n| n.is_finite() && *n >= 0.0)
                    .map(|n| n.trunc() as u64)
            })
            .unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    };
    Ok(u32::try_from(age).unwrap_or(u32::MAX))
}

fn text(value: Option<String>) -> String {
    value.unwrap_or_default()
}

impl From<ApplicationPayload> for ApplicationRecord {
    fn from(p: ApplicationPayload) -> Self {
        let groom = Applicant {
            name: PersonName {
                first: text(p.g_first),
                middle: text(p.g_middle),
                last: text(p.g_last),
            },
            birth_date: text(p.g_bday),
            age: p.g_age,
            residence: Residence {
                province: text(p.g_prov),
                town: text(p.g_town),
                barangay: text(p.g_brgy),
            },
            country: text(p.g_country),
            citizenship: text(p.g_citizen),
            religion: text(p.g_religion),
            marital_status: text(p.g_status),
            father: PersonName {
                first: text(p.g_fath_f),
                middle: text(p.g_fath_m),
                last: text(p.g_fath_l),
            },
            mother: PersonName {
                first: text(p.g_moth_f),
                middle: text(p.g_moth_m),
                last: text(p.g_moth_l),
            },
            giver: Giver {
                name: PersonName {
                    first: text(p.g_giver_f),
                    middle: text(p.g_giver_m),
                    last: text(p.g_giver_l),
                },
                relationship: text(p.g_giver_relation),
            },
        };

        let bride = Applicant {
            name: PersonName {
                first: text(p.b_first),
                middle: text(p.b_middle),
                last: text(p.b_last),
            },
            birth_date: text(p.b_bday),
            age: p.b_age,
            residence: Residence {
                province: text(p.b_prov),
                town: text(p.b_town),
                barangay: text(p.b_brgy),
            },
            country: text(p.b_country),
            citizenship: text(p.b_citizen),
            religion: text(p.b_religion),
            marital_status: text(p.b_status),
            father: PersonName {
                first: text(p.b_fath_f),
                middle: text(p.b_fath_m),
                last: text(p.b_fath_l),
            },
            mother: PersonName {
                first: text(p.b_moth_f),
                middle: text(p.b_moth_m),
                last: text(p.b_moth_l),
            },
            giver: Giver {
                name: PersonName {
                    first: text(p.b_giver_f),
                    middle: text(p.b_giver_m),
                    last: text(p.b_giver_l),
                },
                relationship: text(p.b_giver_relation),
            },
        };

        let application_code = p
            .application_code
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty());

        ApplicationRecord {
            groom,
            bride,
            photo: None,
            application_code,
        }
    }
}
