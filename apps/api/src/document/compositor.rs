//! Document compositor: template in, finished application workbook out.
//!
//! Pipeline per call:
//! 1. load a fresh working copy of the template
//! 2. derive the composite values (residence, full address, execution date)
//! 3. keep the sheets the selection policy asks for and delete the rest
//! 4. write every mapped field on `APPLICATION`
//! 5. embed the applicants' photo on `Notice` (best effort)
//! 6. serialize
//!
//! Every call works on its own copy of the template, so a `Compositor` can be
//! shared across threads without locking.

use std::path::PathBuf;

use bytes::Bytes;
use chrono::{Datelike, Local, NaiveDate};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::document::cell_map::{CellMapError, Field, Side};
use crate::document::policy::{self, SelectionInput, APPLICATION_SHEET, NOTICE_SHEET};
use crate::document::record::{Applicant, ApplicationRecord, PhotoAttachment};
use crate::xlsx::{
    embed_picture, workbook, CellValue, ImageFormat, OneCellAnchor, Package, PackageError,
    Picture, Worksheet,
};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Photo box on the Notice sheet: top-left at T11, 5.73 cm × 3.75 cm.
pub const PHOTO_ANCHOR: OneCellAnchor = OneCellAnchor {
    column: 19,
    row: 10,
    width_emu: 2_062_800,
    height_emu: 1_350_000,
};

const PHOTO_NAME: &str = "Applicant Photo";

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Literals and fallbacks written into the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDefaults {
    /// Province assumed when an applicant leaves it blank.
    pub home_province: String,
    /// `"town, province"` of the issuing office; any other residence is non-local.
    pub home_locality: String,
    pub place_of_execution: String,
    pub groom_sex: String,
    pub bride_sex: String,
    pub country: String,
    pub citizenship: String,
    pub marital_status: String,
}

impl Default for TemplateDefaults {
    fn default() -> Self {
        TemplateDefaults {
            home_province: "Nueva Vizcaya".to_string(),
            home_locality: "Solano, Nueva Vizcaya".to_string(),
            place_of_execution: "Solano, Nueva Vizcaya".to_string(),
            groom_sex: "Male".to_string(),
            bride_sex: "Female".to_string(),
            country: "Philippines".to_string(),
            citizenship: "Filipino".to_string(),
            marital_status: "Single".to_string(),
        }
    }
}

/// A finished `.xlsx` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentBuffer(Bytes);

impl DocumentBuffer {
    #[cfg(test)]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

/// Day, month and year of execution as they are printed on the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionDate {
    pub day: String,
    pub month: String,
    pub year: String,
}

impl From<NaiveDate> for ExecutionDate {
    fn from(date: NaiveDate) -> Self {
        ExecutionDate {
            day: date.day().to_string(),
            month: date.format("%B").to_string(),
            year: date.year().to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("template not found at {}", path.display())]
    TemplateMissing { path: PathBuf },

    #[error("template at {} could not be loaded: {source}", path.display())]
    TemplateLoad {
        path: PathBuf,
        #[source]
        source: PackageError,
    },

    #[error(transparent)]
    CellMap(#[from] CellMapError),

    #[error("document assembly failed: {0}")]
    Package(#[from] PackageError),
}

/// Why a photo was not embedded. Never fatal to generation.
#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("photo file {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported image format '{0}'")]
    UnsupportedFormat(String),

    #[error("photo file {} is not a valid {format:?} image", path.display())]
    Corrupt { path: PathBuf, format: ImageFormat },

    #[error("template has no 'Notice' sheet")]
    NoNoticeSheet,

    #[error("could not read photo: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not embed photo: {0}")]
    Package(#[from] PackageError),
}

// ────────────────────────────────────────────────────────────────────────────
// Compositor
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Compositor {
    template_path: PathBuf,
    defaults: TemplateDefaults,
}

/// Values computed once per applicant before anything is written.
struct Derived {
    residence: String,
    full_address: String,
    include_giver: bool,
}

impl Compositor {
    pub fn new(template_path: impl Into<PathBuf>, defaults: TemplateDefaults) -> Self {
        Compositor {
            template_path: template_path.into(),
            defaults,
        }
    }

    /// Generates the document dated today (local time).
    pub fn generate(&self, record: &ApplicationRecord) -> Result<DocumentBuffer, GenerateError> {
        self.generate_on(record, Local::now().date_naive())
    }

    pub fn generate_on(
        &self,
        record: &ApplicationRecord,
        date: NaiveDate,
    ) -> Result<DocumentBuffer, GenerateError> {
        let mut package = self.load_template()?;

        let groom = self.derive(&record.groom);
        let bride = self.derive(&record.bride);
        let execution = ExecutionDate::from(date);

        let retained = policy::retained_sheets(&SelectionInput {
            groom_age: record.groom.age,
            bride_age: record.bride.age,
            groom_is_local: groom.residence == self.defaults.home_locality,
            bride_is_local: bride.residence == self.defaults.home_locality,
        });
        let removed = workbook::retain_sheets(&mut package, &retained, APPLICATION_SHEET)?;
        info!(retained = ?retained, "selected template sheets");
        debug!(removed = removed.len(), "removed unused sheets");

        let application = workbook::sheet_part(&package, APPLICATION_SHEET)?
            .ok_or_else(|| PackageError::MissingSheet(APPLICATION_SHEET.to_string()))?;
        let mut sheet = Worksheet::open(&package, &application)?;
        let mut written = 0usize;
        for side in Side::BOTH {
            let (applicant, derived) = match side {
                Side::Groom => (&record.groom, &groom),
                Side::Bride => (&record.bride, &bride),
            };
            for field in Field::ALL {
                let Some(value) = self.field_value(field, side, applicant, derived, &execution)
                else {
                    continue;
                };
                sheet.set_value(field.cell(side)?, &value)?;
                written += 1;
            }
        }
        sheet.save(&mut package)?;
        debug!(cells = written, "populated application fields");

        if let Some(photo) = &record.photo {
            match embed_photo(&package, photo) {
                Ok(staged) => package = staged,
                Err(e) => warn!(path = %photo.path.display(), "photo not embedded: {e}"),
            }
        }

        let bytes = package.to_bytes()?;
        info!(
            code = record.application_code.as_deref().unwrap_or("DRAFT"),
            bytes = bytes.len(),
            "generated application document"
        );
        Ok(DocumentBuffer(Bytes::from(bytes)))
    }

    /// Reads the template from disk and checks it is a workbook with an
    /// `APPLICATION` sheet.
    fn load_template(&self) -> Result<Package, GenerateError> {
        let path = &self.template_path;
        let load_error = |source: PackageError| GenerateError::TemplateLoad {
            path: path.clone(),
            source,
        };

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GenerateError::TemplateMissing { path: path.clone() })
            }
            Err(e) => return Err(load_error(e.into())),
        };
        debug!(path = %path.display(), bytes = bytes.len(), "loaded template");

        let package = Package::from_bytes(&bytes).map_err(load_error)?;
        if workbook::sheet_part(&package, APPLICATION_SHEET)
            .map_err(load_error)?
            .is_none()
        {
            return Err(load_error(PackageError::MissingSheet(
                APPLICATION_SHEET.to_string(),
            )));
        }
        Ok(package)
    }

    fn derive(&self, applicant: &Applicant) -> Derived {
        let residence = format!(
            "{}, {}",
            applicant.residence.town,
            or_default(&applicant.residence.province, &self.defaults.home_province)
        );
        // The form's barangay line has always been printed with this prefix.
        let full_address = format!("Brgy. , {}, {}", applicant.residence.barangay, residence);
        let include_giver =
            !applicant.giver.name.is_blank() || (18..=24).contains(&applicant.age);
        Derived {
            residence,
            full_address,
            include_giver,
        }
    }

    /// Value written for `field` on one side, or `None` when the field is
    /// left as the template has it.
    fn field_value(
        &self,
        field: Field,
        side: Side,
        applicant: &Applicant,
        derived: &Derived,
        execution: &ExecutionDate,
    ) -> Option<CellValue> {
        if field.is_giver() && !derived.include_giver {
            return None;
        }

        let defaults = &self.defaults;
        match field {
            Field::FirstName => text(&applicant.name.first.to_uppercase()),
            Field::MiddleName => text(&applicant.name.middle.to_uppercase()),
            Field::LastName => text(&applicant.name.last.to_uppercase()),
            Field::BirthDate => text(&applicant.birth_date),
            Field::Age => Some(CellValue::Number(f64::from(applicant.age))),
            Field::Residence => text(&derived.residence),
            Field::ResidenceCountry | Field::AddressCountry => {
                text(or_default(&applicant.country, &defaults.country))
            }
            Field::Sex => match side {
                Side::Groom => text(&defaults.groom_sex),
                Side::Bride => text(&defaults.bride_sex),
            },
            Field::Citizenship | Field::GiverCitizenship => {
                text(or_default(&applicant.citizenship, &defaults.citizenship))
            }
            Field::FullAddress => text(&derived.full_address),
            Field::Religion => text(&applicant.religion),
            Field::MaritalStatus => {
                text(or_default(&applicant.marital_status, &defaults.marital_status))
            }
            Field::FatherFirst => text(&applicant.father.first),
            Field::FatherMiddle => text(&applicant.father.middle),
            Field::FatherLast => text(&applicant.father.last),
            Field::MotherFirst => text(&applicant.mother.first),
            Field::MotherMiddle => text(&applicant.mother.middle),
            Field::MotherLast => text(&applicant.mother.last),
            Field::GiverFirst => text(&applicant.giver.name.first),
            Field::GiverMiddle => text(&applicant.giver.name.middle),
            Field::GiverLast => text(&applicant.giver.name.last),
            Field::GiverRelationship => text(&applicant.giver.relationship),
            Field::ExecutionDay => text(&execution.day),
            Field::ExecutionMonth => text(&execution.month),
            Field::ExecutionYear => text(&execution.year),
            Field::PlaceOfExecution => text(&defaults.place_of_execution),
        }
    }
}

fn text(value: &str) -> Option<CellValue> {
    Some(CellValue::Text(value.to_string()))
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Embeds the photo on the Notice sheet of a staged copy of `package`.
/// On error the caller's package is untouched.
pub fn embed_photo(package: &Package, photo: &PhotoAttachment) -> Result<Package, PhotoError> {
    if !photo.path.is_file() {
        return Err(PhotoError::NotFound(photo.path.clone()));
    }

    let hint = photo
        .format_hint
        .as_deref()
        .map(str::trim)
        .filter(|hint| !hint.is_empty())
        .or_else(|| photo.path.extension().and_then(|ext| ext.to_str()))
        .unwrap_or("png");
    let format =
        ImageFormat::from_hint(hint).ok_or_else(|| PhotoError::UnsupportedFormat(hint.to_string()))?;

    let data = std::fs::read(&photo.path)?;
    if !format.matches_signature(&data) {
        return Err(PhotoError::Corrupt {
            path: photo.path.clone(),
            format,
        });
    }

    let notice = workbook::sheet_part(package, NOTICE_SHEET)?.ok_or(PhotoError::NoNoticeSheet)?;
    let mut staged = package.clone();
    let media = embed_picture(
        &mut staged,
        &notice,
        &Picture {
            name: PHOTO_NAME,
            data: &data,
            format,
            anchor: PHOTO_ANCHOR,
        },
    )?;
    debug!(media = %media, bytes = data.len(), "embedded photo");
    Ok(staged)
}
