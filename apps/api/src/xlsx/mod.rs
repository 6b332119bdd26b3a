// OOXML spreadsheet package plumbing.
// Works directly on the zip parts of an existing workbook so that everything the
// template author put in the file (styles, merged cells, print setup, boilerplate
// text) survives untouched; only the parts we edit are re-serialized.

pub mod cell_ref;
pub mod content_types;
pub mod drawing;
pub mod package;
pub mod rels;
pub mod workbook;
pub mod worksheet;
pub mod xml;

#[cfg(test)]
pub mod testing;

use thiserror::Error;

pub use cell_ref::{CellRef, InvalidCellRef};
pub use drawing::{embed_picture, ImageFormat, OneCellAnchor, Picture};
pub use package::Package;
pub use worksheet::{CellValue, Worksheet};

/// Errors raised while reading, editing or writing a spreadsheet package.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("xml attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("part is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed part {part}: {reason}")]
    Malformed { part: String, reason: String },

    #[error("missing part: {0}")]
    MissingPart(String),

    #[error("workbook has no sheet named '{0}'")]
    MissingSheet(String),
}

impl PackageError {
    pub(crate) fn malformed(part: &str, reason: impl Into<String>) -> Self {
        PackageError::Malformed {
            part: part.to_string(),
            reason: reason.into(),
        }
    }
}
