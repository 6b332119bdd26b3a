// Marriage license application document.
// Record model, sheet selection policy, cell map and the compositor that
// turns a record into a finished workbook. All spreadsheet I/O goes through
// crate::xlsx; nothing here touches zip or XML directly.

pub mod cell_map;
pub mod compositor;
pub mod handlers;
pub mod policy;
pub mod record;

pub use compositor::{Compositor, GenerateError, TemplateDefaults, XLSX_CONTENT_TYPE};
pub use record::{ApplicationPayload, ApplicationRecord, PhotoAttachment};
