//! Worksheet part editing: cell values, tab selection, drawing reference.

use std::borrow::Cow;

use super::cell_ref::CellRef;
use super::package::Package;
use super::rels::OFFICE_RELATIONSHIPS_NS;
use super::xml::{Element, Node, XmlDocument};
use super::PackageError;

/// Elements that the worksheet schema places after `<drawing>`.
const AFTER_DRAWING: &[&str] = &[
    "legacyDrawing",
    "legacyDrawingHF",
    "drawingHF",
    "picture",
    "oleObjects",
    "controls",
    "webPublishItems",
    "tableParts",
    "extLst",
];

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone)]
pub struct Worksheet {
    part: String,
    doc: XmlDocument,
}

impl Worksheet {
    pub fn open(package: &Package, part: &str) -> Result<Self, PackageError> {
        Ok(Worksheet {
            part: part.to_string(),
            doc: package.read_xml(part)?,
        })
    }

    pub fn save(&self, package: &mut Package) -> Result<(), PackageError> {
        package.write_xml(&self.part, &self.doc)
    }

    /// Writes `value` into the cell, creating the row and cell in document order
    /// when the template left them out. The cell keeps its style; any formula,
    /// cached value or shared-string reference it had is dropped. Characters
    /// XML 1.0 cannot carry are removed from text.
    pub fn set_value(&mut self, at: CellRef, value: &CellValue) -> Result<(), PackageError> {
        let root = &mut self.doc.root;
        let row_name = root.qualify("row");
        let cell_name = root.qualify("c");
        let inline_name = root.qualify("is");
        let text_name = root.qualify("t");
        let value_name = root.qualify("v");

        let sheet_data = root
            .child_mut("sheetData")
            .ok_or_else(|| PackageError::malformed(&self.part, "worksheet has no sheetData"))?;

        let row = ordered_child(sheet_data, "row", at.row, row_number, || {
            Element::new(row_name.as_str()).with_attr("r", at.row.to_string())
        })
        .ok_or_else(|| PackageError::malformed(&self.part, format!("row {} not writable", at.row)))?;
        // Spans are an optimisation hint and go stale once cells are added.
        row.remove_attr("spans");

        let cell = ordered_child(row, "c", at.column, cell_column, || {
            Element::new(cell_name.as_str()).with_attr("r", at.to_string())
        })
        .ok_or_else(|| PackageError::malformed(&self.part, format!("cell {at} not writable")))?;

        cell.attributes.retain(|(key, _)| key == "r" || key == "s");
        cell.children.clear();
        match value {
            CellValue::Text(text) => {
                cell.set_attr("t", "inlineStr");
                cell.push_child(
                    Element::new(inline_name).with_child(
                        Element::new(text_name)
                            .with_attr("xml:space", "preserve")
                            .with_text(xml_text(text)),
                    ),
                );
            }
            CellValue::Number(number) => {
                cell.push_child(Element::new(value_name).with_text(number.to_string()));
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn cell(&self, at: CellRef) -> Option<&Element> {
        let sheet_data = self.doc.root.child("sheetData")?;
        let row = sheet_data
            .children_named("row")
            .find(|r| row_number(r) == Some(at.row))?;
        row.children_named("c")
            .find(|c| cell_column(c) == Some(at.column))
    }

    /// Reads a cell back as text or number. Shared-string cells are resolved
    /// against `shared_strings`.
    #[cfg(test)]
    pub fn value(&self, at: CellRef, shared_strings: &[String]) -> Option<CellValue> {
        let cell = self.cell(at)?;
        let raw = cell.child("v").map(|v| v.text());

        match cell.attr("t") {
            Some("inlineStr") => cell.child("is").map(|is| CellValue::Text(is.text())),
            Some("s") => {
                let index: usize = raw?.trim().parse().ok()?;
                shared_strings.get(index).cloned().map(CellValue::Text)
            }
            Some("str") | Some("e") => raw.map(CellValue::Text),
            _ => raw?.trim().parse().ok().map(CellValue::Number),
        }
    }

    #[cfg(test)]
    pub fn is_tab_selected(&self) -> bool {
        self.doc
            .root
            .child("sheetViews")
            .map(|views| {
                views
                    .children_named("sheetView")
                    .any(|v| matches!(v.attr("tabSelected"), Some("1") | Some("true")))
            })
            .unwrap_or(false)
    }

    pub fn set_tab_selected(&mut self, selected: bool) {
        let Some(views) = self.doc.root.child_mut("sheetViews") else {
            return;
        };
        for view in views.children_named_mut("sheetView") {
            if selected {
                view.set_attr("tabSelected", "1");
            } else {
                view.remove_attr("tabSelected");
            }
        }
    }

    /// Relationship id of the sheet's `<drawing>`, if it has one.
    pub fn drawing_relationship(&self) -> Option<&str> {
        self.doc
            .root
            .child("drawing")
            .and_then(|d| d.relationship_id())
    }

    /// Adds `<drawing r:id=".."/>` at its schema position.
    pub fn insert_drawing(&mut self, relationship_id: &str) {
        let root = &mut self.doc.root;
        let prefix = match root.namespace_prefix(OFFICE_RELATIONSHIPS_NS) {
            Some(prefix) => prefix.to_string(),
            None => {
                root.set_attr("xmlns:r", OFFICE_RELATIONSHIPS_NS);
                "r".to_string()
            }
        };

        let drawing = Element::new(root.qualify("drawing"))
            .with_attr(format!("{prefix}:id"), relationship_id);
        let index = AFTER_DRAWING
            .iter()
            .filter_map(|name| root.position_of(name))
            .min();
        match index {
            Some(index) => root.insert_child(index, drawing),
            None => root.push_child(drawing),
        }
    }
}

/// Shared strings table of the workbook, in index order.
#[cfg(test)]
pub fn shared_strings(package: &Package, workbook_part: &str) -> Result<Vec<String>, PackageError> {
    use super::rels;

    let relationships = rels::Relationships::load(package, workbook_part)?;
    let part = relationships
        .find_by_type(rels::SHARED_STRINGS)
        .map(|r| rels::resolve_target(workbook_part, &r.target));
    let Some(part) = part else {
        return Ok(Vec::new());
    };
    let Some(doc) = package.read_xml_opt(&part)? else {
        return Ok(Vec::new());
    };

    Ok(doc
        .root
        .children_named("si")
        .map(|si| match si.child("t") {
            Some(t) => t.text(),
            None => si
                .children_named("r")
                .filter_map(|run| run.child("t"))
                .map(|t| t.text())
                .collect(),
        })
        .collect())
}

/// Drops control characters other than tab, LF and CR, plus U+FFFE/U+FFFF.
/// Excel refuses to open a part containing them.
fn xml_text(text: &str) -> Cow<'_, str> {
    let legal = |c: char| {
        matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
    };
    if text.chars().all(legal) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| legal(c)).collect())
    }
}

fn row_number(row: &Element) -> Option<u32> {
    row.attr("r")?.trim().parse().ok()
}

fn cell_column(cell: &Element) -> Option<u32> {
    CellRef::parse(cell.attr("r")?).ok().map(|r| r.column)
}

/// Finds the child `local` whose key equals `key`, inserting one built by
/// `build` before the first child with a larger key when absent.
fn ordered_child<'a>(
    parent: &'a mut Element,
    local: &str,
    key: u32,
    key_of: fn(&Element) -> Option<u32>,
    build: impl FnOnce() -> Element,
) -> Option<&'a mut Element> {
    let mut existing = false;
    let mut insert_at = None;
    for (index, node) in parent.children.iter().enumerate() {
        let Node::Element(element) = node else {
            continue;
        };
        if element.local_name() != local {
            continue;
        }
        match key_of(element) {
            Some(k) if k == key => {
                existing = true;
                break;
            }
            Some(k) if k > key => {
                insert_at = Some(index);
                break;
            }
            _ => {}
        }
    }

    if !existing {
        let element = build();
        match insert_at {
            Some(index) => parent.insert_child(index, element),
            None => parent.push_child(element),
        }
    }

    parent
        .elements_mut()
        .find(|e| e.local_name() == local && key_of(e) == Some(key))
}
