//! Test fixtures: a stand-in for the marriage-license template workbook.
//!
//! Mirrors the shape of the real template (sheet names and order, hidden
//! clause sheets, shared-string labels, formula cells in mapped positions,
//! print areas, calc chain) so sheet pruning and cell writes are exercised
//! against the same structures they meet in production.

use std::path::{Path, PathBuf};

use super::content_types::{CONTENT_TYPES_PART, DRAWING_CONTENT_TYPE};
use super::package::Package;
use super::rels::{self, OFFICE_RELATIONSHIPS_NS, RELATIONSHIPS_NS};
use super::workbook;
use super::worksheet::{self, CellValue, Worksheet};
use super::xml::{Element, XmlDocument};
use super::CellRef;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const WORKSHEET_CT: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

pub const TEMPLATE_SHEETS: [&str; 12] = [
    "CONSENT F",
    "CONSENT M",
    "CONSENT M&F",
    "ADVICE F",
    "ADVICE M",
    "ADVICE M&F",
    "ADVICE M-CONSENT F",
    "ADVICE F-CONSENT M",
    "APPLICATION",
    "Notice",
    "AddressBACKnotice",
    "EnvelopeAddress",
];

/// Smallest valid PNG: one transparent pixel.
pub const PNG_1X1: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

const LABELS: [&str; 3] = ["First name", "FATHER", "Date of execution"];

pub fn marriage_template() -> Vec<u8> {
    build(false)
}

/// Same workbook, but the Notice sheet already carries a logo picture.
pub fn marriage_template_with_logo() -> Vec<u8> {
    build(true)
}

pub fn write_template(dir: &Path, bytes: &[u8]) -> PathBuf {
    let path = dir.join("template.xlsx");
    std::fs::write(&path, bytes).expect("write template fixture");
    path
}

/// Reads one cell of a named sheet from generated output.
pub fn read_cell(package: &Package, sheet: &str, cell: &str) -> Option<CellValue> {
    let workbook_part = workbook::workbook_part(package).expect("workbook part");
    let shared = worksheet::shared_strings(package, &workbook_part).expect("shared strings");
    let part = workbook::sheet_part(package, sheet).expect("sheets")?;
    let sheet = Worksheet::open(package, &part).expect("worksheet");
    sheet.value(CellRef::parse(cell).expect("cell ref"), &shared)
}

fn sheet_part(index: usize) -> String {
    format!("xl/worksheets/sheet{}.xml", index + 1)
}

fn build(with_logo: bool) -> Vec<u8> {
    let mut package = Package::default();
    let notice_index = TEMPLATE_SHEETS
        .iter()
        .position(|name| *name == "Notice")
        .expect("notice sheet");

    // Content types
    let mut types = Element::new("Types")
        .with_attr("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")
        .with_child(default_type("rels", "application/vnd.openxmlformats-package.relationships+xml"))
        .with_child(default_type("xml", "application/xml"))
        .with_child(default_type(
            "bin",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.printerSettings",
        ))
        .with_child(override_type(
            "xl/workbook.xml",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
        ));
    if with_logo {
        types.insert_child(0, default_type("png", "image/png"));
    }
    for index in 0..TEMPLATE_SHEETS.len() {
        types.push_child(override_type(&sheet_part(index), WORKSHEET_CT));
    }
    types.push_child(override_type(
        "xl/sharedStrings.xml",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml",
    ));
    types.push_child(override_type(
        "xl/calcChain.xml",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml",
    ));
    if with_logo {
        types.push_child(override_type("xl/drawings/drawing1.xml", DRAWING_CONTENT_TYPE));
    }
    put(&mut package, CONTENT_TYPES_PART, types);

    // Package root relationships
    put(
        &mut package,
        "_rels/.rels",
        relationships(&[("rId1", rels::OFFICE_DOCUMENT, "xl/workbook.xml")]),
    );

    // Workbook
    let mut sheets = Element::new("sheets");
    for (index, name) in TEMPLATE_SHEETS.iter().enumerate() {
        let mut sheet = Element::new("sheet")
            .with_attr("name", *name)
            .with_attr("sheetId", (index + 1).to_string())
            .with_attr("r:id", format!("rId{}", index + 1));
        if !matches!(*name, "APPLICATION" | "Notice" | "CONSENT F") {
            sheet.set_attr("state", "hidden");
        }
        sheets.push_child(sheet);
    }
    let workbook_root = Element::new("workbook")
        .with_attr("xmlns", MAIN_NS)
        .with_attr("xmlns:r", OFFICE_RELATIONSHIPS_NS)
        .with_child(Element::new("workbookPr").with_attr("defaultThemeVersion", "164011"))
        .with_child(
            Element::new("bookViews").with_child(
                Element::new("workbookView")
                    .with_attr("xWindow", "0")
                    .with_attr("yWindow", "0")
                    .with_attr("windowWidth", "28800")
                    .with_attr("windowHeight", "12300")
                    .with_attr("firstSheet", "0")
                    .with_attr("activeTab", "0"),
            ),
        )
        .with_child(sheets)
        .with_child(
            Element::new("definedNames")
                .with_child(
                    Element::new("definedName")
                        .with_attr("name", "_xlnm.Print_Area")
                        .with_attr("localSheetId", "0")
                        .with_text("'CONSENT F'!$A$1:$H$40"),
                )
                .with_child(
                    Element::new("definedName")
                        .with_attr("name", "_xlnm.Print_Area")
                        .with_attr("localSheetId", "8")
                        .with_text("APPLICATION!$A$1:$AH$40"),
                )
                .with_child(
                    Element::new("definedName")
                        .with_attr("name", "GiverBlock")
                        .with_text("'ADVICE M&F'!$B$2:$H$9"),
                ),
        )
        .with_child(Element::new("calcPr").with_attr("calcId", "191029"));
    put(&mut package, "xl/workbook.xml", workbook_root);

    let mut workbook_rels: Vec<(String, &str, String)> = (0..TEMPLATE_SHEETS.len())
        .map(|index| {
            (
                format!("rId{}", index + 1),
                rels::WORKSHEET,
                format!("worksheets/sheet{}.xml", index + 1),
            )
        })
        .collect();
    workbook_rels.push(("rId13".to_string(), rels::SHARED_STRINGS, "sharedStrings.xml".to_string()));
    workbook_rels.push(("rId14".to_string(), rels::CALC_CHAIN, "calcChain.xml".to_string()));
    let workbook_rels: Vec<(&str, &str, &str)> = workbook_rels
        .iter()
        .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
        .collect();
    put(&mut package, "xl/_rels/workbook.xml.rels", relationships(&workbook_rels));

    // Shared strings: field labels, then one title per sheet.
    let mut sst = Element::new("sst").with_attr("xmlns", MAIN_NS);
    for text in LABELS.iter().chain(TEMPLATE_SHEETS.iter()) {
        sst.push_child(Element::new("si").with_child(Element::new("t").with_text(*text)));
    }
    let count = (LABELS.len() + TEMPLATE_SHEETS.len()).to_string();
    sst.set_attr("count", count.as_str());
    sst.set_attr("uniqueCount", count.as_str());
    put(&mut package, "xl/sharedStrings.xml", sst);

    // Worksheets
    for (index, name) in TEMPLATE_SHEETS.iter().enumerate() {
        let title = shared_cell("A1", LABELS.len() + index);
        let mut rows = vec![Element::new("row").with_attr("r", "1").with_child(title)];
        if *name == "APPLICATION" {
            rows.extend(application_rows());
        }
        let drawing = (with_logo && index == notice_index).then_some("rId1");
        put(&mut package, &sheet_part(index), worksheet(rows, index == 0, drawing));
    }

    // CONSENT F carries printer settings, like sheets saved from a real install.
    package.put("xl/printerSettings/printerSettings1.bin", vec![0u8; 16]);
    put(
        &mut package,
        "xl/worksheets/_rels/sheet1.xml.rels",
        relationships(&[(
            "rId1",
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships/printerSettings",
            "../printerSettings/printerSettings1.bin",
        )]),
    );

    put(
        &mut package,
        "xl/calcChain.xml",
        Element::new("calcChain")
            .with_attr("xmlns", MAIN_NS)
            .with_child(Element::new("c").with_attr("r", "N11").with_attr("i", "9"))
            .with_child(Element::new("c").with_attr("r", "L12")),
    );

    if with_logo {
        add_logo(&mut package, &sheet_part(notice_index));
    }

    package.to_bytes().expect("serialize template fixture")
}

fn application_rows() -> Vec<Element> {
    vec![
        Element::new("row")
            .with_attr("r", "8")
            .with_child(shared_cell("A8", 0))
            .with_child(Element::new("c").with_attr("r", "B8").with_attr("s", "3")),
        Element::new("row")
            .with_attr("r", "11")
            .with_child(Element::new("c").with_attr("r", "B11").with_attr("s", "2"))
            .with_child(
                Element::new("c")
                    .with_attr("r", "N11")
                    .with_attr("s", "7")
                    .with_child(Element::new("f").with_text("DATEDIF(B11,TODAY(),\"y\")"))
                    .with_child(Element::new("v").with_text("0")),
            ),
        Element::new("row").with_attr("r", "12").with_child(
            Element::new("c")
                .with_attr("r", "L12")
                .with_attr("s", "4")
                .with_attr("t", "str")
                .with_child(Element::new("f").with_text("\"Philippines\""))
                .with_child(Element::new("v").with_text("Philippines")),
        ),
        Element::new("row")
            .with_attr("r", "15")
            .with_attr("spans", "1:34")
            .with_child(Element::new("c").with_attr("r", "A15").with_attr("s", "1")),
        Element::new("row")
            .with_attr("r", "22")
            .with_child(shared_cell("Z22", 1)),
        Element::new("row")
            .with_attr("r", "37")
            .with_child(shared_cell("A37", 2)),
    ]
}

fn add_logo(package: &mut Package, notice_part: &str) {
    package.put("xl/media/image1.png", PNG_1X1.to_vec());
    put(
        package,
        &rels::rels_part_name(notice_part),
        relationships(&[("rId1", rels::DRAWING, "../drawings/drawing1.xml")]),
    );
    put(
        package,
        "xl/drawings/_rels/drawing1.xml.rels",
        relationships(&[("rId1", rels::IMAGE, "../media/image1.png")]),
    );

    let marker = |tag: &str, col: &str, row: &str| {
        Element::new(tag)
            .with_child(Element::new("xdr:col").with_text(col))
            .with_child(Element::new("xdr:colOff").with_text("0"))
            .with_child(Element::new("xdr:row").with_text(row))
            .with_child(Element::new("xdr:rowOff").with_text("0"))
    };
    let logo = Element::new("xdr:twoCellAnchor")
        .with_attr("editAs", "oneCell")
        .with_child(marker("xdr:from", "0", "0"))
        .with_child(marker("xdr:to", "2", "4"))
        .with_child(
            Element::new("xdr:pic")
                .with_child(
                    Element::new("xdr:nvPicPr")
                        .with_child(
                            Element::new("xdr:cNvPr")
                                .with_attr("id", "2")
                                .with_attr("name", "Municipal Seal"),
                        )
                        .with_child(Element::new("xdr:cNvPicPr")),
                )
                .with_child(
                    Element::new("xdr:blipFill")
                        .with_child(Element::new("a:blip").with_attr("r:embed", "rId1"))
                        .with_child(Element::new("a:stretch").with_child(Element::new("a:fillRect"))),
                )
                .with_child(Element::new("xdr:spPr")),
        )
        .with_child(Element::new("xdr:clientData"));
    put(
        package,
        "xl/drawings/drawing1.xml",
        Element::new("xdr:wsDr")
            .with_attr(
                "xmlns:xdr",
                "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing",
            )
            .with_attr("xmlns:a", "http://schemas.openxmlformats.org/drawingml/2006/main")
            .with_attr("xmlns:r", OFFICE_RELATIONSHIPS_NS)
            .with_child(logo),
    );
}

fn worksheet(rows: Vec<Element>, tab_selected: bool, drawing: Option<&str>) -> Element {
    let mut view = Element::new("sheetView").with_attr("workbookViewId", "0");
    if tab_selected {
        view = Element::new("sheetView")
            .with_attr("tabSelected", "1")
            .with_attr("workbookViewId", "0");
    }
    let mut sheet_data = Element::new("sheetData");
    for row in rows {
        sheet_data.push_child(row);
    }
    let mut root = Element::new("worksheet")
        .with_attr("xmlns", MAIN_NS)
        .with_attr("xmlns:r", OFFICE_RELATIONSHIPS_NS)
        .with_child(Element::new("sheetViews").with_child(view))
        .with_child(Element::new("sheetFormatPr").with_attr("defaultRowHeight", "15"))
        .with_child(sheet_data)
        .with_child(
            Element::new("pageMargins")
                .with_attr("left", "0.7")
                .with_attr("right", "0.7")
                .with_attr("top", "0.75")
                .with_attr("bottom", "0.75")
                .with_attr("header", "0.3")
                .with_attr("footer", "0.3"),
        );
    if let Some(id) = drawing {
        root.push_child(Element::new("drawing").with_attr("r:id", id));
    }
    root
}

fn shared_cell(at: &str, index: usize) -> Element {
    Element::new("c")
        .with_attr("r", at)
        .with_attr("t", "s")
        .with_child(Element::new("v").with_text(index.to_string()))
}

fn default_type(extension: &str, content_type: &str) -> Element {
    Element::new("Default")
        .with_attr("Extension", extension)
        .with_attr("ContentType", content_type)
}

fn override_type(part: &str, content_type: &str) -> Element {
    Element::new("Override")
        .with_attr("PartName", format!("/{part}"))
        .with_attr("ContentType", content_type)
}

fn relationships(entries: &[(&str, &str, &str)]) -> Element {
    let mut root = Element::new("Relationships").with_attr("xmlns", RELATIONSHIPS_NS);
    for (id, kind, target) in entries {
        root.push_child(
            Element::new("Relationship")
                .with_attr("Id", *id)
                .with_attr("Type", *kind)
                .with_attr("Target", *target),
        );
    }
    root
}

fn put(package: &mut Package, part: &str, root: Element) {
    package
        .write_xml(part, &XmlDocument::new(root))
        .expect("serialize fixture part");
}
