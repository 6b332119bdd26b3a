//! Embedding raster pictures into a worksheet's drawing part.

use super::content_types::{ContentTypes, DRAWING_CONTENT_TYPE};
use super::package::Package;
use super::rels::{self, Relationships, OFFICE_RELATIONSHIPS_NS};
use super::worksheet::Worksheet;
use super::xml::{Element, XmlDocument};
use super::PackageError;

pub const SPREADSHEET_DRAWING_NS: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";
pub const DRAWINGML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

/// English Metric Units per centimetre.
#[cfg(test)]
pub const EMU_PER_CM: f64 = 360_000.0;

#[cfg(test)]
pub fn cm_to_emu(cm: f64) -> i64 {
    (cm * EMU_PER_CM).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    /// Parses a declared format or file extension. `jpg` is accepted as `jpeg`.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "gif" => Some(ImageFormat::Gif),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
        }
    }

    /// Checks the file's magic bytes against the declared format.
    pub fn matches_signature(self, data: &[u8]) -> bool {
        match self {
            ImageFormat::Jpeg => data.starts_with(&[0xFF, 0xD8, 0xFF]),
            ImageFormat::Png => data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
            ImageFormat::Gif => data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a"),
        }
    }
}

/// Top-left cell (zero-based) plus a fixed extent; the picture moves with the
/// cell but is never resized by row or column changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneCellAnchor {
    pub column: u32,
    pub row: u32,
    pub width_emu: i64,
    pub height_emu: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct Picture<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
    pub format: ImageFormat,
    pub anchor: OneCellAnchor,
}

/// A picture found in a sheet's drawing, resolved to its media part.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredPicture {
    pub anchor: OneCellAnchor,
    pub media_part: String,
}

/// Adds `picture` to the worksheet at `sheet_part`. An existing drawing part is
/// extended; otherwise a new one is created and linked from the sheet.
///
/// Returns the name of the media part holding the image bytes.
pub fn embed_picture(
    package: &mut Package,
    sheet_part: &str,
    picture: &Picture<'_>,
) -> Result<String, PackageError> {
    let mut content_types = ContentTypes::load(package)?;
    let mut sheet = Worksheet::open(package, sheet_part)?;
    let mut sheet_rels = Relationships::load(package, sheet_part)?;

    let media_part = package.unique_name("xl/media/image", picture.format.extension());
    package.put(&media_part, picture.data.to_vec());
    content_types.ensure_default(picture.format.extension(), picture.format.content_type());

    let existing = match sheet.drawing_relationship() {
        Some(id) => {
            let relationship = sheet_rels.get(id).ok_or_else(|| {
                PackageError::malformed(sheet_part, format!("drawing points at unknown {id}"))
            })?;
            Some(rels::resolve_target(sheet_part, &relationship.target))
        }
        None => None,
    };
    let drawing_part = match existing {
        Some(part) => part,
        None => {
            let part = package.unique_name("xl/drawings/drawing", "xml");
            let id = sheet_rels.add(rels::DRAWING, &rels::relative_target(sheet_part, &part));
            sheet.insert_drawing(&id);
            content_types.add_override(&part, DRAWING_CONTENT_TYPE);
            part
        }
    };

    let mut drawing = package
        .read_xml_opt(&drawing_part)?
        .unwrap_or_else(empty_drawing);
    let mut drawing_rels = Relationships::load(package, &drawing_part)?;
    let image_id = drawing_rels.add(rels::IMAGE, &rels::relative_target(&drawing_part, &media_part));

    let shape_id = next_shape_id(&drawing.root);
    let anchor = one_cell_anchor(&mut drawing.root, picture, shape_id, &image_id);
    drawing.root.push_child(anchor);

    package.write_xml(&drawing_part, &drawing)?;
    drawing_rels.save(package, &drawing_part)?;
    sheet.save(package)?;
    sheet_rels.save(package, sheet_part)?;
    content_types.save(package)?;

    Ok(media_part)
}

/// Lists one-cell and two-cell anchored pictures on a sheet.
#[cfg(test)]
pub fn anchored_pictures(
    package: &Package,
    sheet_part: &str,
) -> Result<Vec<AnchoredPicture>, PackageError> {
    let sheet = Worksheet::open(package, sheet_part)?;
    let Some(id) = sheet.drawing_relationship() else {
        return Ok(Vec::new());
    };
    let sheet_rels = Relationships::load(package, sheet_part)?;
    let Some(relationship) = sheet_rels.get(id) else {
        return Ok(Vec::new());
    };
    let drawing_part = rels::resolve_target(sheet_part, &relationship.target);
    let drawing = package.read_xml(&drawing_part)?;
    let drawing_rels = Relationships::load(package, &drawing_part)?;

    let mut pictures = Vec::new();
    for anchor in drawing.root.elements() {
        let Some(pic) = anchor.child("pic") else {
            continue;
        };
        let Some(from) = anchor.child("from") else {
            continue;
        };
        let embed = pic
            .child("blipFill")
            .and_then(|fill| fill.child("blip"))
            .and_then(|blip| {
                blip.attributes
                    .iter()
                    .find(|(key, _)| key.contains(':') && super::xml::local_name(key) == "embed")
                    .map(|(_, value)| value.as_str())
            });
        let Some(media) = embed.and_then(|id| drawing_rels.get(id)) else {
            continue;
        };
        let (width_emu, height_emu) = anchor
            .child("ext")
            .or_else(|| {
                pic.child("spPr")
                    .and_then(|sp| sp.child("xfrm"))
                    .and_then(|xfrm| xfrm.child("ext"))
            })
            .map(|ext| (number_attr(ext, "cx"), number_attr(ext, "cy")))
            .unwrap_or((0, 0));

        pictures.push(AnchoredPicture {
            anchor: OneCellAnchor {
                column: child_number(from, "col"),
                row: child_number(from, "row"),
                width_emu,
                height_emu,
            },
            media_part: rels::resolve_target(&drawing_part, &media.target),
        });
    }
    Ok(pictures)
}

fn empty_drawing() -> XmlDocument {
    XmlDocument::new(
        Element::new("xdr:wsDr")
            .with_attr("xmlns:xdr", SPREADSHEET_DRAWING_NS)
            .with_attr("xmlns:a", DRAWINGML_NS),
    )
}

fn next_shape_id(root: &Element) -> u32 {
    root.descendants()
        .into_iter()
        .filter(|e| e.local_name() == "cNvPr")
        .filter_map(|e| e.attr("id").and_then(|id| id.parse::<u32>().ok()))
        .max()
        .unwrap_or(1)
        + 1
}

/// Builds the anchor element, declaring the DrawingML and relationship
/// namespaces on the drawing root when an existing part lacks them.
fn one_cell_anchor(root: &mut Element, picture: &Picture<'_>, shape_id: u32, image_id: &str) -> Element {
    let xdr = root.prefix().map(str::to_string);
    let a = match root.namespace_prefix(DRAWINGML_NS) {
        Some(prefix) => prefix.to_string(),
        None => {
            root.set_attr("xmlns:a", DRAWINGML_NS);
            "a".to_string()
        }
    };
    let r = match root.namespace_prefix(OFFICE_RELATIONSHIPS_NS) {
        Some(prefix) => prefix.to_string(),
        None => {
            root.set_attr("xmlns:r", OFFICE_RELATIONSHIPS_NS);
            "r".to_string()
        }
    };

    let x = |local: &str| match &xdr {
        Some(prefix) => format!("{prefix}:{local}"),
        None => local.to_string(),
    };
    let d = |local: &str| format!("{a}:{local}");
    let anchor = picture.anchor;
    let cx = anchor.width_emu.to_string();
    let cy = anchor.height_emu.to_string();

    Element::new(x("oneCellAnchor"))
        .with_child(
            Element::new(x("from"))
                .with_child(Element::new(x("col")).with_text(anchor.column.to_string()))
                .with_child(Element::new(x("colOff")).with_text("0"))
                .with_child(Element::new(x("row")).with_text(anchor.row.to_string()))
                .with_child(Element::new(x("rowOff")).with_text("0")),
        )
        .with_child(
            Element::new(x("ext"))
                .with_attr("cx", cx.as_str())
                .with_attr("cy", cy.as_str()),
        )
        .with_child(
            Element::new(x("pic"))
                .with_child(
                    Element::new(x("nvPicPr"))
                        .with_child(
                            Element::new(x("cNvPr"))
                                .with_attr("id", shape_id.to_string())
                                .with_attr("name", picture.name),
                        )
                        .with_child(
                            Element::new(x("cNvPicPr")).with_child(
                                Element::new(d("picLocks")).with_attr("noChangeAspect", "1"),
                            ),
                        ),
                )
                .with_child(
                    Element::new(x("blipFill"))
                        .with_child(Element::new(d("blip")).with_attr(format!("{r}:embed"), image_id))
                        .with_child(
                            Element::new(d("stretch")).with_child(Element::new(d("fillRect"))),
                        ),
                )
                .with_child(
                    Element::new(x("spPr"))
                        .with_child(
                            Element::new(d("xfrm"))
                                .with_child(Element::new(d("off")).with_attr("x", "0").with_attr("y", "0"))
                                .with_child(
                                    Element::new(d("ext"))
                                        .with_attr("cx", cx.as_str())
                                        .with_attr("cy", cy.as_str()),
                                ),
                        )
                        .with_child(
                            Element::new(d("prstGeom"))
                                .with_attr("prst", "rect")
                                .with_child(Element::new(d("avLst"))),
                        ),
                ),
        )
        .with_child(Element::new(x("clientData")))
}

#[cfg(test)]
fn child_number(parent: &Element, local: &str) -> u32 {
    parent
        .child(local)
        .and_then(|e| e.text().trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
fn number_attr(element: &Element, key: &str) -> i64 {
    element
        .attr(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}
