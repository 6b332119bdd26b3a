use super::package::Package;
use super::xml::{Element, XmlDocument};
use super::PackageError;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const DRAWING_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.drawing+xml";

/// `[Content_Types].xml`: default content types per extension plus per-part overrides.
#[derive(Debug, Clone)]
pub struct ContentTypes {
    doc: XmlDocument,
}

impl ContentTypes {
    pub fn load(package: &Package) -> Result<Self, PackageError> {
        Ok(ContentTypes {
            doc: package.read_xml(CONTENT_TYPES_PART)?,
        })
    }

    pub fn save(&self, package: &mut Package) -> Result<(), PackageError> {
        package.write_xml(CONTENT_TYPES_PART, &self.doc)
    }

    pub fn has_default(&self, extension: &str) -> bool {
        self.doc.root.children_named("Default").any(|e| {
            e.attr("Extension")
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
    }

    pub fn ensure_default(&mut self, extension: &str, content_type: &str) {
        if self.has_default(extension) {
            return;
        }
        // Defaults must precede overrides.
        let element = Element::new(self.doc.root.qualify("Default"))
            .with_attr("Extension", extension)
            .with_attr("ContentType", content_type);
        match self.doc.root.position_of("Override") {
            Some(index) => self.doc.root.insert_child(index, element),
            None => self.doc.root.push_child(element),
        }
    }

    #[cfg(test)]
    pub fn override_for(&self, part: &str) -> Option<&str> {
        let key = format!("/{part}");
        self.doc
            .root
            .children_named("Override")
            .find(|e| e.attr("PartName") == Some(key.as_str()))
            .and_then(|e| e.attr("ContentType"))
    }

    pub fn add_override(&mut self, part: &str, content_type: &str) {
        self.remove_override(part);
        let element = Element::new(self.doc.root.qualify("Override"))
            .with_attr("PartName", format!("/{part}"))
            .with_attr("ContentType", content_type);
        self.doc.root.push_child(element);
    }

    pub fn remove_override(&mut self, part: &str) {
        let key = format!("/{part}");
        self.doc.root.retain_elements(|e| {
            e.local_name() != "Override" || e.attr("PartName") != Some(key.as_str())
        });
    }
}
