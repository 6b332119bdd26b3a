//! Package relationships (`_rels/*.rels`) and part-name arithmetic.

use super::package::Package;
use super::xml::{Element, XmlDocument};
use super::PackageError;

pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const OFFICE_RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub const OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
#[cfg(test)]
pub const WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
#[cfg(test)]
pub const SHARED_STRINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
pub const CALC_CHAIN: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain";
pub const DRAWING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing";
pub const IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

/// Name of the relationships part that belongs to `part`.
/// The package root (`""`) maps to `_rels/.rels`.
pub fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship target against the part that owns the relationship.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = source_part.split('/').collect();
    segments.pop();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.retain(|s| !s.is_empty());
    segments.join("/")
}

/// Target string for a relationship from `source_part` to `target_part`.
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let source_dir: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let target: Vec<&str> = target_part.split('/').collect();

    let common = source_dir
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count()
        .min(target.len().saturating_sub(1));

    let mut parts: Vec<&str> = vec![".."; source_dir.len() - common];
    parts.extend(&target[common..]);
    parts.join("/")
}

/// Relationships owned by one part. Loading a part that has no `.rels` file
/// yields an empty set; saving writes the file.
#[derive(Debug, Clone)]
pub struct Relationships {
    doc: XmlDocument,
}

impl Relationships {
    pub fn load(package: &Package, source_part: &str) -> Result<Self, PackageError> {
        let doc = package
            .read_xml_opt(&rels_part_name(source_part))?
            .unwrap_or_else(|| {
                XmlDocument::new(Element::new("Relationships").with_attr("xmlns", RELATIONSHIPS_NS))
            });
        Ok(Relationships { doc })
    }

    pub fn save(&self, package: &mut Package, source_part: &str) -> Result<(), PackageError> {
        package.write_xml(&rels_part_name(source_part), &self.doc)
    }

    pub fn iter(&self) -> impl Iterator<Item = Relationship> + '_ {
        self.doc
            .root
            .children_named("Relationship")
            .filter_map(|e| {
                Some(Relationship {
                    id: e.attr("Id")?.to_string(),
                    rel_type: e.attr("Type").unwrap_or_default().to_string(),
                    target: e.attr("Target").unwrap_or_default().to_string(),
                })
            })
    }

    pub fn get(&self, id: &str) -> Option<Relationship> {
        self.iter().find(|r| r.id == id)
    }

    pub fn find_by_type(&self, rel_type: &str) -> Option<Relationship> {
        self.iter().find(|r| r.rel_type == rel_type)
    }

    /// Adds a relationship and returns its freshly allocated `rIdN`.
    pub fn add(&mut self, rel_type: &str, target: &str) -> String {
        let taken: Vec<String> = self.iter().map(|r| r.id).collect();
        let id = (1..)
            .map(|n| format!("rId{n}"))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or_else(|| "rId".to_string());

        let element = Element::new(self.doc.root.qualify("Relationship"))
            .with_attr("Id", id.as_str())
            .with_attr("Type", rel_type)
            .with_attr("Target", target);
        self.doc.root.push_child(element);
        id
    }

    pub fn remove(&mut self, id: &str) -> Option<Relationship> {
        let removed = self.get(id)?;
        self.doc
            .root
            .retain_elements(|e| e.local_name() != "Relationship" || e.attr("Id") != Some(id));
        Some(removed)
    }

    pub fn remove_by_type(&mut self, rel_type: &str) -> Vec<Relationship> {
        let removed: Vec<Relationship> = self.iter().filter(|r| r.rel_type == rel_type).collect();
        self.doc
            .root
            .retain_elements(|e| e.local_name() != "Relationship" || e.attr("Type") != Some(rel_type));
        removed
    }
}
