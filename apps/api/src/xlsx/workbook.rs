//! Workbook-level structure: sheet list, sheet removal, active tab.

use std::collections::HashSet;

use tracing::debug;

use super::content_types::ContentTypes;
use super::package::Package;
use super::rels::{self, Relationships};
use super::worksheet::Worksheet;
use super::xml::{Element, XmlDocument};
use super::PackageError;

const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

/// Elements that the workbook schema places after `<calcPr>`.
const AFTER_CALC_PR: &[&str] = &[
    "oleSize",
    "customWorkbookViews",
    "pivotCaches",
    "smartTagPr",
    "smartTagTypes",
    "webPublishing",
    "fileRecoveryPr",
    "webPublishObjects",
    "extLst",
];

/// One `<sheet>` entry of the workbook, resolved to its part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    pub relationship_id: String,
    pub part: String,
    pub hidden: bool,
}

/// Locates the workbook part through the package root relationships.
pub fn workbook_part(package: &Package) -> Result<String, PackageError> {
    let root_rels = Relationships::load(package, "")?;
    let part = root_rels
        .find_by_type(rels::OFFICE_DOCUMENT)
        .map(|r| rels::resolve_target("", &r.target))
        .unwrap_or_else(|| DEFAULT_WORKBOOK_PART.to_string());
    if !package.contains(&part) {
        return Err(PackageError::MissingPart(part));
    }
    Ok(part)
}

pub fn sheets(package: &Package) -> Result<Vec<SheetEntry>, PackageError> {
    let part = workbook_part(package)?;
    let workbook = package.read_xml(&part)?;
    let relationships = Relationships::load(package, &part)?;
    sheet_entries(&part, &workbook, &relationships)
}

pub fn sheet_part(package: &Package, name: &str) -> Result<Option<String>, PackageError> {
    Ok(sheets(package)?
        .into_iter()
        .find(|s| s.name == name)
        .map(|s| s.part))
}

/// Name of the sheet the first workbook view opens on.
#[cfg(test)]
pub fn active_sheet(package: &Package) -> Result<Option<String>, PackageError> {
    let part = workbook_part(package)?;
    let workbook = package.read_xml(&part)?;
    let relationships = Relationships::load(package, &part)?;
    let entries = sheet_entries(&part, &workbook, &relationships)?;

    let active_tab = workbook
        .root
        .child("bookViews")
        .and_then(|views| views.child("workbookView"))
        .and_then(|view| view.attr("activeTab"))
        .and_then(|tab| tab.parse::<usize>().ok())
        .unwrap_or(0);
    Ok(entries.get(active_tab).map(|s| s.name.clone()))
}

fn sheet_entries(
    workbook_part: &str,
    workbook: &XmlDocument,
    relationships: &Relationships,
) -> Result<Vec<SheetEntry>, PackageError> {
    let Some(sheets) = workbook.root.child("sheets") else {
        return Err(PackageError::malformed(workbook_part, "workbook has no sheets"));
    };

    sheets
        .children_named("sheet")
        .map(|sheet| -> Result<SheetEntry, PackageError> {
            let name = sheet
                .attr("name")
                .ok_or_else(|| PackageError::malformed(workbook_part, "sheet without a name"))?;
            let relationship_id = sheet.relationship_id().ok_or_else(|| {
                PackageError::malformed(workbook_part, format!("sheet '{name}' has no r:id"))
            })?;
            let relationship = relationships.get(relationship_id).ok_or_else(|| {
                PackageError::malformed(
                    workbook_part,
                    format!("sheet '{name}' points at unknown relationship {relationship_id}"),
                )
            })?;
            Ok(SheetEntry {
                name: name.to_string(),
                relationship_id: relationship_id.to_string(),
                part: rels::resolve_target(workbook_part, &relationship.target),
                hidden: matches!(sheet.attr("state"), Some("hidden") | Some("veryHidden")),
            })
        })
        .collect()
}

/// Physically removes every sheet whose name is not in `keep`, then makes all
/// remaining sheets visible and `active` the open, selected tab.
///
/// Sheets are matched by name and removed through their relationship and part
/// names, so positions shifting during removal never matter. Sheet-scoped
/// defined names are re-indexed; names tied to a removed sheet are dropped.
/// The calculation chain is discarded because it indexes sheets by position,
/// and the workbook is flagged for a full recalculation on load so formulas
/// never show the template's cached results.
///
/// Returns the names of the removed sheets in workbook order.
pub fn retain_sheets(
    package: &mut Package,
    keep: &[&str],
    active: &str,
) -> Result<Vec<String>, PackageError> {
    let part = workbook_part(package)?;
    let mut workbook = package.read_xml(&part)?;
    let mut relationships = Relationships::load(package, &part)?;
    let mut content_types = ContentTypes::load(package)?;

    let entries = sheet_entries(&part, &workbook, &relationships)?;
    let original_order: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
    let (kept, removed): (Vec<SheetEntry>, Vec<SheetEntry>) = entries
        .into_iter()
        .partition(|e| keep.contains(&e.name.as_str()));

    let active_index = kept
        .iter()
        .position(|e| e.name == active)
        .ok_or_else(|| PackageError::MissingSheet(active.to_string()))?;

    for entry in &removed {
        debug!(sheet = %entry.name, part = %entry.part, "removing sheet");
        relationships.remove(&entry.relationship_id);
        package.remove(&entry.part);
        package.remove(&rels::rels_part_name(&entry.part));
        content_types.remove_override(&entry.part);
    }

    for entry in kept.iter().filter(|e| e.hidden) {
        debug!(sheet = %entry.name, "unhiding sheet");
    }

    let removed_names: HashSet<&str> = removed.iter().map(|e| e.name.as_str()).collect();
    if let Some(sheets) = workbook.root.child_mut("sheets") {
        sheets.retain_elements(|sheet| {
            sheet
                .attr("name")
                .map_or(true, |name| !removed_names.contains(name))
        });
        for sheet in sheets.children_named_mut("sheet") {
            sheet.remove_attr("state");
        }
    }

    let kept_names: Vec<&str> = kept.iter().map(|e| e.name.as_str()).collect();
    reindex_defined_names(&mut workbook.root, &original_order, &kept_names, &removed_names);

    for chain in relationships.remove_by_type(rels::CALC_CHAIN) {
        let chain_part = rels::resolve_target(&part, &chain.target);
        package.remove(&chain_part);
        content_types.remove_override(&chain_part);
    }
    request_full_calculation(&mut workbook.root);

    set_active_tab(&mut workbook.root, active_index);

    package.write_xml(&part, &workbook)?;
    relationships.save(package, &part)?;
    content_types.save(package)?;

    for entry in &kept {
        let mut sheet = Worksheet::open(package, &entry.part)?;
        sheet.set_tab_selected(entry.name == active);
        sheet.save(package)?;
    }

    Ok(removed.into_iter().map(|e| e.name).collect())
}

fn reindex_defined_names(
    workbook: &mut Element,
    original_order: &[String],
    kept_names: &[&str],
    removed_names: &HashSet<&str>,
) {
    let Some(defined_names) = workbook.child_mut("definedNames") else {
        return;
    };

    defined_names.retain_elements(|name| {
        let scope_removed = name
            .attr("localSheetId")
            .and_then(|id| id.parse::<usize>().ok())
            .and_then(|index| original_order.get(index))
            .is_some_and(|sheet| removed_names.contains(sheet.as_str()));
        let formula = name.text();
        let refers_to_removed = removed_names
            .iter()
            .any(|sheet| references_sheet(&formula, sheet));
        !scope_removed && !refers_to_removed
    });

    for name in defined_names.children_named_mut("definedName") {
        let new_index = name
            .attr("localSheetId")
            .and_then(|id| id.parse::<usize>().ok())
            .and_then(|index| original_order.get(index))
            .and_then(|sheet| kept_names.iter().position(|kept| kept == sheet));
        if let Some(index) = new_index {
            name.set_attr("localSheetId", index.to_string());
        }
    }

    if defined_names.elements().next().is_none() {
        workbook.retain_elements(|e| e.local_name() != "definedNames");
    }
}

/// True when `formula` contains a reference into `sheet`, quoted or bare.
fn references_sheet(formula: &str, sheet: &str) -> bool {
    let quoted = format!("'{}'!", sheet.replace('\'', "''"));
    if formula.contains(&quoted) {
        return true;
    }
    let bare = format!("{sheet}!");
    formula.match_indices(&bare).any(|(at, _)| {
        formula[..at]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == '.' || c == '\''))
    })
}

/// Sets `fullCalcOnLoad` on `<calcPr>`, creating the element at its schema
/// position when the workbook has none.
fn request_full_calculation(workbook: &mut Element) {
    if workbook.child("calcPr").is_none() {
        let calc_pr = Element::new(workbook.qualify("calcPr"));
        let index = AFTER_CALC_PR
            .iter()
            .filter_map(|name| workbook.position_of(name))
            .min();
        match index {
            Some(index) => workbook.insert_child(index, calc_pr),
            None => workbook.push_child(calc_pr),
        }
    }
    if let Some(calc_pr) = workbook.child_mut("calcPr") {
        calc_pr.set_attr("fullCalcOnLoad", "1");
    }
}

fn set_active_tab(workbook: &mut Element, active_index: usize) {
    if workbook.child("bookViews").is_none() {
        let views = Element::new(workbook.qualify("bookViews"))
            .with_child(Element::new(workbook.qualify("workbookView")));
        let index = workbook
            .position_of("sheets")
            .unwrap_or(workbook.children.len());
        workbook.insert_child(index, views);
    }

    if let Some(views) = workbook.child_mut("bookViews") {
        for view in views.children_named_mut("workbookView") {
            view.set_attr("activeTab", active_index.to_string());
            if view.attr("firstSheet").is_some() {
                view.set_attr("firstSheet", "0");
            }
            view.remove_attr("visibility");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlsx::testing::{marriage_template, TEMPLATE_SHEETS};

    fn template() -> Package {
        Package::from_bytes(&marriage_template()).unwrap()
    }

    fn names(package: &Package) -> Vec<String> {
        sheets(package).unwrap().into_iter().map(|s| s.name).collect()
    }

    #[test]
    fn test_sheets_lists_template_in_order() {
        let package = template();
        assert_eq!(names(&package), TEMPLATE_SHEETS);
        assert_eq!(active_sheet(&package).unwrap().as_deref(), Some("CONSENT F"));
    }

    #[test]
    fn test_retain_removes_parts_and_relationships() {
        let mut package = template();
        let kept_part = sheet_part(&package, "ADVICE M&F").unwrap().unwrap();
        let dropped_part = sheet_part(&package, "CONSENT F").unwrap().unwrap();

        let removed =
            retain_sheets(&mut package, &["APPLICATION", "Notice", "ADVICE M&F"], "APPLICATION")
                .unwrap();

        assert_eq!(removed.len(), TEMPLATE_SHEETS.len() - 3);
        assert_eq!(names(&package), vec!["ADVICE M&F", "APPLICATION", "Notice"]);
        assert!(package.contains(&kept_part));
        assert!(!package.contains(&dropped_part));
        assert!(!package.contains(&rels::rels_part_name(&dropped_part)));

        let relationships = Relationships::load(&package, "xl/workbook.xml").unwrap();
        let worksheet_rels = relationships
            .iter()
            .filter(|r| r.rel_type == rels::WORKSHEET)
            .count();
        assert_eq!(worksheet_rels, 3);

        let content_types = ContentTypes::load(&package).unwrap();
        for entry in sheets(&package).unwrap() {
            assert!(content_types.override_for(&entry.part).is_some());
        }
        let gone = package
            .part_names()
            .filter(|p| p.starts_with("xl/worksheets/sheet"))
            .count();
        assert_eq!(gone, 3);
    }

    #[test]
    fn test_retain_sets_active_tab_and_selection() {
        let mut package = template();
        retain_sheets(&mut package, &["APPLICATION", "Notice"], "APPLICATION").unwrap();

        assert_eq!(active_sheet(&package).unwrap().as_deref(), Some("APPLICATION"));
        for entry in sheets(&package).unwrap() {
            let sheet = Worksheet::open(&package, &entry.part).unwrap();
            assert_eq!(sheet.is_tab_selected(), entry.name == "APPLICATION");
            assert!(!entry.hidden, "{} should be visible", entry.name);
        }
    }

    #[test]
    fn test_retain_reindexes_and_prunes_defined_names() {
        let mut package = template();
        retain_sheets(&mut package, &["APPLICATION", "Notice"], "APPLICATION").unwrap();

        let workbook = package.read_xml("xl/workbook.xml").unwrap();
        let defined: Vec<(Option<String>, String)> = workbook
            .root
            .child("definedNames")
            .unwrap()
            .children_named("definedName")
            .map(|n| (n.attr("localSheetId").map(str::to_string), n.text()))
            .collect();

        assert_eq!(
            defined,
            vec![(Some("0".to_string()), "APPLICATION!$A$1:$AH$40".to_string())]
        );
    }

    #[test]
    fn test_retain_drops_calc_chain() {
        let mut package = template();
        assert!(package.contains("xl/calcChain.xml"));
        retain_sheets(&mut package, &["APPLICATION", "Notice"], "APPLICATION").unwrap();

        assert!(!package.contains("xl/calcChain.xml"));
        let relationships = Relationships::load(&package, "xl/workbook.xml").unwrap();
        assert!(relationships.find_by_type(rels::CALC_CHAIN).is_none());
    }

    #[test]
    fn test_retain_requests_full_calculation_on_load() {
        let mut package = template();
        retain_sheets(&mut package, &["APPLICATION", "Notice"], "APPLICATION").unwrap();

        let workbook = package.read_xml("xl/workbook.xml").unwrap();
        let calc_pr = workbook.root.child("calcPr").unwrap();
        assert_eq!(calc_pr.attr("fullCalcOnLoad"), Some("1"));
        assert_eq!(calc_pr.attr("calcId"), Some("191029"));
    }

    #[test]
    fn test_full_calculation_creates_calc_pr_before_ext_lst() {
        let mut workbook = Element::new("workbook")
            .with_child(Element::new("sheets"))
            .with_child(Element::new("definedNames"))
            .with_child(Element::new("extLst"));
        request_full_calculation(&mut workbook);

        let order: Vec<&str> = workbook.elements().map(|e| e.local_name()).collect();
        assert_eq!(order, vec!["sheets", "definedNames", "calcPr", "extLst"]);
        assert_eq!(
            workbook.child("calcPr").unwrap().attr("fullCalcOnLoad"),
            Some("1")
        );
    }

    #[test]
    fn test_retain_requires_active_sheet_to_survive() {
        let mut package = template();
        let result = retain_sheets(&mut package, &["Notice"], "APPLICATION");
        assert!(matches!(result, Err(PackageError::MissingSheet(name)) if name == "APPLICATION"));
    }

    #[test]
    fn test_references_sheet_quoted_and_bare() {
        assert!(references_sheet("'CONSENT M&F'!$A$1:$H$40", "CONSENT M&F"));
        assert!(references_sheet("Notice!$A$1", "Notice"));
        assert!(!references_sheet("'ADVICE F-CONSENT M'!$A$1", "ADVICE F"));
        assert!(!references_sheet("MyNotice!$A$1", "Notice"));
    }
}
