//! Zip container holding the parts of a spreadsheet package.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::xml::XmlDocument;
use super::PackageError;

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
}

/// In-memory working copy of a package. Part order is preserved on write so the
/// output zip lists entries the way the template did; new parts go at the end.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<Part>,
}

impl Package {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PackageError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            parts.push(Part { name, data });
        }

        Ok(Package { parts })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PackageError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for part in &self.parts {
            zip.start_file(part.name.as_str(), options)?;
            zip.write_all(&part.data)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    #[cfg(test)]
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    /// Inserts a part, replacing the content of an existing part with that name.
    pub fn put(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.parts.len();
        self.parts.retain(|p| p.name != name);
        self.parts.len() != before
    }

    pub fn read_xml(&self, name: &str) -> Result<XmlDocument, PackageError> {
        self.read_xml_opt(name)?
            .ok_or_else(|| PackageError::MissingPart(name.to_string()))
    }

    pub fn read_xml_opt(&self, name: &str) -> Result<Option<XmlDocument>, PackageError> {
        self.get(name)
            .map(|bytes| XmlDocument::parse(name, bytes))
            .transpose()
    }

    pub fn write_xml(&mut self, name: &str, doc: &XmlDocument) -> Result<(), PackageError> {
        let bytes = doc.to_bytes()?;
        self.put(name, bytes);
        Ok(())
    }

    /// First free name of the form `{stem}{n}.{extension}`, counting from 1.
    pub fn unique_name(&self, stem: &str, extension: &str) -> String {
        (1..)
            .map(|n| format!("{stem}{n}.{extension}"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| format!("{stem}.{extension}"))
    }
}
