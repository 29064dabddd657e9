use crate::error::{CritmarkError, Result};
use crate::xml::XmlDocument;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::read::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const COMMENTS_PART: &str = "word/comments.xml";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

/// A packaged rendered document: every archive entry loaded into memory,
/// keyed by its entry name.
pub struct OoxmlPackage {
    name: String,
    parts: HashMap<String, Vec<u8>>,
}

impl OoxmlPackage {
    /// Open a package from bytes. `name` identifies the package in errors.
    pub fn open(bytes: &[u8], name: &str) -> Result<Self> {
        let invalid = |message: String| CritmarkError::InvalidPackage {
            file: name.to_string(),
            message,
        };

        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| invalid(e.to_string()))?;
        let mut parts = HashMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(|e| invalid(e.to_string()))?;
            if file.is_dir() {
                continue;
            }
            let entry = file.name().to_string();
            let mut content = Vec::new();
            file.read_to_end(&mut content)
                .map_err(|e| invalid(format!("{}: {}", entry, e)))?;
            parts.insert(entry, content);
        }

        Ok(Self {
            name: name.to_string(),
            parts,
        })
    }

    pub fn open_path(path: &Path) -> Result<Self> {
        let name = path.display().to_string();
        let bytes = std::fs::read(path).map_err(|e| CritmarkError::InvalidPackage {
            file: name.clone(),
            message: e.to_string(),
        })?;
        Self::open(&bytes, &name)
    }

    /// Build a package from `(entry name, content)` pairs. A content-types
    /// part is added when the caller does not supply one.
    pub fn from_parts(name: &str, entries: &[(&str, &str)]) -> Result<Self> {
        let bytes = zip_parts(entries)?;
        Self::open(&bytes, name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_part(&self, path: &str) -> Option<&[u8]> {
        self.parts.get(path).map(|v| v.as_slice())
    }

    /// Read a part as UTF-8 text. A missing part is `Ok(None)`.
    pub fn get_text_part(&self, path: &str) -> Result<Option<String>> {
        let Some(bytes) = self.get_part(path) else {
            return Ok(None);
        };
        let text = std::str::from_utf8(bytes).map_err(|e| CritmarkError::InvalidPackage {
            file: self.name.clone(),
            message: format!("{} is not valid UTF-8: {}", path, e),
        })?;
        Ok(Some(text.trim_start_matches('\u{FEFF}').to_string()))
    }

    pub fn get_xml_part(&self, path: &str) -> Result<Option<XmlDocument>> {
        match self.get_text_part(path)? {
            Some(text) => Ok(Some(crate::xml::parser::parse_part(&text, path)?)),
            None => Ok(None),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &String> {
        self.parts.keys()
    }
}

/// Zip `(entry name, content)` pairs into a package archive.
pub fn zip_parts(entries: &[(&str, &str)]) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut buffer);
        let options = || SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        if !entries.iter().any(|(path, _)| *path == "[Content_Types].xml") {
            writer.start_file("[Content_Types].xml", options())?;
            writer.write_all(CONTENT_TYPES.as_bytes())?;
        }
        for (path, content) in entries {
            writer.start_file(*path, options())?;
            writer.write_all(content.as_bytes())?;
        }
        writer.finish()?;
    }
    Ok(buffer.into_inner())
}
