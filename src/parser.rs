// 🏗️ Parser Framework - one reader per source format
// CSV (semicolon), JSON (array of objects), XML (nested user/children/child)

use crate::error::{RecordsError, Result};
use crate::normalizer::CREATED_AT_FORMAT;
use chrono::DateTime;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceFormat - which reader handles a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    Csv,
    Json,
    Xml,
}

impl SourceFormat {
    /// Human-readable name for logs
    pub fn name(&self) -> &str {
        match self {
            SourceFormat::Csv => "CSV",
            SourceFormat::Json => "JSON",
            SourceFormat::Xml => "XML",
        }
    }
}

/// One child as found in a nested source (JSON objects, XML `child` elements)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChild {
    pub name: Option<String>,
    pub age: Option<String>,
}

/// The `children` field of a source row.
///
/// XML and JSON sources nest child records, CSV packs them into a single
/// comma-delimited string like `"Jackie (9),Mitchell (6)"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildrenField {
    #[default]
    Absent,
    Nested(Vec<RawChild>),
    Delimited(String),
}

/// RawRecord - one parsed input row before normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    // Account fields (any of them may be missing in the source)
    pub firstname: Option<String>,
    pub telephone_number: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub created_at: Option<String>,
    pub children: ChildrenField,

    // Provenance
    pub source_format: SourceFormat,
    pub source_file: String,
    pub line_number: usize,
}

impl RawRecord {
    /// Create an empty record for a given source position
    pub fn new(source_format: SourceFormat, source_file: String, line_number: usize) -> Self {
        RawRecord {
            firstname: None,
            telephone_number: None,
            email: None,
            password: None,
            role: None,
            created_at: None,
            children: ChildrenField::Absent,
            source_format,
            source_file,
            line_number,
        }
    }

    /// Set an account field by its source column/tag name.
    ///
    /// Returns false for names that are not account fields; callers ignore
    /// those. Blank values count as missing.
    pub fn set_field(&mut self, name: &str, value: Option<String>) -> bool {
        let value = value.filter(|v| !v.trim().is_empty());
        let slot = match name {
            "firstname" => &mut self.firstname,
            "telephone_number" => &mut self.telephone_number,
            "email" => &mut self.email,
            "password" => &mut self.password,
            "role" => &mut self.role,
            "created_at" => &mut self.created_at,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Builder pattern: attach children
    pub fn with_children(mut self, children: ChildrenField) -> Self {
        self.children = children;
        self
    }
}

// ============================================================================
// PARSER TRAIT
// ============================================================================

/// RecordParser - turns one file into raw records
pub trait RecordParser: Send + Sync {
    /// Parse a file; a malformed file fails the whole call
    fn parse(&self, file_path: &Path) -> Result<Vec<RawRecord>>;

    /// Get the format this parser handles
    fn source_format(&self) -> SourceFormat;
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Detect the source format from the file extension.
///
/// Returns `None` for anything that is not `.csv`, `.json` or `.xml`; such
/// files are skipped by ingestion.
pub fn detect_format(file_path: &Path) -> Option<SourceFormat> {
    let extension = file_path.extension()?.to_str()?.to_ascii_lowercase();

    match extension.as_str() {
        "csv" => Some(SourceFormat::Csv),
        "json" => Some(SourceFormat::Json),
        "xml" => Some(SourceFormat::Xml),
        _ => None,
    }
}

/// Get the parser for a source format
pub fn get_parser(source_format: SourceFormat) -> Box<dyn RecordParser> {
    match source_format {
        SourceFormat::Csv => Box::new(CsvParser::new()),
        SourceFormat::Json => Box::new(JsonParser::new()),
        SourceFormat::Xml => Box::new(XmlParser::new()),
    }
}

fn file_name(file_path: &Path) -> String {
    file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

// ============================================================================
// CSV
// ============================================================================

/// Semicolon-delimited CSV with a header row
pub struct CsvParser;

impl CsvParser {
    pub fn new() -> Self {
        CsvParser
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordParser for CsvParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<RawRecord>> {
        use csv::ReaderBuilder;

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| RecordsError::parse(file_path, e))?
            .clone();

        let filename = file_name(file_path);
        let mut records = Vec::new();

        for (line_num, result) in reader.records().enumerate() {
            let row = result.map_err(|e| {
                RecordsError::parse(file_path, format!("line {}: {}", line_num + 2, e))
            })?;

            // Short rows leave trailing columns missing; long rows are malformed
            if row.len() > headers.len() {
                return Err(RecordsError::parse(
                    file_path,
                    format!(
                        "line {}: {} fields, but the header has {}",
                        line_num + 2,
                        row.len(),
                        headers.len()
                    ),
                ));
            }

            // +2 because: 1-indexed + header row
            let mut record = RawRecord::new(SourceFormat::Csv, filename.clone(), line_num + 2);

            for (column, value) in headers.iter().zip(row.iter()) {
                let column = column.trim();
                if column == "children" {
                    if !value.trim().is_empty() {
                        record.children = ChildrenField::Delimited(value.to_string());
                    }
                } else {
                    record.set_field(column, Some(value.to_string()));
                }
            }

            records.push(record);
        }

        Ok(records)
    }

    fn source_format(&self) -> SourceFormat {
        SourceFormat::Csv
    }
}

// ============================================================================
// JSON
// ============================================================================

/// JSON document holding an array of account objects
pub struct JsonParser;

/// Epoch values above this are milliseconds rather than seconds
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

impl JsonParser {
    pub fn new() -> Self {
        JsonParser
    }

    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Numeric timestamps are Unix epoch seconds, or milliseconds when huge
    fn created_at(value: &Value) -> Option<String> {
        let Value::Number(number) = value else {
            return Self::scalar(value);
        };

        let millis = match number.as_i64() {
            Some(raw) if raw.abs() > EPOCH_MILLIS_THRESHOLD => Some(raw),
            Some(raw) => raw.checked_mul(1000),
            None => number.as_f64().map(|raw| {
                let millis = if raw.abs() > EPOCH_MILLIS_THRESHOLD as f64 {
                    raw
                } else {
                    raw * 1000.0
                };
                millis.round() as i64
            }),
        };

        millis
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.format(CREATED_AT_FORMAT).to_string())
            .or_else(|| Self::scalar(value))
    }

    fn children(file_path: &Path, value: &Value) -> Result<ChildrenField> {
        match value {
            Value::Null => Ok(ChildrenField::Absent),
            Value::String(s) if s.trim().is_empty() => Ok(ChildrenField::Absent),
            Value::String(s) => Ok(ChildrenField::Delimited(s.clone())),
            Value::Array(items) => {
                let mut children = Vec::with_capacity(items.len());
                for item in items {
                    let object = item.as_object().ok_or_else(|| {
                        RecordsError::parse(file_path, "child entry is not an object")
                    })?;
                    children.push(RawChild {
                        name: object.get("name").and_then(Self::scalar),
                        age: object.get("age").and_then(Self::scalar),
                    });
                }
                Ok(ChildrenField::Nested(children))
            }
            _ => Err(RecordsError::parse(
                file_path,
                "'children' must be an array, a string or null",
            )),
        }
    }
}

impl Default for JsonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordParser for JsonParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<RawRecord>> {
        let file = File::open(file_path)?;
        let json: Value = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| RecordsError::parse(file_path, e))?;

        let items = json
            .as_array()
            .ok_or_else(|| RecordsError::parse(file_path, "expected a top-level array"))?;

        let filename = file_name(file_path);
        let mut records = Vec::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            let object = item.as_object().ok_or_else(|| {
                RecordsError::parse(file_path, format!("entry {} is not an object", idx + 1))
            })?;

            let mut record = RawRecord::new(SourceFormat::Json, filename.clone(), idx + 1);

            for (key, value) in object {
                match key.as_str() {
                    "children" => record.children = Self::children(file_path, value)?,
                    "created_at" => {
                        record.set_field(key, Self::created_at(value));
                    }
                    _ => {
                        record.set_field(key, Self::scalar(value));
                    }
                }
            }

            records.push(record);
        }

        Ok(records)
    }

    fn source_format(&self) -> SourceFormat {
        SourceFormat::Json
    }
}

// ============================================================================
// XML
// ============================================================================

/// Minimal element tree built from quick-xml events
#[derive(Debug, Default)]
struct XmlElement {
    tag: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn text(&self) -> Option<String> {
        let text = self.text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    fn attribute(&self, key: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Depth-first walk over every descendant (self excluded)
    fn descendants(&self) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        for child in &self.children {
            out.push(child);
            out.extend(child.descendants());
        }
        out
    }

    fn find_descendant(&self, tag: &str) -> Option<&XmlElement> {
        self.descendants().into_iter().find(|e| e.tag == tag)
    }
}

/// `users.xml`-style documents: every `user` element is one account
pub struct XmlParser;

/// Tags that describe nested children, never account fields
const XML_SKIPPED_TAGS: [&str; 4] = ["user", "age", "name", "child"];

impl XmlParser {
    pub fn new() -> Self {
        XmlParser
    }

    fn build_tree(file_path: &Path, content: &str) -> Result<XmlElement> {
        fn open(file_path: &Path, e: &BytesStart) -> Result<XmlElement> {
            let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
            let mut attributes = Vec::new();
            for attr in e.attributes() {
                let attr = attr.map_err(|err| RecordsError::parse(file_path, err))?;
                let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map_err(|err| RecordsError::parse(file_path, err))?;
                attributes.push((key, value.into_owned()));
            }
            Ok(XmlElement {
                tag,
                attributes,
                ..XmlElement::default()
            })
        }

        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| RecordsError::parse(file_path, e))?;

            match event {
                Event::Start(e) => stack.push(open(file_path, &e)?),
                Event::Empty(e) => {
                    let element = open(file_path, &e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(|e| RecordsError::parse(file_path, e))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Event::CData(c) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| RecordsError::parse(file_path, "unexpected closing tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(RecordsError::parse(file_path, "unexpected end of document"));
        }

        root.ok_or_else(|| RecordsError::parse(file_path, "document has no root element"))
    }

    fn children(user: &XmlElement) -> ChildrenField {
        let Some(container) = user.find_descendant("children") else {
            return ChildrenField::Nested(Vec::new());
        };

        let children = container
            .descendants()
            .into_iter()
            .filter(|e| e.tag == "child")
            .map(|child| {
                let mut raw = RawChild::default();
                for field in &child.children {
                    match field.tag.as_str() {
                        "name" => raw.name = field.text(),
                        "age" => raw.age = field.text(),
                        _ => {}
                    }
                }
                // <child name=".." age=".."/> form
                raw.name = raw.name.or_else(|| child.attribute("name"));
                raw.age = raw.age.or_else(|| child.attribute("age"));
                raw
            })
            .collect();

        ChildrenField::Nested(children)
    }
}

impl Default for XmlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordParser for XmlParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<RawRecord>> {
        let content = std::fs::read_to_string(file_path)?;
        let root = Self::build_tree(file_path, &content)?;

        let filename = file_name(file_path);
        let mut records = Vec::new();

        for (idx, user) in root
            .descendants()
            .into_iter()
            .filter(|e| e.tag == "user")
            .enumerate()
        {
            let mut record = RawRecord::new(SourceFormat::Xml, filename.clone(), idx + 1);

            for element in user.descendants() {
                if XML_SKIPPED_TAGS.contains(&element.tag.as_str()) {
                    continue;
                }
                record.set_field(&element.tag, element.text());
            }

            records.push(record.with_children(Self::children(user)));
        }

        Ok(records)
    }

    fn source_format(&self) -> SourceFormat {
        SourceFormat::Xml
    }
}

// ============================================================================
// TESTS
// ============================================================================
