//! OAI-PMH batch decoder using quick-xml
//!
//! A batch file is read and decoded whole. Harvest files are bounded in size,
//! so this keeps the decoder simple, but peak memory grows with the file:
//! a 100 MB batch needs roughly that much again for the decoded records.
//!
//! Elements are matched by local name, so `oai_dc:dc`, `dc:title` and
//! unprefixed dumps decode alike. Header and metadata are paired inside
//! each `<record>`; a record without exactly one of each fails the batch.

use std::path::Path;

use oaidex_core::gunzip_if_needed;
use quick_xml::Reader;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};

/// Provenance block of one record
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Header {
    /// Repository-assigned OAI identifier, e.g. `oai:arXiv.org:0704.0004`
    pub identifier: String,
    pub datestamp: String,
    pub set_spec: String,
    /// `status` attribute (`deleted` for tombstones)
    pub status: Option<String>,
}

/// Dublin Core payload of one record
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub creators: Vec<String>,
    pub subjects: Vec<String>,
    /// First entry is the abstract by convention; later ones are usually comments
    pub descriptions: Vec<String>,
    /// First `date` element (arXiv lists one per version)
    pub date: String,
    /// First `identifier` element, normally the abstract page URI
    pub source_identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub header: Header,
    pub metadata: Metadata,
}

impl Record {
    /// Durable identity of the record
    pub fn identifier(&self) -> &str {
        &self.header.identifier
    }
}

/// Decoded contents of one batch file, in document order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Batch {
    pub records: Vec<Record>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl IntoIterator for Batch {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Why a batch file could not be decoded
#[derive(Debug)]
pub enum DecodeError {
    /// File could not be read
    Io(std::io::Error),
    /// Gzip stream is corrupt
    Gzip(std::io::Error),
    /// Markup is not well-formed (or not UTF-8)
    Xml(String),
    /// Document ended inside an open element
    Truncated { element: &'static str },
    /// Some record does not hold exactly one header and one metadata block
    RecordMismatch {
        /// Zero-based position of the first offending record
        record: usize,
        headers: usize,
        metadata: usize,
    },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "read error: {e}"),
            Self::Gzip(e) => write!(f, "gzip error: {e}"),
            Self::Xml(msg) => write!(f, "XML parse error: {msg}"),
            Self::Truncated { element } => {
                write!(f, "document ends inside <{element}>")
            }
            Self::RecordMismatch {
                record,
                headers,
                metadata,
            } => write!(
                f,
                "{headers} headers vs {metadata} metadata blocks (first unpaired record at position {record})"
            ),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) | Self::Gzip(e) => Some(e),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for DecodeError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<AttrError> for DecodeError {
    fn from(e: AttrError) -> Self {
        xml_err(e)
    }
}

type Result<T> = std::result::Result<T, DecodeError>;

fn xml_err(e: impl std::fmt::Display) -> DecodeError {
    DecodeError::Xml(e.to_string())
}

/// Read and decode one batch file.
pub fn decode_file(path: &Path) -> Result<Batch> {
    let bytes = std::fs::read(path).map_err(DecodeError::Io)?;
    decode_batch(&bytes)
}

/// Decode file bytes, gunzipping first when they carry the gzip magic.
pub fn decode_batch(bytes: &[u8]) -> Result<Batch> {
    let xml = gunzip_if_needed(bytes).map_err(DecodeError::Gzip)?;
    decode_xml(&xml)
}

/// Decode an uncompressed OAI-PMH document.
///
/// Only `record` elements inside `ListRecords` count; a document without any
/// is an empty batch.
pub fn decode_xml(xml: &[u8]) -> Result<Batch> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut in_list = false;
    let mut headers = 0usize;
    let mut metadata = 0usize;
    let mut unpaired: Option<usize> = None;
    let mut position = 0usize;
    // Open elements outside of records; records are consumed whole
    let mut depth = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"ListRecords" => {
                    in_list = true;
                    depth += 1;
                }
                b"record" if in_list => {
                    let raw = parse_record(&mut reader)?;
                    headers += raw.headers.len();
                    metadata += raw.metadata.len();
                    match raw.pair() {
                        Some(record) => records.push(record),
                        None => {
                            unpaired.get_or_insert(position);
                        }
                    }
                    position += 1;
                }
                _ => depth += 1,
            },
            Event::Empty(e) if in_list && e.local_name().as_ref() == b"record" => {
                unpaired.get_or_insert(position);
                position += 1;
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"ListRecords" {
                    in_list = false;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof if depth > 0 => {
                let element = if in_list { "ListRecords" } else { "OAI-PMH" };
                return Err(DecodeError::Truncated { element });
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(record) = unpaired {
        return Err(DecodeError::RecordMismatch {
            record,
            headers,
            metadata,
        });
    }

    log::trace!("decoded {} records", records.len());
    Ok(Batch { records })
}

/// Everything found inside one `<record>`, before pairing
#[derive(Default)]
struct RawRecord {
    headers: Vec<Header>,
    metadata: Vec<Metadata>,
}

impl RawRecord {
    fn pair(mut self) -> Option<Record> {
        if self.headers.len() != 1 || self.metadata.len() != 1 {
            return None;
        }
        Some(Record {
            header: self.headers.pop()?,
            metadata: self.metadata.pop()?,
        })
    }
}

fn parse_record(reader: &mut Reader<&[u8]>) -> Result<RawRecord> {
    let mut raw = RawRecord::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"header" => {
                    let status = header_status(&e)?;
                    raw.headers.push(parse_header(reader, status)?);
                }
                b"metadata" => raw.metadata.push(parse_metadata(reader)?),
                _ => skip_element(reader)?,
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"header" => raw.headers.push(Header {
                    status: header_status(&e)?,
                    ..Header::default()
                }),
                b"metadata" => raw.metadata.push(Metadata::default()),
                _ => {}
            },
            Event::End(_) => break,
            Event::Eof => return Err(DecodeError::Truncated { element: "record" }),
            _ => {}
        }
        buf.clear();
    }

    Ok(raw)
}

fn header_status(e: &BytesStart<'_>) -> Result<Option<String>> {
    match e.try_get_attribute("status")? {
        Some(attr) => {
            let value = attr.unescape_value().map_err(xml_err)?;
            let value = value.trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
        None => Ok(None),
    }
}

fn parse_header(reader: &mut Reader<&[u8]>, status: Option<String>) -> Result<Header> {
    let mut header = Header {
        status,
        ..Header::default()
    };
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"identifier" => header.identifier = read_text(reader, "identifier")?,
                b"datestamp" => header.datestamp = read_text(reader, "datestamp")?,
                b"setSpec" => {
                    let spec = read_text(reader, "setSpec")?;
                    if header.set_spec.is_empty() {
                        header.set_spec = spec;
                    }
                }
                _ => skip_element(reader)?,
            },
            Event::End(_) => break,
            Event::Eof => return Err(DecodeError::Truncated { element: "header" }),
            _ => {}
        }
        buf.clear();
    }

    Ok(header)
}

/// Walks the whole metadata subtree; Dublin Core fields may sit under any
/// wrapper (`oai_dc:dc`, `oai_dc`, ...).
fn parse_metadata(reader: &mut Reader<&[u8]>) -> Result<Metadata> {
    let mut meta = Metadata::default();
    let mut depth = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"title" => {
                    let title = read_text(reader, "title")?;
                    if meta.title.is_empty() {
                        meta.title = title;
                    }
                }
                b"creator" => push_non_empty(&mut meta.creators, read_text(reader, "creator")?),
                b"subject" => push_non_empty(&mut meta.subjects, read_text(reader, "subject")?),
                b"description" => {
                    push_non_empty(&mut meta.descriptions, read_text(reader, "description")?)
                }
                b"date" => {
                    let date = read_text(reader, "date")?;
                    if meta.date.is_empty() {
                        meta.date = date;
                    }
                }
                b"identifier" => {
                    let id = read_text(reader, "identifier")?;
                    if meta.source_identifier.is_empty() {
                        meta.source_identifier = id;
                    }
                }
                _ => depth += 1,
            },
            Event::End(_) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => return Err(DecodeError::Truncated { element: "metadata" }),
            _ => {}
        }
        buf.clear();
    }

    Ok(meta)
}

fn push_non_empty(list: &mut Vec<String>, value: String) {
    if !value.is_empty() {
        list.push(value);
    }
}

/// Text of the current element, with nested inline markup flattened.
fn read_text(reader: &mut Reader<&[u8]>, element: &'static str) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => append_piece(&mut text, &e.unescape().map_err(xml_err)?),
            Event::CData(e) => append_piece(&mut text, &String::from_utf8_lossy(&e.into_inner())),
            Event::Start(_) => {
                let nested = read_text(reader, element)?;
                append_piece(&mut text, &nested);
            }
            Event::End(_) => break,
            Event::Eof => return Err(DecodeError::Truncated { element }),
            _ => {}
        }
        buf.clear();
    }

    Ok(text.trim().to_string())
}

// trim_text strips whitespace at markup boundaries, so put one back
fn append_piece(text: &mut String, piece: &str) {
    let piece = piece.trim();
    if piece.is_empty() {
        return;
    }
    if !text.is_empty() {
        text.push(' ');
    }
    text.push_str(piece);
}

/// Consume an element we do not care about, including its children.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<()> {
    let mut buf = Vec::new();
    let mut depth = 1usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => return Err(DecodeError::Truncated { element: "record" }),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}
