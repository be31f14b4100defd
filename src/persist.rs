//! Saving and loading the sparse cell set.
//!
//! Only cells that differ from the default (non-empty text or a colour) are
//! written. The XML encoding is the native format:
//!
//! ```xml
//! <Spreadsheet>
//!   <Cells>
//!     <Cell Col="0" Row="0"><Text>foo</Text><BGColor>4294901760</BGColor></Cell>
//!   </Cells>
//! </Spreadsheet>
//! ```
//!
//! Every entry carries both `Text` and `BGColor`. Text is written and read
//! verbatim, surrounding whitespace included. The JSON encoding carries the
//! same schema through serde.

use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use log::{debug, warn};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::spreadsheet::Spreadsheet;

/// Encoding of a saved spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Xml,
    Json,
}

impl Format {
    /// `.json` files are JSON; everything else is XML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Xml,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "Cells")]
    pub cells: CellList,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellList {
    #[serde(rename = "Cell", default)]
    pub entries: Vec<CellEntry>,
}

/// One non-default cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellEntry {
    #[serde(rename = "Col")]
    pub col: usize,
    #[serde(rename = "Row")]
    pub row: usize,
    #[serde(rename = "Text", default)]
    pub text: String,
    #[serde(rename = "BGColor")]
    pub bg_color: u32,
}

impl Document {
    /// Snapshot the non-default cells of `sheet` in row-major order.
    pub fn from_sheet(sheet: &Spreadsheet) -> Self {
        let entries = sheet
            .cells()
            .filter(|cell| !cell.is_default())
            .map(|cell| CellEntry {
                col: cell.column(),
                row: cell.row(),
                text: cell.text().to_string(),
                bg_color: cell.bg_color(),
            })
            .collect();
        Self {
            cells: CellList { entries },
        }
    }

    pub fn decode(source: &str, format: Format) -> Result<Self> {
        match format {
            Format::Xml => read_xml(source),
            Format::Json => Ok(serde_json::from_str(source)?),
        }
    }

    pub fn encode(&self, format: Format) -> Result<String> {
        match format {
            Format::Xml => write_xml(self),
            Format::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

fn write_xml(document: &Document) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Start(BytesStart::new("Spreadsheet")))?;
    writer.write_event(Event::Start(BytesStart::new("Cells")))?;
    for entry in &document.cells.entries {
        let mut cell = BytesStart::new("Cell");
        cell.push_attribute(("Col", entry.col.to_string().as_str()));
        cell.push_attribute(("Row", entry.row.to_string().as_str()));
        writer.write_event(Event::Start(cell))?;
        write_text_element(&mut writer, "Text", &entry.text)?;
        write_text_element(&mut writer, "BGColor", &entry.bg_color.to_string())?;
        writer.write_event(Event::End(BytesEnd::new("Cell")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Cells")))?;
    writer.write_event(Event::End(BytesEnd::new("Spreadsheet")))?;
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Text,
    BgColor,
}

/// A `<Cell>` whose children are still being read.
struct PendingEntry {
    col: usize,
    row: usize,
    text: String,
    bg_color: Option<String>,
}

impl PendingEntry {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let (mut col, mut row) = (None, None);
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::InvalidAttr)?;
            let value = attr.unescape_value()?;
            match attr.key.as_ref() {
                b"Col" => col = Some(parse_number(&value, "Col")?),
                b"Row" => row = Some(parse_number(&value, "Row")?),
                _ => {}
            }
        }
        match (col, row) {
            (Some(col), Some(row)) => Ok(Self {
                col,
                row,
                text: String::new(),
                bg_color: None,
            }),
            _ => Err(EngineError::Malformed(
                "<Cell> needs Col and Row attributes".to_string(),
            )),
        }
    }

    fn push(&mut self, field: Field, chunk: &str) {
        match field {
            Field::Text => self.text.push_str(chunk),
            Field::BgColor => self.bg_color.get_or_insert_with(String::new).push_str(chunk),
        }
    }

    fn finish(self) -> Result<CellEntry> {
        let raw = self.bg_color.ok_or_else(|| {
            EngineError::Malformed(format!("cell ({}, {}) has no BGColor", self.col, self.row))
        })?;
        Ok(CellEntry {
            col: self.col,
            row: self.row,
            text: self.text,
            bg_color: parse_number(&raw, "BGColor")?,
        })
    }
}

fn parse_number<T: FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| EngineError::Malformed(format!("{} is not a number: {:?}", what, raw)))
}

fn read_xml(source: &str) -> Result<Document> {
    let mut reader = Reader::from_str(source);
    reader.trim_text(false); // cell text keeps its surrounding whitespace

    let mut entries = Vec::new();
    let mut pending: Option<PendingEntry> = None;
    let mut field: Option<Field> = None;
    let mut saw_root = false;
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                match e.name().as_ref() {
                    b"Spreadsheet" if depth == 1 => saw_root = true,
                    b"Cell" => pending = Some(PendingEntry::from_start(&e)?),
                    b"Text" if pending.is_some() => field = Some(Field::Text),
                    b"BGColor" if pending.is_some() => field = Some(Field::BgColor),
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if depth == 0 && e.name().as_ref() == b"Spreadsheet" {
                    saw_root = true;
                } else if e.name().as_ref() == b"Cell" {
                    entries.push(PendingEntry::from_start(&e)?.finish()?);
                }
            }
            Event::Text(e) => {
                if let (Some(entry), Some(field)) = (pending.as_mut(), field) {
                    entry.push(field, &e.unescape()?);
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                match e.name().as_ref() {
                    b"Cell" => {
                        if let Some(entry) = pending.take() {
                            entries.push(entry.finish()?);
                        }
                    }
                    b"Text" | b"BGColor" => field = None,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(EngineError::Malformed("missing <Spreadsheet> root".to_string()));
    }
    if depth != 0 {
        return Err(EngineError::Malformed("document ends inside an element".to_string()));
    }
    Ok(Document {
        cells: CellList { entries },
    })
}

/// Write every non-default cell of `sheet` to `writer`.
pub fn save<W: Write>(sheet: &Spreadsheet, mut writer: W, format: Format) -> Result<()> {
    let document = Document::from_sheet(sheet);
    let encoded = document.encode(format)?;
    writer.write_all(encoded.as_bytes())?;
    writer.flush()?;
    debug!("saved {} cell(s) as {:?}", document.cells.entries.len(), format);
    Ok(())
}

/// Replace the contents of `sheet` with the document read from `reader`.
///
/// The document is decoded and checked against the grid before anything is
/// changed, so a failed load leaves the spreadsheet untouched. On success the
/// undo/redo history is cleared.
pub fn load<R: Read>(sheet: &mut Spreadsheet, mut reader: R, format: Format) -> Result<()> {
    let mut source = String::new();
    reader.read_to_string(&mut source)?;
    let document = Document::decode(&source, format)?;

    if let Some(entry) = document
        .cells
        .entries
        .iter()
        .find(|entry| sheet.get_cell(entry.col, entry.row).is_none())
    {
        warn!("rejecting document: entry ({}, {}) is off the grid", entry.col, entry.row);
        return Err(EngineError::OutOfRange {
            col: entry.col,
            row: entry.row,
            columns: sheet.column_count(),
            rows: sheet.row_count(),
        });
    }

    sheet.clear();
    for entry in &document.cells.entries {
        sheet.set_text(entry.col, entry.row, &entry.text)?;
        sheet.set_bg_color(entry.col, entry.row, entry.bg_color)?;
    }
    sheet.reset_history();
    debug!("loaded {} cell(s) from {:?}", document.cells.entries.len(), format);
    Ok(())
}

impl Spreadsheet {
    pub fn save_to<W: Write>(&self, writer: W, format: Format) -> Result<()> {
        save(self, writer, format)
    }

    pub fn load_from<R: Read>(&mut self, reader: R, format: Format) -> Result<()> {
        load(self, reader, format)
    }
}
