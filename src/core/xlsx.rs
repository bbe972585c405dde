//! Minimal reader for the first worksheet of an `.xlsx` workbook.
//!
//! Only cell values are read: styles, formulas and number formats are ignored.
//! Formula cells contribute their cached result.

use crate::core::table::{RawCell, RawSheet};
use anyhow::{Context, Result, bail};
use quick_xml::Reader as XmlReader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;
use zip::result::ZipError;

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const DEFAULT_SHEET: &str = "xl/worksheets/sheet1.xml";

pub fn read_first_sheet(bytes: &[u8]) -> Result<RawSheet> {
    let mut zip = ZipArchive::new(Cursor::new(bytes)).with_context(|| "failed to read xlsx zip")?;

    let workbook = read_entry(&mut zip, WORKBOOK)?
        .with_context(|| format!("missing {}", WORKBOOK))?;
    let sheet_path = match (
        first_sheet_rid(&workbook)?,
        read_entry(&mut zip, WORKBOOK_RELS)?,
    ) {
        (Some(rid), Some(rels)) => {
            let targets = relationship_targets(&rels)?;
            let target = targets
                .get(&rid)
                .with_context(|| format!("workbook relationship {} not found", rid))?;
            resolve_target(target)
        }
        _ => DEFAULT_SHEET.to_string(),
    };

    let shared = match read_entry(&mut zip, SHARED_STRINGS)? {
        Some(xml) => shared_strings(&xml)?,
        None => Vec::new(),
    };
    let sheet_xml = read_entry(&mut zip, &sheet_path)?
        .with_context(|| format!("missing worksheet {}", sheet_path))?;
    parse_sheet(&sheet_xml, &shared)
}

fn read_entry(zip: &mut Archive<'_>, name: &str) -> Result<Option<String>> {
    let mut file = match zip.by_name(name) {
        Ok(f) => f,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("failed to open zip entry {}", name)),
    };
    let mut out = String::new();
    file.read_to_string(&mut out)
        .with_context(|| format!("failed to read zip entry {}", name))?;
    Ok(Some(out))
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    match e.try_get_attribute(name)? {
        Some(a) => Ok(Some(a.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// The relationship id of the first `<sheet>` in workbook order.
fn first_sheet_rid(xml: &str) -> Result<Option<String>> {
    let mut reader = XmlReader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                for a in e.attributes() {
                    let a = a?;
                    if a.key.prefix().is_some() && a.key.local_name().as_ref() == b"id" {
                        return Ok(Some(a.unescape_value()?.into_owned()));
                    }
                }
                return Ok(None);
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn relationship_targets(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = XmlReader::from_str(xml);
    let mut out = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id")?, attr(&e, b"Target")?) {
                    out.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(abs) => abs.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

fn shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = XmlReader::from_str(xml);
    let mut out = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    // Phonetic runs repeat the text in another script.
    let mut in_phonetic = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => out.push(String::new()),
            Event::Text(t) if in_t && !in_phonetic => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => out.push(current.take().unwrap_or_default()),
                b"t" => in_t = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/// Worksheet limits: columns `A` through `XFD`, rows 1 through 1048576.
const MAX_COLUMNS: usize = 16_384;
const MAX_ROWS: usize = 1_048_576;

/// Zero-based column index of an A1-style reference.
fn column_index(cell_ref: &str) -> Result<Option<usize>> {
    let mut col = 0usize;
    let mut seen = false;
    for ch in cell_ref.chars() {
        if !ch.is_ascii_alphabetic() {
            break;
        }
        let digit = ch.to_ascii_uppercase() as usize - 'A' as usize + 1;
        col = match col.checked_mul(26).and_then(|c| c.checked_add(digit)) {
            Some(c) if c <= MAX_COLUMNS => c,
            _ => bail!("cell reference {} is past column XFD", cell_ref),
        };
        seen = true;
    }
    Ok(if seen { Some(col - 1) } else { None })
}

struct PendingCell {
    col: usize,
    kind: Option<String>,
    text: String,
}

impl PendingCell {
    fn finish(self, shared: &[String]) -> RawCell {
        let text = self.text;
        match self.kind.as_deref() {
            Some("s") => match text.trim().parse::<usize>().ok().and_then(|i| shared.get(i)) {
                Some(s) => RawCell::Text(s.clone()),
                None => RawCell::Error(format!("#SST{}", text.trim())),
            },
            Some("inlineStr") | Some("str") => RawCell::Text(text),
            Some("b") => RawCell::Bool(text.trim() == "1"),
            Some("e") => RawCell::Error(text),
            _ => {
                let t = text.trim();
                if t.is_empty() {
                    RawCell::Empty
                } else {
                    match t.parse::<f64>() {
                        Ok(v) => RawCell::Number(v),
                        Err(_) => RawCell::Text(text),
                    }
                }
            }
        }
    }
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<RawSheet> {
    let mut reader = XmlReader::from_str(xml);
    let mut sheet = RawSheet::default();
    let mut row: Option<usize> = None;
    let mut next_col = 0usize;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    let mut in_data = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sheetData" => in_data = true,
                b"row" if in_data => {
                    row = Some(row_index(&e, row)?);
                    next_col = 0;
                }
                b"c" if in_data => {
                    let col = cell_column(&e, next_col)?;
                    next_col = col + 1;
                    cell = Some(PendingCell {
                        col,
                        kind: attr(&e, b"t")?,
                        text: String::new(),
                    });
                }
                // <v> for stored values, <t> inside <is> for inline strings.
                b"rPh" => in_phonetic = true,
                b"v" | b"t" if cell.is_some() && !in_phonetic => in_value = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" if in_data => {
                    row = Some(row_index(&e, row)?);
                    next_col = 0;
                }
                b"c" if in_data => {
                    next_col = cell_column(&e, next_col)? + 1;
                }
                _ => {}
            },
            Event::Text(t) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.text.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"rPh" => in_phonetic = false,
                b"c" => {
                    if let (Some(c), Some(r)) = (cell.take(), row) {
                        let col = c.col;
                        let value = c.finish(shared);
                        if value != RawCell::Empty {
                            sheet.put(r, col, value);
                        }
                    }
                }
                b"sheetData" => in_data = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if sheet.rows.is_empty() {
        bail!("worksheet has no cells");
    }
    Ok(sheet)
}

fn row_index(e: &BytesStart<'_>, prev: Option<usize>) -> Result<usize> {
    let fallback = prev.map(|r| r + 1).unwrap_or(0);
    let row = match attr(e, b"r")? {
        Some(r) => r
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .unwrap_or(fallback),
        None => fallback,
    };
    if row >= MAX_ROWS {
        bail!("row {} is past the last worksheet row", row + 1);
    }
    Ok(row)
}

fn cell_column(e: &BytesStart<'_>, next: usize) -> Result<usize> {
    let col = match attr(e, b"r")? {
        Some(r) => column_index(&r)?,
        None => None,
    };
    Ok(col.unwrap_or(next))
}
