use crate::core::table::{RawCell, RawSheet};
use anyhow::{Context, Result};

/// Reads delimited text into raw cells. Rows may differ in length; quoted
/// fields may contain the delimiter or line breaks.
pub fn read_table(bytes: &[u8], delimiter: u8) -> Result<RawSheet> {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut sheet = RawSheet::default();
    for (i, result) in rdr.byte_records().enumerate() {
        let record = result.with_context(|| format!("malformed record {}", i + 1))?;
        sheet
            .rows
            .push(record.iter().map(|f| cell(&String::from_utf8_lossy(f))).collect());
    }
    Ok(sheet)
}

fn cell(field: &str) -> RawCell {
    let t = field.trim();
    if t.is_empty() {
        RawCell::Empty
    } else {
        match t.parse::<f64>() {
            Ok(v) => RawCell::Number(v),
            Err(_) => RawCell::Text(t.to_string()),
        }
    }
}
