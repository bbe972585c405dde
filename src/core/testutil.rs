use anyhow::Result;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ani_heatmap_{}_{}", tag, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn col_name(mut col: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    out.reverse();
    String::from_utf8(out).unwrap()
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Builds a one-sheet workbook. Cells that parse as numbers are stored as
/// numbers, other non-empty cells as inline strings.
pub fn xlsx_bytes(rows: &[Vec<&str>]) -> Result<Vec<u8>> {
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        sheet.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let cell_ref = format!("{}{}", col_name(c), r + 1);
            if value.parse::<f64>().is_ok() {
                sheet.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", cell_ref, value));
            } else {
                sheet.push_str(&format!(
                    "<c r=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                    cell_ref,
                    escape(value)
                ));
            }
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let workbook = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="ANI" sheetId="1" r:id="rId7"/></sheets></workbook>"#;
    let rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/ani.xml"/></Relationships>"#;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(workbook.as_bytes())?;
    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(rels.as_bytes())?;
    zip.start_file("xl/worksheets/ani.xml", options)?;
    zip.write_all(sheet.as_bytes())?;
    Ok(zip.finish()?.into_inner())
}

pub fn write_xlsx(path: &Path, rows: &[Vec<&str>]) -> Result<()> {
    std::fs::write(path, xlsx_bytes(rows)?)?;
    Ok(())
}

/// A symmetric n×n ANI workbook with labels `G1..Gn`.
pub fn write_ani_xlsx(path: &Path, n: usize) -> Result<()> {
    let labels: Vec<String> = (1..=n).map(|i| format!("G{}", i)).collect();
    let values: Vec<Vec<String>> = (0..n)
        .map(|r| {
            (0..n)
                .map(|c| {
                    if r == c {
                        "100".to_string()
                    } else {
                        format!("{:.2}", 95.0 + (r + c) as f64 * 0.37 % 5.0)
                    }
                })
                .collect()
        })
        .collect();
    let mut rows: Vec<Vec<&str>> = Vec::with_capacity(n + 1);
    let mut header = vec![""];
    header.extend(labels.iter().map(String::as_str));
    rows.push(header);
    for (label, row) in labels.iter().zip(&values) {
        let mut line = vec![label.as_str()];
        line.extend(row.iter().map(String::as_str));
        rows.push(line);
    }
    write_xlsx(path, &rows)
}
