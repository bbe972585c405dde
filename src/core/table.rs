use crate::core::delimited;
use crate::core::io::{InputBytes, InputKind, detect_input_kind};
use crate::core::model::{Grid, SimilarityMatrix};
use crate::core::xlsx;
use anyhow::{Context, Result, bail};
use std::path::Path;

/// One spreadsheet cell before numeric coercion.
#[derive(Clone, Debug, PartialEq)]
pub enum RawCell {
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
    Error(String),
}

impl RawCell {
    /// Numbers pass through, numeric text is parsed, everything else is 0.
    pub fn coerce(&self) -> f64 {
        let v = match self {
            RawCell::Number(v) => *v,
            RawCell::Bool(true) => 1.0,
            RawCell::Bool(false) => 0.0,
            RawCell::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            RawCell::Empty | RawCell::Error(_) => 0.0,
        };
        if v.is_finite() { v } else { 0.0 }
    }

    pub fn label(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Number(v) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    format!("{}", *v as i64)
                } else {
                    format!("{}", v)
                }
            }
            RawCell::Bool(true) => "TRUE".to_string(),
            RawCell::Bool(false) => "FALSE".to_string(),
            RawCell::Text(s) => s.trim().to_string(),
            RawCell::Error(e) => e.clone(),
        }
    }
}

/// Rows as read from the source; rows may differ in length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawSheet {
    pub rows: Vec<Vec<RawCell>>,
}

impl RawSheet {
    pub fn put(&mut self, row: usize, col: usize, cell: RawCell) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let r = &mut self.rows[row];
        if r.len() <= col {
            r.resize(col + 1, RawCell::Empty);
        }
        r[col] = cell;
    }
}

pub fn load(path: &Path) -> Result<SimilarityMatrix> {
    let kind = detect_input_kind(path)?;
    let bytes = InputBytes::open(path, kind)?;
    let sheet = match kind {
        InputKind::Xlsx => xlsx::read_first_sheet(bytes.as_slice())
            .with_context(|| format!("failed to parse workbook {}", path.display()))?,
        InputKind::Delimited { delimiter, .. } => {
            delimited::read_table(bytes.as_slice(), delimiter)
                .with_context(|| format!("failed to parse table {}", path.display()))?
        }
    };
    to_matrix(&sheet).with_context(|| format!("failed to read matrix from {}", path.display()))
}

/// First row holds column labels, first column holds row labels. Unnamed
/// header cells are labelled `Unnamed: {col}`.
pub fn to_matrix(sheet: &RawSheet) -> Result<SimilarityMatrix> {
    let mut rows: &[Vec<RawCell>] = &sheet.rows;
    while let Some((last, rest)) = rows.split_last() {
        if last.iter().all(|c| *c == RawCell::Empty) {
            rows = rest;
        } else {
            break;
        }
    }
    let Some((header, body)) = rows.split_first() else {
        bail!("table is empty");
    };
    let width = rows
        .iter()
        .map(|r| {
            r.iter()
                .rposition(|c| *c != RawCell::Empty)
                .map(|i| i + 1)
                .unwrap_or(0)
        })
        .max()
        .unwrap_or(0);
    if width < 2 {
        bail!("table has no value columns");
    }
    if body.is_empty() {
        bail!("table has no data rows");
    }

    let col_labels = (1..width)
        .map(|c| match header.get(c) {
            Some(cell) if *cell != RawCell::Empty => cell.label(),
            _ => format!("Unnamed: {}", c),
        })
        .collect::<Vec<_>>();

    let mut row_labels = Vec::with_capacity(body.len());
    let mut values = Grid::filled(body.len(), width - 1, 0.0);
    for (r, row) in body.iter().enumerate() {
        row_labels.push(row.first().map(RawCell::label).unwrap_or_default());
        for c in 1..width {
            if let Some(cell) = row.get(c) {
                values.set(r, c - 1, cell.coerce());
            }
        }
    }

    Ok(SimilarityMatrix {
        row_labels,
        col_labels,
        values,
    })
}
