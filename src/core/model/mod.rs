use anyhow::{Result, bail};

/// Display orientation applied to a matrix and its mask.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn from_degrees(deg: u32) -> Result<Self> {
        match deg {
            0 => Ok(Rotation::R0),
            90 => Ok(Rotation::R90),
            180 => Ok(Rotation::R180),
            270 => Ok(Rotation::R270),
            _ => bail!("rotation must be 0, 90, 180, or 270 degrees (got {})", deg),
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// 90: transpose. 180: reverse rows and columns. 270: transpose, then reverse both.
    pub fn apply<T: Clone>(self, grid: &Grid<T>) -> Grid<T> {
        match self {
            Rotation::R0 => grid.clone(),
            Rotation::R90 => grid.transposed(),
            Rotation::R180 => grid.reversed(),
            Rotation::R270 => grid.transposed().reversed(),
        }
    }

    fn transposes(self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }

    fn reverses(self) -> bool {
        matches!(self, Rotation::R180 | Rotation::R270)
    }
}

/// Dense row-major 2-D storage.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            cells: vec![value; rows * cols],
        }
    }

    #[cfg(test)]
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut cells = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                bail!(
                    "ragged grid: row {} has {} cells, expected {}",
                    i,
                    row.len(),
                    n_cols
                );
            }
            cells.extend(row);
        }
        Ok(Self {
            rows: n_rows,
            cols: n_cols,
            cells,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> &T {
        &self.cells[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.cells[row * self.cols + col] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    pub fn transposed(&self) -> Self {
        let mut cells = Vec::with_capacity(self.cells.len());
        for c in 0..self.cols {
            for r in 0..self.rows {
                cells.push(self.get(r, c).clone());
            }
        }
        Self {
            rows: self.cols,
            cols: self.rows,
            cells,
        }
    }

    /// Row order and column order both reversed; for row-major storage this
    /// is the flat cell vector read backwards.
    pub fn reversed(&self) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            cells: self.cells.iter().rev().cloned().collect(),
        }
    }
}

/// A labelled table of percentage identities.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityMatrix {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub values: Grid<f64>,
}

impl SimilarityMatrix {
    pub fn rows(&self) -> usize {
        self.values.rows()
    }

    pub fn cols(&self) -> usize {
        self.values.cols()
    }

    pub fn rotated(&self, rotation: Rotation) -> Self {
        let (mut row_labels, mut col_labels) = if rotation.transposes() {
            (self.col_labels.clone(), self.row_labels.clone())
        } else {
            (self.row_labels.clone(), self.col_labels.clone())
        };
        if rotation.reverses() {
            row_labels.reverse();
            col_labels.reverse();
        }
        Self {
            row_labels,
            col_labels,
            values: rotation.apply(&self.values),
        }
    }
}

/// Value range mapped onto the color map; values outside clamp to the ends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorScale {
    pub vmin: f64,
    pub vmax: f64,
}

impl ColorScale {
    pub const ANI: ColorScale = ColorScale {
        vmin: 95.0,
        vmax: 100.0,
    };

    pub fn normalize(&self, v: f64) -> f64 {
        let span = self.vmax - self.vmin;
        if span <= 0.0 || !v.is_finite() {
            return 0.0;
        }
        ((v - self.vmin) / span).clamp(0.0, 1.0)
    }
}

/// Cells that are not drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    hidden: Grid<bool>,
}

impl Mask {
    /// Hides the main diagonal and everything above it.
    pub fn upper_triangle(rows: usize, cols: usize) -> Self {
        let mut hidden = Grid::filled(rows, cols, false);
        for r in 0..rows {
            for c in r..cols {
                hidden.set(r, c, true);
            }
        }
        Self { hidden }
    }

    pub fn rotated(&self, rotation: Rotation) -> Self {
        Self {
            hidden: rotation.apply(&self.hidden),
        }
    }

    pub fn rows(&self) -> usize {
        self.hidden.rows()
    }

    pub fn cols(&self) -> usize {
        self.hidden.cols()
    }

    pub fn is_hidden(&self, row: usize, col: usize) -> bool {
        *self.hidden.get(row, col)
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.iter().filter(|h| **h).count()
    }

    pub fn visible_count(&self) -> usize {
        self.rows() * self.cols() - self.hidden_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    fn grid3() -> Grid<f64> {
        Grid::from_rows(vec![
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        ])
        .unwrap()
    }

    fn labelled(rows: usize, cols: usize) -> SimilarityMatrix {
        let data: Vec<Vec<f64>> = (0..rows)
            .map(|r| (0..cols).map(|c| (r * cols + c) as f64).collect())
            .collect();
        SimilarityMatrix {
            row_labels: (0..rows).map(|r| format!("r{}", r)).collect(),
            col_labels: (0..cols).map(|c| format!("c{}", c)).collect(),
            values: Grid::from_rows(data).unwrap(),
        }
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(0).unwrap(), Rotation::R0);
        assert_eq!(Rotation::from_degrees(270).unwrap(), Rotation::R270);
        let err = Rotation::from_degrees(45).unwrap_err().to_string();
        assert!(err.contains("0, 90, 180, or 270"));
        assert!(err.contains("45"));
        for r in ALL {
            assert_eq!(Rotation::from_degrees(r.degrees()).unwrap(), r);
        }
    }

    #[test]
    fn test_rotation_cases() {
        let g = grid3();
        assert_eq!(Rotation::R0.apply(&g), g);
        let t = Rotation::R90.apply(&g);
        assert_eq!(*t.get(0, 1), 4.0);
        assert_eq!(*t.get(2, 0), 3.0);
        let f = Rotation::R180.apply(&g);
        assert_eq!(*f.get(0, 0), 9.0);
        assert_eq!(*f.get(2, 1), 2.0);
        let r = Rotation::R270.apply(&g);
        // transpose then reverse both: r[i][j] = g[n-1-j][n-1-i]
        assert_eq!(*r.get(0, 0), 9.0);
        assert_eq!(*r.get(0, 1), 6.0);
        assert_eq!(*r.get(1, 0), 8.0);
    }

    #[test]
    fn test_ninety_four_times_is_identity() {
        let g = grid3();
        let mut cur = g.clone();
        for _ in 0..4 {
            cur = Rotation::R90.apply(&cur);
        }
        assert_eq!(cur, g);
    }

    #[test]
    fn test_two_seventy_is_ninety_then_one_eighty() {
        let g = grid3();
        let composed = Rotation::R180.apply(&Rotation::R90.apply(&g));
        assert_eq!(Rotation::R270.apply(&g), composed);
    }

    #[test]
    fn test_rectangular_rotation_shapes() {
        let m = labelled(2, 4);
        let t = m.rotated(Rotation::R90);
        assert_eq!((t.rows(), t.cols()), (4, 2));
        assert_eq!(t.row_labels, vec!["c0", "c1", "c2", "c3"]);
        let f = m.rotated(Rotation::R180);
        assert_eq!((f.rows(), f.cols()), (2, 4));
        assert_eq!(f.row_labels, vec!["r1", "r0"]);
        assert_eq!(f.col_labels, vec!["c3", "c2", "c1", "c0"]);
        assert_eq!(*f.values.get(0, 0), 7.0);
    }

    #[test]
    fn test_labels_follow_values() {
        let m = labelled(3, 3);
        for rot in ALL {
            let r = m.rotated(rot);
            for i in 0..3 {
                for j in 0..3 {
                    let src_r = m.row_labels.iter().position(|l| *l == r.row_labels[i]);
                    let src_c = m.col_labels.iter().position(|l| *l == r.col_labels[j]);
                    // transposed orientations swap which label axis a cell came from
                    let v = match (src_r, src_c) {
                        (Some(a), Some(b)) => *m.values.get(a, b),
                        _ => {
                            let a = m.row_labels.iter().position(|l| *l == r.col_labels[j]).unwrap();
                            let b = m.col_labels.iter().position(|l| *l == r.row_labels[i]).unwrap();
                            *m.values.get(a, b)
                        }
                    };
                    assert_eq!(*r.values.get(i, j), v, "rotation {:?} at ({}, {})", rot, i, j);
                }
            }
        }
    }

    #[test]
    fn test_mask_count_invariant_under_rotation() {
        for n in 1..6 {
            let mask = Mask::upper_triangle(n, n);
            for rot in ALL {
                assert_eq!(mask.rotated(rot).hidden_count(), n * (n + 1) / 2);
            }
        }
    }

    #[test]
    fn test_mask_hides_original_upper_triangle() {
        let n = 4;
        // Tag each cell with its original (row, col) and rotate alongside the mask.
        let mut origin = Grid::filled(n, n, (0usize, 0usize));
        for r in 0..n {
            for c in 0..n {
                origin.set(r, c, (r, c));
            }
        }
        let mask = Mask::upper_triangle(n, n);
        for rot in ALL {
            let o = rot.apply(&origin);
            let m = mask.rotated(rot);
            for r in 0..n {
                for c in 0..n {
                    let (orow, ocol) = *o.get(r, c);
                    assert_eq!(m.is_hidden(r, c), ocol >= orow, "rotation {:?}", rot);
                }
            }
        }
    }

    #[test]
    fn test_mask_three_by_three_visible() {
        let mask = Mask::upper_triangle(3, 3);
        assert_eq!(mask.visible_count(), 3);
        assert!(mask.is_hidden(0, 0));
        assert!(mask.is_hidden(0, 2));
        assert!(!mask.is_hidden(2, 0));
    }

    #[test]
    fn test_color_scale_clamps() {
        let s = ColorScale::ANI;
        assert_eq!(s.normalize(95.0), 0.0);
        assert_eq!(s.normalize(97.5), 0.5);
        assert_eq!(s.normalize(0.0), 0.0);
        assert_eq!(s.normalize(120.0), 1.0);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        assert!(Grid::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
    }
}
