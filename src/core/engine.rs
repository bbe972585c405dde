use crate::core::model::{ColorScale, Mask, Rotation, SimilarityMatrix};
use crate::core::table;
use anyhow::{Result, bail};
use std::path::PathBuf;

pub const POINTS_PER_INCH: f64 = 72.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontSizes {
    pub annotation: f64,
    pub axis: f64,
    pub colorbar: f64,
}

impl FontSizes {
    pub fn title(&self) -> f64 {
        self.axis + 4.0
    }
}

pub struct RenderConfig {
    pub files: Vec<PathBuf>,
    pub rotation: Rotation,
    pub box_size: f64,
    pub fonts: FontSizes,
}

impl RenderConfig {
    /// Rejects parameters that would produce an empty or degenerate figure.
    pub fn validate(&self) -> Result<()> {
        if self.files.is_empty() {
            bail!("at least one input matrix is required");
        }
        if !(self.box_size.is_finite() && self.box_size > 0.0) {
            bail!("--box-size must be > 0 (got {})", self.box_size);
        }
        for (name, v) in [
            ("--annotation-fontsize", self.fonts.annotation),
            ("--axis-fontsize", self.fonts.axis),
            ("--colorbar-fontsize", self.fonts.colorbar),
        ] {
            if !(v.is_finite() && v > 0.0) {
                bail!("{} must be > 0 (got {})", name, v);
            }
        }
        Ok(())
    }
}

/// Canvas size shared by every panel, derived from the largest rotated matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FigureLayout {
    pub max_rows: usize,
    pub max_cols: usize,
    pub width_in: f64,
    pub height_in: f64,
}

impl FigureLayout {
    pub fn new(matrices: &[SimilarityMatrix], box_size: f64) -> Self {
        let max_rows = matrices.iter().map(|m| m.rows()).max().unwrap_or(0);
        let max_cols = matrices.iter().map(|m| m.cols()).max().unwrap_or(0);
        Self {
            max_rows,
            max_cols,
            width_in: matrices.len() as f64 * max_cols as f64 * box_size,
            height_in: max_rows as f64 * box_size,
        }
    }

    pub fn width_pt(&self) -> f64 {
        self.width_in * POINTS_PER_INCH
    }

    pub fn height_pt(&self) -> f64 {
        self.height_in * POINTS_PER_INCH
    }
}

pub struct Panel {
    pub title: String,
    pub matrix: SimilarityMatrix,
    pub mask: Mask,
    pub colorbar: bool,
}

pub struct Figure {
    pub panels: Vec<Panel>,
    pub layout: FigureLayout,
    pub scale: ColorScale,
    pub fonts: FontSizes,
}

impl Figure {
    pub fn colorbar_count(&self) -> usize {
        self.panels.iter().filter(|p| p.colorbar).count()
    }
}

/// Loads every input before any panel is built; the first failure aborts.
pub fn load_all(cfg: &RenderConfig) -> Result<Vec<SimilarityMatrix>> {
    cfg.files.iter().map(|path| table::load(path)).collect()
}

/// Rotates each matrix together with its upper-triangle mask and lays the
/// panels out left to right.
pub fn compose(cfg: &RenderConfig, matrices: Vec<SimilarityMatrix>) -> Figure {
    let last = matrices.len().saturating_sub(1);
    let mut rotated = Vec::with_capacity(matrices.len());
    let mut masks = Vec::with_capacity(matrices.len());
    for m in &matrices {
        masks.push(Mask::upper_triangle(m.rows(), m.cols()).rotated(cfg.rotation));
        rotated.push(m.rotated(cfg.rotation));
    }
    let layout = FigureLayout::new(&rotated, cfg.box_size);

    let panels = rotated
        .into_iter()
        .zip(masks)
        .enumerate()
        .map(|(i, (matrix, mask))| Panel {
            title: format!("Matrix {} (Rot: {}°)", i + 1, cfg.rotation.degrees()),
            matrix,
            mask,
            colorbar: i == last,
        })
        .collect();

    Figure {
        panels,
        layout,
        scale: ColorScale::ANI,
        fonts: cfg.fonts,
    }
}
