use anyhow::{Context, Result, anyhow};
use resvg::{tiny_skia, usvg};

pub const DPI: f64 = 600.0;

/// Rasterizes an SVG document onto a white canvas of `width_in` x `height_in`
/// inches at `dpi`.
pub fn svg_to_png(svg: &str, width_in: f64, height_in: f64, dpi: f64) -> Result<Vec<u8>> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    let tree =
        usvg::Tree::from_str(svg, &opt).map_err(|e| anyhow!("usvg parse failed: {e}"))?;

    let px_w = (width_in * dpi).round().max(1.0) as u32;
    let px_h = (height_in * dpi).round().max(1.0) as u32;
    let mut pixmap = tiny_skia::Pixmap::new(px_w, px_h)
        .with_context(|| format!("figure of {}x{} px is too large to rasterize", px_w, px_h))?;
    pixmap.fill(tiny_skia::Color::WHITE);

    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        px_w as f32 / size.width(),
        px_h as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    pixmap
        .encode_png()
        .map_err(|e| anyhow!("png encoding failed: {e}"))
}
