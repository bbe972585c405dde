use crate::core::engine::{Figure, Panel};
use crate::report::colormap::{self, COOLWARM_NAME};
use anyhow::Result;
use std::fmt::Write;

const FONT_FAMILY: &str = "DejaVu Sans, Arial, Helvetica, sans-serif";
const COLORBAR_LABEL: &str = "ANI (%)";
const COLORBAR_SHRINK: f64 = 0.8;
const GRADIENT_STOPS: usize = 32;
const PAD: f64 = 6.0;
const TICK_LEN: f64 = 3.5;

/// Approximate advance width of a sans-serif glyph.
fn text_width(s: &str, font_size: f64) -> f64 {
    s.chars().count() as f64 * font_size * 0.6
}

fn longest_label<'a>(labels: impl Iterator<Item = &'a String>, font_size: f64) -> f64 {
    labels.map(|l| text_width(l, font_size)).fold(0.0, f64::max)
}

/// Panel geometry in points. Every panel uses the same cell size, derived from
/// the largest matrix, so smaller matrices leave empty space instead of being
/// stretched.
struct Geometry {
    slot_w: f64,
    y_band: f64,
    plot_top: f64,
    plot_h: f64,
    cell_w: f64,
    cell_h: f64,
    colorbar_x: f64,
}

impl Geometry {
    fn new(fig: &Figure) -> Self {
        let w = fig.layout.width_pt();
        let h = fig.layout.height_pt();
        let fonts = fig.fonts;

        let y_band = longest_label(
            fig.panels.iter().flat_map(|p| p.matrix.row_labels.iter()),
            fonts.axis,
        ) + TICK_LEN
            + 2.0;
        let x_band = longest_label(
            fig.panels.iter().flat_map(|p| p.matrix.col_labels.iter()),
            fonts.axis,
        ) + TICK_LEN
            + 2.0;
        let title_band = fonts.title() * 1.6;

        let tick_w = colorbar_ticks(fig)
            .iter()
            .map(|(_, s)| text_width(s, fonts.colorbar))
            .fold(0.0, f64::max);
        let colorbar_w = PAD
            + colorbar_bar_width(fig)
            + TICK_LEN
            + 2.0
            + tick_w
            + fonts.colorbar * 1.6
            + PAD;

        let panels = fig.panels.len().max(1) as f64;
        let slot_w = ((w - colorbar_w) / panels).max(1.0);
        let plot_w = (slot_w - 2.0 * PAD - y_band).max(1.0);
        let plot_top = PAD + title_band;
        let plot_h = (h - plot_top - x_band - PAD).max(1.0);
        let max_cols = fig.layout.max_cols.max(1) as f64;
        let max_rows = fig.layout.max_rows.max(1) as f64;

        Self {
            slot_w,
            y_band,
            plot_top,
            plot_h,
            cell_w: plot_w / max_cols,
            cell_h: plot_h / max_rows,
            colorbar_x: slot_w * panels,
        }
    }

    fn plot_left(&self, index: usize) -> f64 {
        index as f64 * self.slot_w + PAD + self.y_band
    }
}

fn colorbar_bar_width(fig: &Figure) -> f64 {
    (fig.fonts.colorbar * 0.9).max(8.0)
}

fn colorbar_ticks(fig: &Figure) -> Vec<(f64, String)> {
    let (start, step, count) = nice_ticks(fig.scale.vmin, fig.scale.vmax, 6);
    (0..count)
        .map(|i| start + step * i as f64)
        .filter(|v| *v >= fig.scale.vmin - 1e-9 && *v <= fig.scale.vmax + 1e-9)
        .map(|v| (v, fmt_tick(v)))
        .collect()
}

pub fn render(fig: &Figure) -> Result<String> {
    let w = fig.layout.width_pt();
    let h = fig.layout.height_pt();
    let geo = Geometry::new(fig);

    let mut out = String::new();
    writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{:.2}pt\" height=\"{:.2}pt\" viewBox=\"0 0 {:.2} {:.2}\" font-family=\"{}\">",
        w, h, w, h, FONT_FAMILY
    )?;
    writeln!(
        out,
        "<rect x=\"0\" y=\"0\" width=\"{:.2}\" height=\"{:.2}\" fill=\"#ffffff\"/>",
        w, h
    )?;

    for (i, panel) in fig.panels.iter().enumerate() {
        draw_panel(&mut out, fig, &geo, i, panel)?;
        if panel.colorbar {
            draw_colorbar(&mut out, fig, &geo)?;
        }
    }

    writeln!(out, "</svg>")?;
    Ok(out)
}

fn draw_panel(
    out: &mut String,
    fig: &Figure,
    geo: &Geometry,
    index: usize,
    panel: &Panel,
) -> Result<()> {
    let fonts = fig.fonts;
    let left = geo.plot_left(index);
    let top = geo.plot_top;
    let m = &panel.matrix;
    let matrix_w = m.cols() as f64 * geo.cell_w;
    let matrix_h = m.rows() as f64 * geo.cell_h;

    writeln!(out, "<g id=\"panel-{}\" class=\"panel\">", index + 1)?;
    writeln!(
        out,
        "<text class=\"title\" x=\"{:.2}\" y=\"{:.2}\" font-size=\"{}\" fill=\"#000\" text-anchor=\"middle\">{}</text>",
        left + matrix_w / 2.0,
        top - fonts.title() * 0.5,
        fonts.title(),
        escape_xml(&panel.title)
    )?;

    for r in 0..m.rows() {
        for c in 0..m.cols() {
            if panel.mask.is_hidden(r, c) {
                continue;
            }
            let v = *m.values.get(r, c);
            let color = colormap::scaled(&fig.scale, v);
            let x = left + c as f64 * geo.cell_w;
            let y = top + r as f64 * geo.cell_h;
            writeln!(
                out,
                "<rect class=\"cell\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
                x,
                y,
                geo.cell_w,
                geo.cell_h,
                color.hex()
            )?;
            writeln!(
                out,
                "<text class=\"annot\" x=\"{:.2}\" y=\"{:.2}\" font-size=\"{}\" fill=\"{}\" text-anchor=\"middle\" dominant-baseline=\"central\">{:.1}</text>",
                x + geo.cell_w / 2.0,
                y + geo.cell_h / 2.0,
                fonts.annotation,
                colormap::annotation_color(color),
                v
            )?;
        }
    }

    // Column labels are rotated to read bottom-to-top, centered on their column.
    let axis_y = top + matrix_h;
    for (c, label) in m.col_labels.iter().enumerate() {
        let x = left + (c as f64 + 0.5) * geo.cell_w;
        writeln!(
            out,
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"#000\" stroke-width=\"0.8\"/>",
            x,
            axis_y,
            x,
            axis_y + TICK_LEN
        )?;
        let ly = axis_y + TICK_LEN + 2.0;
        writeln!(
            out,
            "<text class=\"xtick\" x=\"{:.2}\" y=\"{:.2}\" font-size=\"{}\" fill=\"#000\" text-anchor=\"end\" dominant-baseline=\"central\" transform=\"rotate(-90 {:.2} {:.2})\">{}</text>",
            x,
            ly,
            fonts.axis,
            x,
            ly,
            escape_xml(label)
        )?;
    }
    for (r, label) in m.row_labels.iter().enumerate() {
        let y = top + (r as f64 + 0.5) * geo.cell_h;
        writeln!(
            out,
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"#000\" stroke-width=\"0.8\"/>",
            left - TICK_LEN,
            y,
            left,
            y
        )?;
        writeln!(
            out,
            "<text class=\"ytick\" x=\"{:.2}\" y=\"{:.2}\" font-size=\"{}\" fill=\"#000\" text-anchor=\"end\" dominant-baseline=\"central\">{}</text>",
            left - TICK_LEN - 2.0,
            y,
            fonts.axis,
            escape_xml(label)
        )?;
    }
    writeln!(out, "</g>")?;
    Ok(())
}

fn draw_colorbar(out: &mut String, fig: &Figure, geo: &Geometry) -> Result<()> {
    let fonts = fig.fonts;
    let bar_w = colorbar_bar_width(fig);
    let bar_h = geo.plot_h * COLORBAR_SHRINK;
    let x = geo.colorbar_x + PAD;
    let y = geo.plot_top + (geo.plot_h - bar_h) / 2.0;

    writeln!(out, "<g id=\"colorbar\" data-cmap=\"{}\">", COOLWARM_NAME)?;
    writeln!(
        out,
        "<defs><linearGradient id=\"colorbar-gradient\" x1=\"0\" y1=\"1\" x2=\"0\" y2=\"0\">"
    )?;
    for k in 0..=GRADIENT_STOPS {
        let t = k as f64 / GRADIENT_STOPS as f64;
        writeln!(
            out,
            "<stop offset=\"{:.4}\" stop-color=\"{}\"/>",
            t,
            colormap::coolwarm(t).hex()
        )?;
    }
    writeln!(out, "</linearGradient></defs>")?;
    writeln!(
        out,
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"url(#colorbar-gradient)\"/>",
        x, y, bar_w, bar_h
    )?;

    let span = fig.scale.vmax - fig.scale.vmin;
    let mut tick_w: f64 = 0.0;
    for (v, label) in colorbar_ticks(fig) {
        let ty = y + bar_h - ((v - fig.scale.vmin) / span) * bar_h;
        writeln!(
            out,
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"#000\" stroke-width=\"0.8\"/>",
            x + bar_w,
            ty,
            x + bar_w + TICK_LEN,
            ty
        )?;
        writeln!(
            out,
            "<text class=\"cbtick\" x=\"{:.2}\" y=\"{:.2}\" font-size=\"{}\" fill=\"#000\" text-anchor=\"start\" dominant-baseline=\"central\">{}</text>",
            x + bar_w + TICK_LEN + 2.0,
            ty,
            fonts.colorbar,
            label
        )?;
        tick_w = tick_w.max(text_width(&label, fonts.colorbar));
    }

    let lx = x + bar_w + TICK_LEN + 2.0 + tick_w + fonts.colorbar * 0.8;
    let ly = y + bar_h / 2.0;
    writeln!(
        out,
        "<text class=\"cblabel\" x=\"{:.2}\" y=\"{:.2}\" font-size=\"{}\" fill=\"#000\" text-anchor=\"middle\" dominant-baseline=\"central\" transform=\"rotate(-90 {:.2} {:.2})\">{}</text>",
        lx,
        ly,
        fonts.colorbar,
        lx,
        ly,
        escape_xml(COLORBAR_LABEL)
    )?;
    writeln!(out, "</g>")?;
    Ok(())
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn fmt_tick(v: f64) -> String {
    if (v - v.round()).abs() < 0.001 {
        format!("{}", v.round() as i64)
    } else if v.abs() < 10.0 {
        format!("{:.2}", v)
    } else {
        format!("{:.1}", v)
    }
}

fn nice_ticks(min: f64, max: f64, ticks: usize) -> (f64, f64, usize) {
    let range = (max - min).abs().max(1e-9);
    let rough = range / (ticks as f64 - 1.0);
    let mag = 10f64.powf(rough.abs().log10().floor());
    let norm = rough / mag;
    let step = if norm <= 1.0 {
        1.0
    } else if norm <= 2.0 {
        2.0
    } else if norm <= 5.0 {
        5.0
    } else {
        10.0
    } * mag;
    let start = (min / step).floor() * step;
    let end = (max / step).ceil() * step;
    let count = ((end - start) / step).round() as usize + 1;
    (start, step, count)
}
