use crate::cli::args::{Cli, Commands, RenderArgs};
use crate::core::engine::{self, FontSizes, RenderConfig};
use crate::core::model::Rotation;
use crate::report;
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub fn entry() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => {
            for path in render(args)? {
                println!("Combined heatmap saved to {}", path.display());
            }
            Ok(())
        }
    }
}

/// Returns the written paths in write order. Nothing is written unless every
/// input loads.
fn render(args: RenderArgs) -> Result<Vec<PathBuf>> {
    let stats = stats_enabled();
    let t0 = Instant::now();

    let rotation = stage(stats, "preflight", || {
        let rotation = Rotation::from_degrees(args.rotation)?;
        for path in &args.files {
            if !path.is_file() {
                bail!("input file not found: {}", path.display());
            }
        }
        Ok(rotation)
    })?;

    let config = RenderConfig {
        files: args.files.clone(),
        rotation,
        box_size: args.box_size,
        fonts: FontSizes {
            annotation: args.annotation_fontsize,
            axis: args.axis_fontsize,
            colorbar: args.colorbar_fontsize,
        },
    };
    config.validate()?;

    let t_load = Instant::now();
    let matrices = engine::load_all(&config)?;
    stage_done(stats, "load", t_load);

    let t_compose = Instant::now();
    let figure = engine::compose(&config, matrices);
    stage_done(stats, "compose", t_compose);
    if stats {
        eprintln!(
            "ANI_HEATMAP_STATS panels={} colorbars={} max_rows={} max_cols={} canvas={:.2}x{:.2}in",
            figure.panels.len(),
            figure.colorbar_count(),
            figure.layout.max_rows,
            figure.layout.max_cols,
            figure.layout.width_in,
            figure.layout.height_in
        );
        for (i, panel) in figure.panels.iter().enumerate() {
            eprintln!(
                "ANI_HEATMAP_STATS panel={} shape={}x{} visible={} masked={}",
                i + 1,
                panel.matrix.rows(),
                panel.matrix.cols(),
                panel.mask.visible_count(),
                panel.mask.hidden_count()
            );
        }
    }

    let t_svg = Instant::now();
    let svg = report::svg::render(&figure)?;
    stage_done(stats, "svg", t_svg);

    let t_png = Instant::now();
    let png = report::png::svg_to_png(
        &svg,
        figure.layout.width_in,
        figure.layout.height_in,
        report::png::DPI,
    )
    .with_context(|| "failed to rasterize figure")?;
    stage_done(stats, "png", t_png);

    let pdf = match &args.pdf {
        Some(_) => {
            let t_pdf = Instant::now();
            let pdf = report::pdf::svg_to_pdf(&svg)
                .with_context(|| "failed to convert figure to PDF")?;
            stage_done(stats, "pdf", t_pdf);
            Some(pdf)
        }
        None => None,
    };

    let mut written = Vec::new();
    fs::write(&args.png, &png)
        .with_context(|| format!("failed to write {}", args.png.display()))?;
    written.push(args.png.clone());
    fs::write(&args.svg, &svg)
        .with_context(|| format!("failed to write {}", args.svg.display()))?;
    written.push(args.svg.clone());
    if let (Some(path), Some(pdf)) = (&args.pdf, pdf) {
        fs::write(path, pdf).with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path.clone());
    }

    if stats {
        for path in &written {
            let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            eprintln!(
                "ANI_HEATMAP_STATS output={} bytes={}",
                path.display(),
                size
            );
        }
        eprintln!("ANI_HEATMAP_STATS total={}", fmt_dur(t0.elapsed()));
    }

    Ok(written)
}

fn stats_enabled() -> bool {
    matches!(env::var("ANI_HEATMAP_STATS").as_deref(), Ok("1"))
}

fn stage<T, F>(stats: bool, name: &str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let t = Instant::now();
    let res = f();
    if stats {
        eprintln!(
            "ANI_HEATMAP_STATS stage={} time={}",
            name,
            fmt_dur(t.elapsed())
        );
    }
    res
}

fn stage_done(stats: bool, name: &str, t: Instant) {
    if stats {
        eprintln!(
            "ANI_HEATMAP_STATS stage={} time={}",
            name,
            fmt_dur(t.elapsed())
        );
    }
}

fn fmt_dur(d: Duration) -> String {
    if d.as_secs_f64() < 1.0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.3}s", d.as_secs_f64())
    }
}
