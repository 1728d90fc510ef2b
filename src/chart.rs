use std::path::Path;

use anyhow::{anyhow, Result};
use plotters::prelude::*;

use crate::report::ActivityRow;

// Two stacked panels, one per item kind, repositories on the x-axis and
// opened/closed bars side by side. Mirrors the tables written by the reporter.

const PANEL_KINDS: [&str; 2] = ["PRs", "Issues"];
const OPENED: RGBColor = RGBColor(66, 133, 244);
const CLOSED: RGBColor = RGBColor(219, 68, 55);

fn draw_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
  anyhow!("rendering chart: {e}")
}

fn unique_repos(rows: &[ActivityRow]) -> Vec<String> {
  let mut repos: Vec<String> = Vec::new();
  for r in rows {
    if !repos.contains(&r.repo) {
      repos.push(r.repo.clone());
    }
  }
  repos
}

/// Render the grouped bar chart as a PNG. Does nothing when there are no rows.
pub fn render_activity_chart(path: &Path, title: &str, rows: &[ActivityRow]) -> Result<()> {
  let repos = unique_repos(rows);
  if repos.is_empty() {
    return Ok(());
  }

  let root = BitMapBackend::new(path, (1000, 1200)).into_drawing_area();
  root.fill(&WHITE).map_err(draw_err)?;
  let panels = root.split_evenly((2, 1));

  for (panel, kind) in panels.iter().zip(PANEL_KINDS) {
    let max = rows
      .iter()
      .filter(|r| r.item_type == kind)
      .map(|r| r.value)
      .max()
      .unwrap_or(0)
      .max(1);

    let mut chart = ChartBuilder::on(panel)
      .caption(format!("{title}: {kind}"), ("sans-serif", 28))
      .margin(20)
      .x_label_area_size(80)
      .y_label_area_size(50)
      .build_cartesian_2d(0f64..repos.len() as f64, 0u64..max + max / 5 + 1)
      .map_err(draw_err)?;

    chart
      .configure_mesh()
      .disable_x_mesh()
      .x_labels(repos.len())
      .x_label_formatter(&|x| {
        let idx = x.floor() as usize;
        repos.get(idx).cloned().unwrap_or_default()
      })
      .draw()
      .map_err(draw_err)?;

    let bars = |state: &'static str, color: RGBColor, offset: f64| {
      rows
        .iter()
        .filter(move |r| r.item_type == kind && r.state == state)
        .filter_map(|r| repos.iter().position(|name| *name == r.repo).map(|i| (i, r.value)))
        .map(move |(i, v)| Rectangle::new([(i as f64 + offset, 0u64), (i as f64 + offset + 0.3, v)], color.filled()))
        .collect::<Vec<_>>()
    };

    chart
      .draw_series(bars("Opened", OPENED, 0.15))
      .map_err(draw_err)?
      .label("Opened")
      .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], OPENED.filled()));

    chart
      .draw_series(bars("Closed", CLOSED, 0.55))
      .map_err(draw_err)?
      .label("Closed")
      .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], CLOSED.filled()));

    chart
      .configure_series_labels()
      .border_style(BLACK)
      .background_style(WHITE.mix(0.8))
      .draw()
      .map_err(draw_err)?;
  }

  root
    .present()
    .map_err(|e| anyhow!("writing chart {}: {e}", path.display()))?;

  Ok(())
}
