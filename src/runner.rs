use std::path::Path;

use anyhow::Result;
use log::{info, warn};

use crate::chart;
use crate::classify;
use crate::cli::EffectiveConfig;
use crate::discourse;
use crate::github;
use crate::report::{self, ActivityRow};
use crate::stats;
use crate::util;
use crate::window;

/// Run one report: a sequential pass over the configured repositories, then
/// one over the configured tags. Each repository and tag is independent, so a
/// truncated fetch in one never blocks the others, and the process exits 0
/// even on partial data.
pub fn run(cfg: &EffectiveConfig) -> Result<()> {
  let window = window::month_window(cfg.month, cfg.year)?;
  let out_dir = util::prepare_out_dir(cfg.out.as_deref(), chrono::Local::now())?;
  info!(
    "reporting window {} ({} to {}), writing to {out_dir}",
    window.label(),
    window.start,
    window.end
  );

  report_github(cfg, &window, Path::new(&out_dir))?;
  report_forum(cfg, &window, Path::new(&out_dir))?;

  Ok(())
}

fn report_github(cfg: &EffectiveConfig, window: &window::MonthWindow, out_dir: &Path) -> Result<()> {
  if cfg.repos.is_empty() {
    return Ok(());
  }

  let api = github::build_api();
  let mut rows: Vec<ActivityRow> = Vec::new();

  for repo_full in &cfg.repos {
    // shape validated in normalize
    let Some((owner, name)) = repo_full.split_once('/') else {
      continue;
    };

    let mut records = github::fetch_pulls(api.as_ref(), owner, name, "all", cfg.debug_pages);
    records.extend(github::fetch_issues(api.as_ref(), owner, name, "all", cfg.debug_pages));

    let counts = stats::aggregate_repo(&records, window);
    info!(
      "{repo_full}: {} PRs opened, {} merged; {} issues opened, {} closed",
      counts.prs_opened, counts.prs_merged, counts.issues_opened, counts.issues_closed
    );

    rows.extend(report::melt_counts(name, &counts));
  }

  let table = report::write_activity_table(out_dir, &rows)?;
  info!("wrote {}", table.display());

  if cfg.chart {
    let chart_path = out_dir.join("github-activity.png");
    let title = format!("GitHub summary for {} {}", util::month_name(cfg.month), cfg.year);
    match chart::render_activity_chart(&chart_path, &title, &rows) {
      Ok(()) => info!("wrote {}", chart_path.display()),
      Err(err) => warn!("chart skipped: {err:#}"),
    }
  }

  Ok(())
}

fn report_forum(cfg: &EffectiveConfig, window: &window::MonthWindow, out_dir: &Path) -> Result<()> {
  if cfg.tags.is_empty() {
    return Ok(());
  }

  let api = discourse::build_api(&cfg.forum_url);

  for tag in &cfg.tags {
    let topics = discourse::fetch_topics(api.as_ref(), tag, cfg.debug_pages);
    if topics.is_empty() {
      info!("tag '{tag}': no topics, skipping");
      continue;
    }

    let table = report::write_topics_table(out_dir, tag, &topics)?;
    info!("wrote {}", table.display());

    let stats_all = stats::tag_stats(&topics);
    let new_topics = topics.iter().filter(|t| classify::topic_in_window(t, window)).count() as u64;
    report::print_tag_summary(tag, &stats_all, new_topics);

    let series = stats::build_time_series(&topics, cfg.month, cfg.year, cfg.trailing_months)?;
    let monthly = report::write_monthly_table(out_dir, tag, &series)?;
    info!("wrote {}", monthly.display());
  }

  Ok(())
}
