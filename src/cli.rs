use anyhow::{bail, Result};
use chrono::Datelike;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util;

#[derive(Parser, Debug)]
#[command(
    name = "org-activity-report",
    version,
    about = "Summarize GitHub and Discourse forum activity per calendar month",
    long_about = None
)]
pub struct Cli {
  /// Calendar month of interest, 1-12 (default: current month)
  #[arg(long)]
  pub month: Option<u32>,

  /// Year of interest (default: current year)
  #[arg(long)]
  pub year: Option<i32>,

  /// GitHub repository as owner/name; repeatable
  #[arg(long = "repo")]
  pub repos: Vec<String>,

  /// Discourse tag to report on; repeatable
  #[arg(long = "tag")]
  pub tags: Vec<String>,

  /// Base URL of the Discourse forum
  #[arg(long, default_value = "https://neurostars.org")]
  pub forum_url: String,

  /// Stop paginating after N pages (inexpensive debug runs)
  #[arg(long)]
  pub debug_pages: Option<u32>,

  /// Number of trailing months in the per-tag time series
  #[arg(long, default_value_t = 10)]
  pub trailing_months: u32,

  /// Output directory (default: timestamped temp dir)
  #[arg(long)]
  pub out: Option<PathBuf>,

  /// Render grouped bar charts next to the tables
  #[arg(long)]
  pub chart: bool,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EffectiveConfig {
  pub month: u32,
  pub year: i32,
  pub repos: Vec<String>,
  pub tags: Vec<String>,
  pub forum_url: String,
  pub debug_pages: Option<u32>,
  pub trailing_months: u32,
  pub out: Option<String>, // absolute path for stability
  pub chart: bool,
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  let now = chrono::Local::now();
  let month = cli.month.unwrap_or_else(|| now.month());
  let year = cli.year.unwrap_or_else(|| now.year());

  if !(1..=12).contains(&month) {
    bail!("invalid --month, expected an integer between 1 and 12");
  }
  if cli.repos.is_empty() && cli.tags.is_empty() {
    bail!("provide at least one --repo or --tag");
  }
  for repo in &cli.repos {
    if repo.split('/').filter(|part| !part.is_empty()).count() != 2 {
      bail!("invalid --repo {repo:?}, expected owner/name");
    }
  }
  if cli.trailing_months == 0 {
    bail!("--trailing-months must be at least 1");
  }

  Ok(EffectiveConfig {
    month,
    year,
    repos: cli.repos,
    tags: cli.tags,
    forum_url: cli.forum_url.trim_end_matches('/').to_string(),
    debug_pages: cli.debug_pages,
    trailing_months: cli.trailing_months,
    out: cli.out.as_deref().map(util::canonicalize_lossy),
    chart: cli.chart,
  })
}
