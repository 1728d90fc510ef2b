use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use clap::CommandFactory;

pub fn canonicalize_lossy<P: AsRef<Path>>(p: P) -> String {
  let p = p.as_ref();
  let pb = match std::fs::canonicalize(p) {
    Ok(x) => x,
    Err(_) => match std::env::current_dir() {
      Ok(cwd) => cwd.join(p),
      Err(_) => p.to_path_buf(),
    },
  };
  pb.to_string_lossy().to_string()
}

/// Parse an RFC3339 API timestamp (GitHub and Discourse both use it) into
/// naive UTC for window comparisons.
pub fn parse_api_time(raw: &str) -> Result<NaiveDateTime> {
  DateTime::parse_from_rfc3339(raw)
    .map(|dt| dt.naive_utc())
    .with_context(|| format!("parsing timestamp {raw:?}"))
}

/// Prepare the output directory for a run.
///
/// - When `out` is set, it is treated as the target directory and created if needed.
/// - Otherwise a temp directory with a timestamped name is created.
///   Returns the absolute path as a String.
pub fn prepare_out_dir(out: Option<&str>, now: DateTime<Local>) -> Result<String> {
  let dir = match out {
    Some(d) => d.to_string(),
    None => std::env::temp_dir()
      .join(format!("activity-{}", now.format("%Y%m%d-%H%M%S")))
      .to_string_lossy()
      .to_string(),
  };
  std::fs::create_dir_all(&dir).with_context(|| format!("creating output dir {dir}"))?;

  Ok(dir)
}

/// English month name for chart titles.
pub fn month_name(month: u32) -> &'static str {
  match month {
    1 => "January",
    2 => "February",
    3 => "March",
    4 => "April",
    5 => "May",
    6 => "June",
    7 => "July",
    8 => "August",
    9 => "September",
    10 => "October",
    11 => "November",
    12 => "December",
    _ => "",
  }
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
