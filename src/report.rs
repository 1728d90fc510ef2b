use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::model::TopicRecord;
use crate::stats::{MonthlyTagStats, RepoCounts, TagStats};

/// One melted row of the GitHub activity table: repository, item kind, state,
/// count. Long form so the chart can group bars by state.
#[derive(Clone, Debug, Serialize)]
pub struct ActivityRow {
  pub repo: String,
  pub item_type: String,
  pub state: String,
  pub value: u64,
}

fn row(repo: &str, item_type: &str, state: &str, value: u64) -> ActivityRow {
  ActivityRow {
    repo: repo.to_string(),
    item_type: item_type.to_string(),
    state: state.to_string(),
    value,
  }
}

/// Melt per-repository counts into long-form rows. "Closed" for PRs means
/// merged.
pub fn melt_counts(repo: &str, counts: &RepoCounts) -> Vec<ActivityRow> {
  vec![
    row(repo, "PRs", "Opened", counts.prs_opened),
    row(repo, "PRs", "Closed", counts.prs_merged),
    row(repo, "Issues", "Opened", counts.issues_opened),
    row(repo, "Issues", "Closed", counts.issues_closed),
  ]
}

fn tsv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
  csv::WriterBuilder::new()
    .delimiter(b'\t')
    .from_path(path)
    .with_context(|| format!("creating {}", path.display()))
}

pub fn write_activity_table(dir: &Path, rows: &[ActivityRow]) -> Result<PathBuf> {
  let path = dir.join("github-activity.tsv");
  let mut wtr = tsv_writer(&path)?;

  for r in rows {
    wtr.serialize(r)?;
  }
  wtr.flush()?;

  Ok(path)
}

/// Raw topic table for one tag, one row per topic.
pub fn write_topics_table(dir: &Path, tag: &str, topics: &[TopicRecord]) -> Result<PathBuf> {
  let path = dir.join(format!("{tag}.tsv"));
  let mut wtr = tsv_writer(&path)?;

  for t in topics {
    wtr.serialize(t)?;
  }
  wtr.flush()?;

  Ok(path)
}

/// Trailing-month time series for one tag.
pub fn write_monthly_table(dir: &Path, tag: &str, series: &[MonthlyTagStats]) -> Result<PathBuf> {
  let path = dir.join(format!("{tag}-monthly.tsv"));
  let mut wtr = tsv_writer(&path)?;

  wtr.write_record([
    "month",
    "new_topics",
    "topics",
    "no_reply",
    "accepted_answer",
    "percent_no_reply",
    "percent_accepted_answer",
    "mean_posts_per_topic",
  ])?;

  for m in series {
    wtr.write_record([
      m.month.clone(),
      m.new_topics.to_string(),
      m.stats.topics.to_string(),
      m.stats.no_reply.to_string(),
      m.stats.accepted_answer.to_string(),
      format!("{:.2}", m.stats.percent_no_reply),
      format!("{:.2}", m.stats.percent_accepted_answer),
      format!("{:.2}", m.stats.mean_posts_per_topic),
    ])?;
  }
  wtr.flush()?;

  Ok(path)
}

/// Human-readable per-tag summary on stdout.
pub fn print_tag_summary(tag: &str, stats: &TagStats, new_topics: u64) {
  println!("tag '{tag}':");
  println!("  {} topics", stats.topics);
  println!("  {} ({:.2}%) with no reply", stats.no_reply, stats.percent_no_reply);
  println!(
    "  {} ({:.2}%) with an accepted answer",
    stats.accepted_answer, stats.percent_accepted_answer
  );
  println!("  {new_topics} new topics this month");
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDateTime;

  fn counts() -> RepoCounts {
    RepoCounts {
      prs_opened: 3,
      prs_merged: 2,
      issues_opened: 5,
      issues_closed: 4,
    }
  }

  #[test]
  fn melt_produces_four_rows_per_repo() {
    let rows = melt_counts("widgets", &counts());
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.repo == "widgets"));
    assert_eq!(rows[0].item_type, "PRs");
    assert_eq!(rows[0].state, "Opened");
    assert_eq!(rows[0].value, 3);
    assert_eq!(rows[1].value, 2);
  }

  #[test]
  fn activity_table_is_tab_separated_with_header() {
    let td = tempfile::TempDir::new().unwrap();
    let rows = melt_counts("widgets", &counts());
    let path = write_activity_table(td.path(), &rows).unwrap();

    let text = std::fs::read_to_string(path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("repo\titem_type\tstate\tvalue"));
    assert_eq!(lines.next(), Some("widgets\tPRs\tOpened\t3"));
  }

  #[test]
  fn topics_table_serializes_timestamps() {
    let td = tempfile::TempDir::new().unwrap();
    let topics = vec![TopicRecord {
      id: 7,
      title: "How do I configure widgets?".into(),
      created_at: NaiveDateTime::parse_from_str("2025-08-02T10:00:00", "%Y-%m-%dT%H:%M:%S").unwrap(),
      last_posted_at: None,
      posts_count: 2,
      has_accepted_answer: true,
    }];
    let path = write_topics_table(td.path(), "widgets", &topics).unwrap();
    assert!(path.ends_with("widgets.tsv"));

    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("How do I configure widgets?"));
    assert!(text.contains("2025-08-02T10:00:00"));
  }

  #[test]
  fn monthly_table_formats_percentages() {
    let td = tempfile::TempDir::new().unwrap();
    let series = vec![MonthlyTagStats {
      month: "2025-08".into(),
      new_topics: 2,
      stats: TagStats {
        topics: 2,
        no_reply: 1,
        accepted_answer: 1,
        percent_no_reply: 50.0,
        percent_accepted_answer: 50.0,
        mean_posts_per_topic: 2.5,
      },
    }];
    let path = write_monthly_table(td.path(), "widgets", &series).unwrap();

    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.starts_with("month\tnew_topics"));
    assert!(text.contains("2025-08\t2\t2\t1\t1\t50.00\t50.00\t2.50"));
  }
}
