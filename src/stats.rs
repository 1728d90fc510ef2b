use anyhow::Result;
use serde::Serialize;

use crate::classify::{classify_issue, topic_in_window};
use crate::model::{IssueRecord, ItemKind, TopicRecord};
use crate::window::{self, MonthWindow};

/// Per-repository activity counts for one window. "Merged" deliberately, not
/// "closed": discarded pull requests are not integration work.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct RepoCounts {
  pub prs_opened: u64,
  pub prs_merged: u64,
  pub issues_opened: u64,
  pub issues_closed: u64,
}

pub fn aggregate_repo(records: &[IssueRecord], window: &MonthWindow) -> RepoCounts {
  let mut counts = RepoCounts::default();

  for rec in records {
    let act = classify_issue(rec, window);

    match rec.kind {
      ItemKind::PullRequest => {
        if act.opened_in_window {
          counts.prs_opened += 1;
        }
        if act.closed_in_window {
          counts.prs_merged += 1;
        }
      }
      ItemKind::Issue => {
        if act.opened_in_window {
          counts.issues_opened += 1;
        }
        if act.closed_in_window {
          counts.issues_closed += 1;
        }
      }
    }
  }

  counts
}

/// Whole-set statistics for one tag's topics.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TagStats {
  pub topics: u64,
  pub no_reply: u64,
  pub accepted_answer: u64,
  pub percent_no_reply: f64,
  pub percent_accepted_answer: f64,
  pub mean_posts_per_topic: f64,
}

/// Compute tag statistics. An empty set yields all-zero percentages and mean
/// rather than dividing by zero.
pub fn tag_stats(topics: &[TopicRecord]) -> TagStats {
  let total = topics.len() as u64;
  let no_reply = topics.iter().filter(|t| t.has_no_reply()).count() as u64;
  let accepted = topics.iter().filter(|t| t.has_accepted_answer).count() as u64;

  let mut stats = TagStats {
    topics: total,
    no_reply,
    accepted_answer: accepted,
    ..TagStats::default()
  };

  if total > 0 {
    stats.percent_no_reply = no_reply as f64 / total as f64 * 100.0;
    stats.percent_accepted_answer = accepted as f64 / total as f64 * 100.0;
    stats.mean_posts_per_topic = topics.iter().map(|t| t.posts_count as f64).sum::<f64>() / total as f64;
  }

  stats
}

/// One month of the trailing time series for a tag.
#[derive(Clone, Debug)]
pub struct MonthlyTagStats {
  pub month: String, // YYYY-MM
  pub new_topics: u64,
  pub stats: TagStats,
}

/// Build the trailing time series: the anchor month first, then backward
/// month by month, wrapping the year at the January boundary. Each entry
/// holds the stats of the topics created in that month.
pub fn build_time_series(
  topics: &[TopicRecord],
  anchor_month: u32,
  anchor_year: i32,
  trailing_months: u32,
) -> Result<Vec<MonthlyTagStats>> {
  let mut out = Vec::with_capacity(trailing_months as usize);

  for (month, year) in window::trailing_months(anchor_month, anchor_year, trailing_months) {
    let w = window::month_window(month, year)?;
    let slice: Vec<TopicRecord> = topics.iter().filter(|t| topic_in_window(t, &w)).cloned().collect();

    out.push(MonthlyTagStats {
      month: w.label(),
      new_topics: slice.len() as u64,
      stats: tag_stats(&slice),
    });
  }

  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDateTime;

  fn ts(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").unwrap()
  }

  fn issue(created: &str, closed: Option<&str>) -> IssueRecord {
    IssueRecord {
      number: 0,
      html_url: String::new(),
      kind: ItemKind::Issue,
      created_at: ts(created),
      closed_at: closed.map(ts),
      merged_at: None,
    }
  }

  fn topic(created: &str, posts: i64, accepted: bool) -> TopicRecord {
    TopicRecord {
      id: 0,
      title: String::new(),
      created_at: ts(created),
      last_posted_at: None,
      posts_count: posts,
      has_accepted_answer: accepted,
    }
  }

  #[test]
  fn synthetic_issue_scenario() {
    // (a) created this month, open; (b) created last month, closed this
    // month; (c) created and closed two months ago.
    let records = vec![
      issue("2025-08-10T12:00:00", None),
      issue("2025-07-20T12:00:00", Some("2025-08-05T12:00:00")),
      issue("2025-06-01T12:00:00", Some("2025-06-15T12:00:00")),
    ];
    let w = window::month_window(8, 2025).unwrap();
    let counts = aggregate_repo(&records, &w);
    assert_eq!(counts.issues_opened, 1);
    assert_eq!(counts.issues_closed, 1);
    assert_eq!(counts.prs_opened, 0);
    assert_eq!(counts.prs_merged, 0);
  }

  #[test]
  fn same_window_open_and_close_counts_twice() {
    let records = vec![issue("2025-08-01T00:00:00", Some("2025-08-02T00:00:00"))];
    let w = window::month_window(8, 2025).unwrap();
    let counts = aggregate_repo(&records, &w);
    assert_eq!(counts.issues_opened, 1);
    assert_eq!(counts.issues_closed, 1);
  }

  #[test]
  fn empty_tag_stats_are_zero_not_nan() {
    let stats = tag_stats(&[]);
    assert_eq!(stats.topics, 0);
    assert_eq!(stats.percent_no_reply, 0.0);
    assert_eq!(stats.percent_accepted_answer, 0.0);
    assert_eq!(stats.mean_posts_per_topic, 0.0);
  }

  #[test]
  fn tag_stats_percentages_and_mean() {
    let topics = vec![
      topic("2025-08-01T00:00:00", 1, false),
      topic("2025-08-02T00:00:00", 3, true),
      topic("2025-08-03T00:00:00", 5, true),
      topic("2025-08-04T00:00:00", 1, false),
    ];
    let stats = tag_stats(&topics);
    assert_eq!(stats.topics, 4);
    assert_eq!(stats.no_reply, 2);
    assert_eq!(stats.accepted_answer, 2);
    assert_eq!(stats.percent_no_reply, 50.0);
    assert_eq!(stats.percent_accepted_answer, 50.0);
    assert_eq!(stats.mean_posts_per_topic, 2.5);
  }

  #[test]
  fn time_series_wraps_year_backward() {
    let series = build_time_series(&[], 1, 2025, 3).unwrap();
    let labels: Vec<&str> = series.iter().map(|m| m.month.as_str()).collect();
    assert_eq!(labels, vec!["2025-01", "2024-12", "2024-11"]);
  }

  #[test]
  fn time_series_slices_by_creation_month() {
    let topics = vec![
      topic("2025-08-10T00:00:00", 1, false),
      topic("2025-08-20T00:00:00", 2, true),
      topic("2025-07-05T00:00:00", 1, false),
    ];
    let series = build_time_series(&topics, 8, 2025, 2).unwrap();
    assert_eq!(series[0].new_topics, 2);
    assert_eq!(series[0].stats.accepted_answer, 1);
    assert_eq!(series[1].new_topics, 1);
    assert_eq!(series[1].stats.percent_no_reply, 100.0);
  }
}
