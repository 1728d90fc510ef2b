use chrono::NaiveDateTime;
use serde::Serialize;

// Typed records produced at the JSON parsing boundary of each API client,
// plus the per-window classification result.

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ItemKind {
  Issue,
  PullRequest,
}

/// One pull request or issue from the GitHub REST API.
#[derive(Clone, Debug)]
pub struct IssueRecord {
  pub number: i64,
  pub html_url: String,
  pub kind: ItemKind,
  pub created_at: NaiveDateTime,
  pub closed_at: Option<NaiveDateTime>,
  /// Present only for merged pull requests; a closed PR without it was
  /// discarded, not integrated.
  pub merged_at: Option<NaiveDateTime>,
}

impl IssueRecord {
  pub fn is_merged(&self) -> bool {
    self.merged_at.is_some()
  }
}

/// One forum topic from a Discourse tag listing.
#[derive(Clone, Debug, Serialize)]
pub struct TopicRecord {
  pub id: i64,
  pub title: String,
  pub created_at: NaiveDateTime,
  pub last_posted_at: Option<NaiveDateTime>,
  pub posts_count: i64,
  pub has_accepted_answer: bool,
}

impl TopicRecord {
  /// A topic whose only post is the opening one never got a reply.
  pub fn has_no_reply(&self) -> bool {
    self.posts_count == 1
  }
}

/// Window classification of a single record. Opening and closing are
/// independent: both can be true for the same window.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Activity {
  pub opened_in_window: bool,
  pub closed_in_window: bool,
}
