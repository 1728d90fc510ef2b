use crate::model::{Activity, IssueRecord, ItemKind, TopicRecord};
use crate::window::MonthWindow;

/// Classify one pull request or issue against a month window.
///
/// Opening and closing are independent metrics: a record created and closed
/// inside the same window counts once in each. A pull request closed without
/// being merged never counts as closed, regardless of window.
pub fn classify_issue(rec: &IssueRecord, window: &MonthWindow) -> Activity {
  let opened_in_window = window.contains(rec.created_at);

  let closed_in_window = match rec.closed_at {
    Some(closed) if window.contains(closed) => match rec.kind {
      ItemKind::PullRequest => rec.is_merged(),
      ItemKind::Issue => true,
    },
    _ => false,
  };

  Activity {
    opened_in_window,
    closed_in_window,
  }
}

/// A topic is "new" for a window when it was created inside it.
pub fn topic_in_window(topic: &TopicRecord, window: &MonthWindow) -> bool {
  window.contains(topic.created_at)
}
