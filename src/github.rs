use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDateTime;
use log::{debug, warn};
use serde_json::Value;

use crate::model::{IssueRecord, ItemKind};
use crate::util::parse_api_time;

const API_ROOT: &str = "https://api.github.com";
const PER_PAGE: u32 = 100;

// --- Trait seam for the GitHub API ---
// Lets the pagination loop run against HTTP or env-var fixtures.
pub trait GithubApi {
  fn issues_page(&self, owner: &str, repo: &str, state: &str, page: u32) -> Result<Value>;
  fn pulls_page(&self, owner: &str, repo: &str, state: &str, page: u32) -> Result<Value>;
}

/// Discover a GitHub token from the environment. Anonymous access works too,
/// with a much lower rate limit.
pub fn get_github_token() -> Option<String> {
  for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
    if let Ok(t) = std::env::var(var) {
      if !t.trim().is_empty() {
        return Some(t);
      }
    }
  }
  None
}

pub struct GithubHttpApi {
  agent: ureq::Agent,
  token: Option<String>,
}

impl GithubHttpApi {
  pub fn new(token: Option<String>) -> Self {
    let agent: ureq::Agent = ureq::Agent::config_builder()
      .timeout_global(Some(std::time::Duration::from_secs(30)))
      .build()
      .into();
    Self { agent, token }
  }

  fn get_json(&self, url: &str) -> Result<Value> {
    let mut req = self
      .agent
      .get(url)
      .header("Accept", "application/vnd.github+json")
      .header("User-Agent", "org-activity-report");

    if let Some(token) = &self.token {
      req = req.header("Authorization", &format!("Bearer {token}"));
    }

    let mut resp = req.call().with_context(|| format!("GET {url}"))?;
    resp
      .body_mut()
      .read_json::<Value>()
      .with_context(|| format!("reading JSON from {url}"))
  }
}

impl GithubApi for GithubHttpApi {
  fn issues_page(&self, owner: &str, repo: &str, state: &str, page: u32) -> Result<Value> {
    let url = format!("{API_ROOT}/repos/{owner}/{repo}/issues?state={state}&per_page={PER_PAGE}&page={page}");
    self.get_json(&url)
  }

  fn pulls_page(&self, owner: &str, repo: &str, state: &str, page: u32) -> Result<Value> {
    let url = format!("{API_ROOT}/repos/{owner}/{repo}/pulls?state={state}&per_page={PER_PAGE}&page={page}");
    self.get_json(&url)
  }
}

// Env-backed fixtures: each variable holds a JSON array of pages, so tests can
// exercise the pagination loop without a network.
pub struct GithubEnvApi;

impl GithubEnvApi {
  fn page_from_env(var: &str, page: u32) -> Result<Value> {
    let raw = std::env::var(var).unwrap_or_else(|_| "[]".into());
    let pages: Value = serde_json::from_str(&raw).with_context(|| format!("parsing {var}"))?;
    let pages = pages
      .as_array()
      .ok_or_else(|| anyhow!("{var} must be a JSON array of pages"))?;

    Ok(
      pages
        .get(page as usize - 1)
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new())),
    )
  }
}

impl GithubApi for GithubEnvApi {
  fn issues_page(&self, _owner: &str, _repo: &str, _state: &str, page: u32) -> Result<Value> {
    Self::page_from_env("OAR_TEST_ISSUES_JSON", page)
  }

  fn pulls_page(&self, _owner: &str, _repo: &str, _state: &str, page: u32) -> Result<Value> {
    Self::page_from_env("OAR_TEST_PULLS_JSON", page)
  }
}

fn env_wants_mock() -> bool {
  std::env::var("OAR_TEST_ISSUES_JSON").is_ok() || std::env::var("OAR_TEST_PULLS_JSON").is_ok()
}

pub fn build_api() -> Box<dyn GithubApi> {
  if env_wants_mock() {
    Box::new(GithubEnvApi)
  } else {
    Box::new(GithubHttpApi::new(get_github_token()))
  }
}

// --- JSON parsing boundary ---

/// Parse one issues-endpoint record. Returns `None` for pull requests, which
/// the issues endpoint also lists; counting them twice would inflate the
/// issue totals.
pub fn parse_issue(item: &Value) -> Result<Option<IssueRecord>> {
  if item.get("pull_request").is_some_and(|v| !v.is_null()) {
    return Ok(None);
  }
  parse_record(item, ItemKind::Issue).map(Some)
}

pub fn parse_pull(item: &Value) -> Result<IssueRecord> {
  parse_record(item, ItemKind::PullRequest)
}

fn parse_record(item: &Value, kind: ItemKind) -> Result<IssueRecord> {
  let number = item
    .get("number")
    .and_then(Value::as_i64)
    .ok_or_else(|| anyhow!("record missing number"))?;
  let html_url = item
    .get("html_url")
    .and_then(Value::as_str)
    .ok_or_else(|| anyhow!("record #{number} missing html_url"))?
    .to_string();
  let created_raw = item
    .get("created_at")
    .and_then(Value::as_str)
    .ok_or_else(|| anyhow!("record #{number} missing created_at"))?;
  let created_at = parse_api_time(created_raw)?;

  let closed_at = optional_time(item, "closed_at")?;
  let merged_at = match kind {
    ItemKind::PullRequest => optional_time(item, "merged_at")?,
    ItemKind::Issue => None,
  };

  Ok(IssueRecord {
    number,
    html_url,
    kind,
    created_at,
    closed_at,
    merged_at,
  })
}

fn optional_time(item: &Value, key: &str) -> Result<Option<NaiveDateTime>> {
  match item.get(key) {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) => parse_api_time(s).map(Some),
    Some(other) => bail!("unexpected {key} value: {other}"),
  }
}

// --- Pagination ---

/// Walk one listing page by page, starting at 1, until an empty page or the
/// debug page limit. A failed request or a malformed page truncates the walk:
/// partial results are kept, this is a best-effort reporting tool.
fn fetch_records<G, P>(what: &str, page_limit: Option<u32>, mut get_page: G, parse: P) -> Vec<IssueRecord>
where
  G: FnMut(u32) -> Result<Value>,
  P: Fn(&Value) -> Result<Option<IssueRecord>>,
{
  let mut out = Vec::new();
  let mut page = 1;

  loop {
    if page_limit.is_some_and(|limit| page > limit) {
      break;
    }

    let body = match get_page(page) {
      Ok(v) => v,
      Err(err) => {
        warn!("{what}: page {page} failed, keeping {} records: {err:#}", out.len());
        break;
      }
    };

    let Some(items) = body.as_array() else {
      warn!("{what}: page {page} is not a JSON array, keeping {} records", out.len());
      break;
    };

    if items.is_empty() {
      break;
    }

    for item in items {
      match parse(item) {
        Ok(Some(rec)) => {
          debug!("{what}: #{} {}", rec.number, rec.html_url);
          out.push(rec);
        }
        Ok(None) => {}
        Err(err) => {
          warn!("{what}: malformed record on page {page}, stopping: {err:#}");
          return out;
        }
      }
    }

    page += 1;
  }

  out
}

pub fn fetch_issues(
  api: &dyn GithubApi,
  owner: &str,
  repo: &str,
  state: &str,
  page_limit: Option<u32>,
) -> Vec<IssueRecord> {
  let what = format!("{owner}/{repo} issues");
  fetch_records(&what, page_limit, |page| api.issues_page(owner, repo, state, page), parse_issue)
}

pub fn fetch_pulls(
  api: &dyn GithubApi,
  owner: &str,
  repo: &str,
  state: &str,
  page_limit: Option<u32>,
) -> Vec<IssueRecord> {
  let what = format!("{owner}/{repo} pulls");
  fetch_records(&what, page_limit, |page| api.pulls_page(owner, repo, state, page), |item| {
    parse_pull(item).map(Some)
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  fn issue_json(number: i64, created: &str, closed: Option<&str>) -> Value {
    serde_json::json!({
      "number": number,
      "html_url": format!("https://github.com/acme/widgets/issues/{number}"),
      "created_at": created,
      "closed_at": closed,
    })
  }

  #[test]
  fn parse_issue_skips_pull_request_payload() {
    let mut v = issue_json(7, "2025-08-02T10:00:00Z", None);
    v["pull_request"] = serde_json::json!({"url": "https://api.github.com/repos/acme/widgets/pulls/7"});
    assert!(parse_issue(&v).unwrap().is_none());
  }

  #[test]
  fn parse_issue_reads_timestamps() {
    let v = issue_json(7, "2025-08-02T10:00:00Z", Some("2025-08-03T09:00:00Z"));
    let rec = parse_issue(&v).unwrap().unwrap();
    assert_eq!(rec.number, 7);
    assert_eq!(rec.kind, ItemKind::Issue);
    assert_eq!(rec.created_at.to_string(), "2025-08-02 10:00:00");
    assert!(rec.closed_at.is_some());
    assert!(!rec.is_merged());
  }

  #[test]
  fn parse_pull_reads_merged_at() {
    let v = serde_json::json!({
      "number": 12,
      "html_url": "https://github.com/acme/widgets/pull/12",
      "created_at": "2025-08-02T10:00:00Z",
      "closed_at": "2025-08-05T10:00:00Z",
      "merged_at": "2025-08-05T10:00:00Z",
    });
    let rec = parse_pull(&v).unwrap();
    assert_eq!(rec.kind, ItemKind::PullRequest);
    assert!(rec.is_merged());
  }

  #[test]
  fn parse_record_missing_created_at_is_error() {
    let v = serde_json::json!({
      "number": 3,
      "html_url": "https://github.com/acme/widgets/issues/3",
    });
    assert!(parse_issue(&v).is_err());
  }

  #[test]
  #[serial]
  fn env_api_pages_until_empty() {
    let pages = serde_json::json!([
      [issue_json(1, "2025-08-01T00:00:00Z", None)],
      [issue_json(2, "2025-08-02T00:00:00Z", None)],
    ]);
    std::env::set_var("OAR_TEST_ISSUES_JSON", pages.to_string());

    let api = GithubEnvApi;
    let out = fetch_issues(&api, "acme", "widgets", "all", None);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].number, 1);
    assert_eq!(out[1].number, 2);

    std::env::remove_var("OAR_TEST_ISSUES_JSON");
  }

  #[test]
  #[serial]
  fn page_limit_truncates_fetch() {
    let pages = serde_json::json!([
      [issue_json(1, "2025-08-01T00:00:00Z", None)],
      [issue_json(2, "2025-08-02T00:00:00Z", None)],
      [issue_json(3, "2025-08-03T00:00:00Z", None)],
    ]);
    std::env::set_var("OAR_TEST_ISSUES_JSON", pages.to_string());

    let api = GithubEnvApi;
    let out = fetch_issues(&api, "acme", "widgets", "all", Some(2));
    assert_eq!(out.len(), 2);

    std::env::remove_var("OAR_TEST_ISSUES_JSON");
  }

  #[test]
  #[serial]
  fn malformed_record_keeps_partial_results() {
    let pages = serde_json::json!([
      [
        issue_json(1, "2025-08-01T00:00:00Z", None),
        {"number": 2}
      ],
    ]);
    std::env::set_var("OAR_TEST_ISSUES_JSON", pages.to_string());

    let api = GithubEnvApi;
    let out = fetch_issues(&api, "acme", "widgets", "all", None);
    assert_eq!(out.len(), 1);

    std::env::remove_var("OAR_TEST_ISSUES_JSON");
  }

  #[test]
  #[serial]
  fn transport_error_keeps_partial_results() {
    // Broken fixture JSON makes the very first request fail.
    std::env::set_var("OAR_TEST_PULLS_JSON", "not json");

    let api = GithubEnvApi;
    let out = fetch_pulls(&api, "acme", "widgets", "all", None);
    assert!(out.is_empty());

    std::env::remove_var("OAR_TEST_PULLS_JSON");
  }

  #[test]
  #[serial]
  fn token_env_precedence() {
    std::env::set_var("GITHUB_TOKEN", "primary");
    std::env::set_var("GH_TOKEN", "secondary");
    assert_eq!(get_github_token().as_deref(), Some("primary"));

    std::env::remove_var("GITHUB_TOKEN");
    assert_eq!(get_github_token().as_deref(), Some("secondary"));

    std::env::remove_var("GH_TOKEN");
    std::env::set_var("GITHUB_TOKEN", "   ");
    assert_eq!(get_github_token(), None);
    std::env::remove_var("GITHUB_TOKEN");
  }
}
