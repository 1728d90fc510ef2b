use anyhow::{anyhow, Context, Result};
use log::warn;
use serde_json::Value;

use crate::model::TopicRecord;
use crate::util::parse_api_time;

// --- Trait seam for the Discourse API ---
pub trait DiscourseApi {
  fn topics_page(&self, tag: &str, page: u32) -> Result<Value>;
}

pub struct DiscourseHttpApi {
  agent: ureq::Agent,
  base_url: String,
}

impl DiscourseHttpApi {
  pub fn new(base_url: &str) -> Self {
    let agent: ureq::Agent = ureq::Agent::config_builder()
      .timeout_global(Some(std::time::Duration::from_secs(30)))
      .build()
      .into();
    Self {
      agent,
      base_url: base_url.trim_end_matches('/').to_string(),
    }
  }
}

impl DiscourseApi for DiscourseHttpApi {
  fn topics_page(&self, tag: &str, page: u32) -> Result<Value> {
    let url = format!(
      "{}/tag/{tag}.json?match_all_tags=true&page={page}&tags%5B%5D={tag}",
      self.base_url
    );

    let mut resp = self
      .agent
      .get(&url)
      .header("Accept", "application/json")
      .header("User-Agent", "org-activity-report")
      .call()
      .with_context(|| format!("GET {url}"))?;

    resp
      .body_mut()
      .read_json::<Value>()
      .with_context(|| format!("reading JSON from {url}"))
  }
}

/// Env-backed fixture: `OAR_TEST_TOPICS_JSON` holds a JSON array of page
/// bodies (each with the `topic_list.topics` shape the live API returns).
pub struct DiscourseEnvApi;

impl DiscourseApi for DiscourseEnvApi {
  fn topics_page(&self, _tag: &str, page: u32) -> Result<Value> {
    let raw = std::env::var("OAR_TEST_TOPICS_JSON").unwrap_or_else(|_| "[]".into());
    let pages: Value = serde_json::from_str(&raw).context("parsing OAR_TEST_TOPICS_JSON")?;
    let pages = pages
      .as_array()
      .ok_or_else(|| anyhow!("OAR_TEST_TOPICS_JSON must be a JSON array of pages"))?;

    Ok(
      pages
        .get(page as usize - 1)
        .cloned()
        .unwrap_or_else(|| serde_json::json!({"topic_list": {"topics": []}})),
    )
  }
}

pub fn build_api(base_url: &str) -> Box<dyn DiscourseApi> {
  if std::env::var("OAR_TEST_TOPICS_JSON").is_ok() {
    Box::new(DiscourseEnvApi)
  } else {
    Box::new(DiscourseHttpApi::new(base_url))
  }
}

// --- JSON parsing boundary ---

pub fn parse_topic(v: &Value) -> Result<TopicRecord> {
  let id = v
    .get("id")
    .and_then(Value::as_i64)
    .ok_or_else(|| anyhow!("topic missing id"))?;
  let created_raw = v
    .get("created_at")
    .and_then(Value::as_str)
    .ok_or_else(|| anyhow!("topic {id} missing created_at"))?;

  let last_posted_at = match v.get("last_posted_at").and_then(Value::as_str) {
    Some(raw) => Some(parse_api_time(raw)?),
    None => None,
  };

  Ok(TopicRecord {
    id,
    title: v.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
    created_at: parse_api_time(created_raw)?,
    last_posted_at,
    posts_count: v.get("posts_count").and_then(Value::as_i64).unwrap_or(0),
    has_accepted_answer: v.get("has_accepted_answer").and_then(Value::as_bool).unwrap_or(false),
  })
}

/// Page through one tag's topic listing, starting at 1, until an empty page or
/// the debug page limit. Failures truncate the walk and keep partial results.
pub fn fetch_topics(api: &dyn DiscourseApi, tag: &str, page_limit: Option<u32>) -> Vec<TopicRecord> {
  let mut out = Vec::new();
  let mut page = 1;

  loop {
    if page_limit.is_some_and(|limit| page > limit) {
      break;
    }

    let body = match api.topics_page(tag, page) {
      Ok(v) => v,
      Err(err) => {
        warn!("tag {tag}: page {page} failed, keeping {} topics: {err:#}", out.len());
        break;
      }
    };

    let Some(topics) = body
      .get("topic_list")
      .and_then(|v| v.get("topics"))
      .and_then(Value::as_array)
    else {
      warn!("tag {tag}: page {page} has no topic_list, keeping {} topics", out.len());
      break;
    };

    if topics.is_empty() {
      break;
    }

    for topic in topics {
      match parse_topic(topic) {
        Ok(rec) => out.push(rec),
        Err(err) => {
          warn!("tag {tag}: malformed topic on page {page}, stopping: {err:#}");
          return out;
        }
      }
    }

    page += 1;
  }

  out
}
