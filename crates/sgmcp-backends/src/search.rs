use crate::graphql::{GraphqlFailure, GraphqlTransport, graphql_errors};
use crate::protocols::SearchClient;
use serde::Deserialize;
use serde_json::{Value, json};
use sgmcp_core::error::{ConfigError, SearchError};
use sgmcp_core::types::{FormattedResult, Match};
use std::time::Duration;
use tracing::{debug, warn};

const SEARCH_QUERY: &str = r#"
query Search($query: String!) {
  search(query: $query, version: V3) {
    results {
      limitHit
      matchCount
      alert {
        title
        description
      }
      results {
        __typename
        ... on FileMatch {
          repository { name }
          file { path url }
          lineMatches { preview lineNumber }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct FileMatchEntry {
    repository: RepositoryRef,
    file: FileRef,
    #[serde(default, rename = "lineMatches")]
    line_matches: Vec<LineMatch>,
}

#[derive(Debug, Deserialize)]
struct RepositoryRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    path: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct LineMatch {
    #[serde(default)]
    preview: String,
    /// 0-based in the upstream schema.
    #[serde(rename = "lineNumber")]
    line_number: u32,
}

/// Notice Sourcegraph attaches to a search it could not run as written.
#[derive(Debug, Deserialize)]
struct SearchAlert {
    title: String,
    #[serde(default)]
    description: Option<String>,
}

/// Fragments of GraphQL error messages that blame the query text.
const QUERY_ERROR_MARKERS: &[&str] = &["query", "filter", "pattern", "regex", "parse"];

/// Fragments that mark a server-side failure even when the query is named.
const SERVICE_ERROR_MARKERS: &[&str] = &["timeout", "timed out", "deadline", "unavailable"];

/// Search backend backed by the Sourcegraph GraphQL `search` field.
#[derive(Debug, Clone)]
pub struct SourcegraphClient {
    transport: GraphqlTransport,
}

impl SourcegraphClient {
    pub fn new(endpoint: &str, token: Option<&str>, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            transport: GraphqlTransport::new(endpoint, token, timeout)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    fn absolute_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.transport.endpoint(), url)
        } else {
            url.to_string()
        }
    }
}

impl SearchClient for SourcegraphClient {
    fn search(&self, query: &str, limit: usize) -> Result<Value, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("query must not be empty".into()));
        }

        let effective_query = with_count_filter(query, limit);
        debug!(query = %effective_query, "Executing Sourcegraph search");

        let body = self
            .transport
            .execute(SEARCH_QUERY, json!({ "query": effective_query }))
            .map_err(|failure| match failure {
                GraphqlFailure::Status { status: 400, body } => SearchError::InvalidQuery(body),
                GraphqlFailure::Decode(e) => SearchError::malformed(e),
                other => SearchError::upstream(other),
            })?;

        if let Some(first) = graphql_errors(&body).into_iter().next() {
            return Err(if is_query_error(&first) {
                SearchError::InvalidQuery(first)
            } else {
                SearchError::Upstream(first)
            });
        }

        if let Some(alert) = rejected_query_alert(&body) {
            return Err(SearchError::InvalidQuery(alert));
        }

        Ok(body)
    }

    fn format_results(
        &self,
        raw: &Value,
        limit: usize,
    ) -> Result<Vec<FormattedResult>, SearchError> {
        let entries = raw
            .pointer("/data/search/results/results")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SearchError::malformed("response has no data.search.results.results array")
            })?;

        let mut formatted = Vec::with_capacity(limit.min(entries.len()));
        if limit == 0 {
            return Ok(formatted);
        }

        for entry in entries {
            if entry.get("__typename").and_then(Value::as_str) != Some("FileMatch") {
                continue;
            }
            let file_match = match FileMatchEntry::deserialize(entry) {
                Ok(m) => m,
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable FileMatch entry");
                    continue;
                }
            };
            if file_match.line_matches.is_empty() {
                continue;
            }

            let matches = file_match
                .line_matches
                .into_iter()
                .map(|m| Match::new(m.line_number.saturating_add(1), m.preview))
                .collect();
            formatted.push(FormattedResult {
                filename: file_match.file.path,
                repository: file_match.repository.name,
                matches,
                url: self.absolute_url(&file_match.file.url),
            });

            if formatted.len() >= limit {
                break;
            }
        }

        Ok(formatted)
    }
}

fn is_query_error(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    if SERVICE_ERROR_MARKERS.iter().any(|m| message.contains(m)) {
        return false;
    }
    QUERY_ERROR_MARKERS.iter().any(|m| message.contains(m))
}

/// An alert that came back without any results means the query was not run.
/// Alerts next to results are advisory and only logged.
fn rejected_query_alert(body: &Value) -> Option<String> {
    let results = body.pointer("/data/search/results")?;
    let alert = results.get("alert").filter(|a| !a.is_null())?;
    let alert = match SearchAlert::deserialize(alert) {
        Ok(alert) => alert,
        Err(e) => {
            warn!(error = %e, "Ignoring undecodable search alert");
            return None;
        }
    };

    let has_results = results
        .get("results")
        .and_then(Value::as_array)
        .is_some_and(|r| !r.is_empty());
    if has_results {
        debug!(title = %alert.title, "Search returned results with an alert");
        return None;
    }

    Some(match alert.description.filter(|d| !d.trim().is_empty()) {
        Some(description) => format!("{}: {}", alert.title, description),
        None => alert.title,
    })
}

/// Append a `count:` filter so the upstream does not compute more than needed,
/// unless the query already carries one.
fn with_count_filter(query: &str, limit: usize) -> String {
    let query = query.trim();
    let has_count = query
        .split_whitespace()
        .any(|token| token.to_ascii_lowercase().starts_with("count:"));
    if has_count {
        query.to_string()
    } else {
        format!("{} count:{}", query, limit)
    }
}
