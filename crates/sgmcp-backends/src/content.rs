use crate::graphql::{GraphqlFailure, GraphqlTransport, graphql_errors};
use crate::protocols::ContentFetcher;
use serde::Deserialize;
use serde_json::{Value, json};
use sgmcp_core::constants::MAX_FILE_SIZE;
use sgmcp_core::error::{ConfigError, FetchError};
use sgmcp_core::types::ContentRequest;
use std::time::Duration;
use tracing::debug;

const CONTENT_QUERY: &str = r#"
query Content($repo: String!, $rev: String!, $path: String!, $recursive: Boolean!) {
  repository(name: $repo) {
    commit(rev: $rev) {
      path(path: $path) {
        __typename
        ... on GitBlob { content binary byteSize }
        ... on GitTree { entries(recursive: $recursive) { path isDirectory } }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum PathNode {
    GitBlob {
        #[serde(default)]
        content: String,
        #[serde(default)]
        binary: bool,
        #[serde(default, rename = "byteSize")]
        byte_size: u64,
    },
    GitTree {
        #[serde(default)]
        entries: Vec<TreeEntry>,
    },
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(default, rename = "isDirectory")]
    is_directory: bool,
}

/// Content backend backed by the Sourcegraph GraphQL `repository` field.
#[derive(Debug, Clone)]
pub struct SourcegraphContentFetcher {
    transport: GraphqlTransport,
}

impl SourcegraphContentFetcher {
    pub fn new(endpoint: &str, token: Option<&str>, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            transport: GraphqlTransport::new(endpoint, token, timeout)?,
        })
    }
}

impl ContentFetcher for SourcegraphContentFetcher {
    fn get_content(&self, request: &ContentRequest) -> Result<String, FetchError> {
        let path = normalize_path(&request.path);
        let not_found =
            || FetchError::not_found(&request.repository, path.as_str(), &request.r#ref);

        debug!(
            repository = %request.repository,
            path = %path,
            git_ref = %request.r#ref,
            depth = request.depth,
            "Fetching content"
        );

        let body = self
            .transport
            .execute(
                CONTENT_QUERY,
                json!({
                    "repo": request.repository,
                    "rev": request.r#ref,
                    "path": path,
                    "recursive": request.depth > 1,
                }),
            )
            .map_err(|failure| match failure {
                GraphqlFailure::Status { status: 404, .. } => not_found(),
                GraphqlFailure::Decode(e) => FetchError::malformed(e),
                other => FetchError::upstream(other),
            })?;

        if let Some(first) = graphql_errors(&body).into_iter().next() {
            if first.to_ascii_lowercase().contains("not found") {
                return Err(not_found());
            }
            return Err(FetchError::Upstream(first));
        }

        let node = resolve_node(&body).ok_or_else(not_found)?;
        let node = PathNode::deserialize(node).map_err(FetchError::malformed)?;

        let text = match node {
            PathNode::GitBlob {
                binary: true,
                byte_size,
                ..
            } => format!("<binary file, {} bytes>", byte_size),
            PathNode::GitBlob { content, .. } => content,
            PathNode::GitTree { entries } => {
                render_tree(&request.repository, &path, entries, request.depth)
            }
        };

        Ok(truncate_chars(text, MAX_FILE_SIZE))
    }
}

/// Walk `data.repository.commit.path`; `None` when any level is missing or null.
fn resolve_node(body: &Value) -> Option<&Value> {
    body.pointer("/data/repository/commit/path")
        .filter(|node| !node.is_null())
}

fn normalize_path(path: &str) -> String {
    path.trim().trim_matches('/').to_string()
}

/// Render a directory listing `depth` levels below `base`, one entry per line,
/// indented two spaces per level. Directories end with `/`. Rows are sorted by
/// path components so children always follow their parent.
fn render_tree(repository: &str, base: &str, entries: Vec<TreeEntry>, depth: usize) -> String {
    let prefix = if base.is_empty() {
        String::new()
    } else {
        format!("{}/", base)
    };

    let mut rows: Vec<(Vec<String>, bool)> = entries
        .into_iter()
        .filter_map(|entry| {
            let relative = entry.path.strip_prefix(&prefix)?.trim_matches('/');
            if relative.is_empty() {
                return None;
            }
            let components: Vec<String> = relative.split('/').map(str::to_string).collect();
            (components.len() <= depth).then_some((components, entry.is_directory))
        })
        .collect();
    rows.sort();
    rows.dedup();

    let mut out = if base.is_empty() {
        format!("{}/\n", repository)
    } else {
        format!("{}/\n", base)
    };
    for (components, is_directory) in rows {
        let level = components.len();
        let name = components.last().map(String::as_str).unwrap_or_default();
        out.push_str(&"  ".repeat(level));
        out.push_str(name);
        if is_directory {
            out.push('/');
        }
        out.push('\n');
    }
    out
}

/// Keep the first `max` characters. Char-based so a UTF-8 sequence is never split.
fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => {
            debug!(limit = max, "Truncating content");
            text[..cut].to_string()
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, is_directory: bool) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            is_directory,
        }
    }

    fn sample_entries() -> Vec<TreeEntry> {
        vec![
            entry("src/main.rs", false),
            entry("src", true),
            entry("src/net", true),
            entry("src/net/http.rs", false),
            entry("Cargo.toml", false),
        ]
    }

    #[test]
    fn tree_lists_two_levels_from_root() {
        let listing = render_tree("github.com/acme/widget", "", sample_entries(), 2);
        assert_eq!(
            listing,
            "github.com/acme/widget/\n  Cargo.toml\n  src/\n    main.rs\n    net/\n"
        );
    }

    #[test]
    fn tree_is_relative_to_requested_directory() {
        let listing = render_tree("github.com/acme/widget", "src", sample_entries(), 1);
        assert_eq!(listing, "src/\n  main.rs\n  net/\n");
    }

    #[test]
    fn tree_ignores_upstream_order() {
        let shuffled = vec![
            entry("src/net/http.rs", false),
            entry("Cargo.toml", false),
            entry("src/net", true),
            entry("README.md", false),
            entry("src/main.rs", false),
            entry("src", true),
        ];
        let listing = render_tree("github.com/acme/widget", "", shuffled, 3);
        assert_eq!(
            listing,
            "github.com/acme/widget/
  Cargo.toml
  README.md
  src/
    main.rs
    net/
      http.rs
"
        );
    }

    #[test]
    fn depth_zero_lists_only_the_directory() {
        let listing = render_tree("github.com/acme/widget", "src", sample_entries(), 0);
        assert_eq!(listing, "src/\n");
    }

    #[test]
    fn truncation_keeps_exact_prefix() {
        let text = "ab".repeat(60_000);
        let truncated = truncate_chars(text.clone(), MAX_FILE_SIZE);
        assert_eq!(truncated.len(), MAX_FILE_SIZE);
        assert_eq!(truncated, text[..MAX_FILE_SIZE]);
        assert_eq!(truncate_chars(truncated.clone(), MAX_FILE_SIZE), truncated);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "é".repeat(10);
        let truncated = truncate_chars(text, 4);
        assert_eq!(truncated, "éééé");
        assert_eq!(truncated.chars().count(), 4);
    }

    #[test]
    fn null_levels_resolve_to_none() {
        assert!(resolve_node(&json!({"data": {"repository": null}})).is_none());
        assert!(resolve_node(&json!({"data": {"repository": {"commit": null}}})).is_none());
        assert!(
            resolve_node(&json!({"data": {"repository": {"commit": {"path": null}}}})).is_none()
        );
    }

    #[test]
    fn path_node_decodes_by_typename() {
        let blob = json!({"__typename": "GitBlob", "content": "fn main() {}", "binary": false, "byteSize": 12});
        assert!(matches!(
            PathNode::deserialize(&blob).unwrap(),
            PathNode::GitBlob { ref content, .. } if content == "fn main() {}"
        ));
        let tree = json!({"__typename": "GitTree", "entries": [{"path": "a", "isDirectory": true}]});
        assert!(matches!(
            PathNode::deserialize(&tree).unwrap(),
            PathNode::GitTree { ref entries } if entries.len() == 1
        ));
    }

    #[test]
    fn leading_and_trailing_slashes_are_ignored() {
        assert_eq!(normalize_path("/src/net/"), "src/net");
        assert_eq!(normalize_path(""), "");
    }
}
