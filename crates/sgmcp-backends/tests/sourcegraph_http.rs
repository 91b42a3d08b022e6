//! Backend behaviour against an in-process stub of the Sourcegraph GraphQL API.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use serde_json::{Value, json};
use sgmcp_backends::{ContentFetcher, SearchClient, SourcegraphClient, SourcegraphContentFetcher};
use sgmcp_core::constants::{MAX_FILE_SIZE, SEARCH_RESULT_LIMIT};
use sgmcp_core::error::{FetchError, SearchError};
use sgmcp_core::types::ContentRequest;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct Recorded {
    authorization: Option<String>,
    user_agent: Option<String>,
    body: Option<Value>,
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: Arc<String>,
    recorded: Arc<Mutex<Recorded>>,
}

struct Stub {
    endpoint: String,
    recorded: Arc<Mutex<Recorded>>,
}

impl Stub {
    fn variables(&self) -> Value {
        self.recorded
            .lock()
            .unwrap()
            .body
            .as_ref()
            .and_then(|b| b.get("variables").cloned())
            .expect("stub should have received a GraphQL request")
    }
}

async fn graphql(
    State(state): State<StubState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    {
        let mut recorded = state.recorded.lock().unwrap();
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        recorded.authorization = header("authorization");
        recorded.user_agent = header("user-agent");
        recorded.body = serde_json::from_slice(&body).ok();
    }
    (state.status, state.body.as_ref().clone())
}

fn spawn_stub(status: StatusCode, body: impl Into<String>) -> Stub {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let state = StubState {
        status,
        body: Arc::new(body.into()),
        recorded: Arc::clone(&recorded),
    };

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let app = Router::new()
                .route("/.api/graphql", post(graphql))
                .with_state(state);
            axum::serve(listener, app).await.unwrap();
        });
    });

    Stub {
        endpoint: format!("http://{}", addr),
        recorded,
    }
}

fn search_client(stub: &Stub, token: Option<&str>) -> SourcegraphClient {
    SourcegraphClient::new(&stub.endpoint, token, Duration::from_secs(5)).unwrap()
}

fn content_fetcher(stub: &Stub) -> SourcegraphContentFetcher {
    SourcegraphContentFetcher::new(&stub.endpoint, Some("sgp_test"), Duration::from_secs(5))
        .unwrap()
}

fn search_body(files: usize) -> String {
    let results: Vec<Value> = (0..files)
        .map(|i| {
            json!({
                "__typename": "FileMatch",
                "repository": {"name": "github.com/acme/widget"},
                "file": {
                    "path": format!("cmd/f{:02}.go", i),
                    "url": format!("/github.com/acme/widget/-/blob/cmd/f{:02}.go", i),
                },
                "lineMatches": [
                    {"preview": "// TODO: tidy", "lineNumber": 3},
                    {"preview": "// TODO: retry", "lineNumber": 17},
                ],
            })
        })
        .collect();
    json!({
        "data": {"search": {"results": {
            "limitHit": files > SEARCH_RESULT_LIMIT,
            "matchCount": files * 2,
            "results": results,
        }}}
    })
    .to_string()
}

fn blob_body(content: &str) -> String {
    json!({
        "data": {"repository": {"commit": {"path": {
            "__typename": "GitBlob",
            "content": content,
            "binary": false,
            "byteSize": content.len(),
        }}}}
    })
    .to_string()
}

#[test]
fn search_sends_count_filter_and_access_token() {
    let stub = spawn_stub(StatusCode::OK, search_body(2));
    let client = search_client(&stub, Some("sgp_abc"));

    let raw = client
        .search("repo:github.com/acme/widget lang:go TODO", SEARCH_RESULT_LIMIT)
        .unwrap();
    let results = client.format_results(&raw, SEARCH_RESULT_LIMIT).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].matches[0].line_number, 4);
    assert!(results[0].url.starts_with(&stub.endpoint));

    let recorded = stub.recorded.lock().unwrap();
    assert_eq!(recorded.authorization.as_deref(), Some("token sgp_abc"));
    assert!(
        recorded
            .user_agent
            .as_deref()
            .is_some_and(|ua| ua.starts_with("sgmcp/"))
    );
    drop(recorded);
    assert_eq!(
        stub.variables()["query"],
        "repo:github.com/acme/widget lang:go TODO count:30"
    );
}

#[test]
fn search_without_token_sends_no_authorization() {
    let stub = spawn_stub(StatusCode::OK, search_body(1));
    search_client(&stub, None).search("TODO", 5).unwrap();
    assert!(stub.recorded.lock().unwrap().authorization.is_none());
}

#[test]
fn search_caps_45_files_at_30_with_full_match_lists() {
    let stub = spawn_stub(StatusCode::OK, search_body(45));
    let client = search_client(&stub, None);

    let raw = client
        .search("repo:github.com/acme/widget lang:go TODO", SEARCH_RESULT_LIMIT)
        .unwrap();
    let results = client.format_results(&raw, SEARCH_RESULT_LIMIT).unwrap();

    assert_eq!(results.len(), 30);
    assert_eq!(results[29].filename, "cmd/f29.go");
    assert!(results.iter().all(|r| r.matches.len() == 2));
}

#[test]
fn search_server_error_is_upstream() {
    let stub = spawn_stub(StatusCode::INTERNAL_SERVER_ERROR, "boom");
    let err = search_client(&stub, None).search("TODO", 30).unwrap_err();
    assert!(matches!(err, SearchError::Upstream(_)), "got {err:?}");
}

#[test]
fn search_graphql_errors_are_query_errors() {
    let body = json!({
        "data": null,
        "errors": [{"message": "invalid query: unsupported filter \"lnag\""}]
    });
    let stub = spawn_stub(StatusCode::OK, body.to_string());
    let err = search_client(&stub, None)
        .search("lnag:go TODO", 30)
        .unwrap_err();
    match err {
        SearchError::InvalidQuery(msg) => assert!(msg.contains("unsupported filter")),
        other => panic!("expected InvalidQuery, got {other:?}"),
    }
}

#[test]
fn search_server_side_graphql_error_is_upstream() {
    let body = json!({
        "data": null,
        "errors": [{"message": "context deadline exceeded"}]
    });
    let stub = spawn_stub(StatusCode::OK, body.to_string());
    let err = search_client(&stub, None).search("TODO", 30).unwrap_err();
    assert!(matches!(err, SearchError::Upstream(_)), "got {err:?}");
}

#[test]
fn search_alert_without_results_is_query_error() {
    let body = json!({"data": {"search": {"results": {
        "limitHit": false,
        "matchCount": 0,
        "alert": {"title": "Unable To Process Query", "description": "Unbalanced parentheses."},
        "results": [],
    }}}});
    let stub = spawn_stub(StatusCode::OK, body.to_string());
    let err = search_client(&stub, None)
        .search("repo:github.com/acme/widget (TODO", 30)
        .unwrap_err();
    match err {
        SearchError::InvalidQuery(msg) => assert!(msg.starts_with("Unable To Process Query")),
        other => panic!("expected InvalidQuery, got {other:?}"),
    }

    let document = stub.recorded.lock().unwrap().body.clone().unwrap();
    assert!(document["query"].as_str().unwrap().contains("alert"));
}

#[test]
fn search_non_json_body_is_malformed() {
    let stub = spawn_stub(StatusCode::OK, "<html>sign in</html>");
    let err = search_client(&stub, None).search("TODO", 30).unwrap_err();
    assert!(matches!(err, SearchError::Malformed(_)), "got {err:?}");
}

#[test]
fn unreachable_upstream_is_upstream_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let endpoint = format!("http://127.0.0.1:{}", port);

    let client = SourcegraphClient::new(&endpoint, None, Duration::from_secs(2)).unwrap();
    assert!(matches!(
        client.search("TODO", 30).unwrap_err(),
        SearchError::Upstream(_)
    ));

    let fetcher = SourcegraphContentFetcher::new(&endpoint, None, Duration::from_secs(2)).unwrap();
    assert!(matches!(
        fetcher
            .get_content(&ContentRequest::new("github.com/acme/widget"))
            .unwrap_err(),
        FetchError::Upstream(_)
    ));
}

#[test]
fn fetch_missing_path_is_not_found() {
    let body = json!({"data": {"repository": {"commit": {"path": null}}}});
    let stub = spawn_stub(StatusCode::OK, body.to_string());

    let request = ContentRequest::new("github.com/acme/widget").with_path("missing/file.go");
    let err = content_fetcher(&stub).get_content(&request).unwrap_err();
    match err {
        FetchError::NotFound {
            repository,
            path,
            git_ref,
        } => {
            assert_eq!(repository, "github.com/acme/widget");
            assert_eq!(path, "missing/file.go");
            assert_eq!(git_ref, "HEAD");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn fetch_missing_repository_is_not_found() {
    let stub = spawn_stub(
        StatusCode::OK,
        json!({"data": {"repository": null}}).to_string(),
    );
    let err = content_fetcher(&stub)
        .get_content(&ContentRequest::new("github.com/acme/nope"))
        .unwrap_err();
    assert!(matches!(err, FetchError::NotFound { .. }), "got {err:?}");
}

#[test]
fn fetch_graphql_revision_error_is_not_found() {
    let body = json!({
        "data": {"repository": {"commit": null}},
        "errors": [{"message": "revision not found: feature/x"}]
    });
    let stub = spawn_stub(StatusCode::OK, body.to_string());
    let request = ContentRequest::new("github.com/acme/widget").with_ref("feature/x");
    let err = content_fetcher(&stub).get_content(&request).unwrap_err();
    assert!(matches!(err, FetchError::NotFound { .. }), "got {err:?}");
}

#[test]
fn fetch_other_graphql_error_is_upstream() {
    let body = json!({"data": null, "errors": [{"message": "gitserver unavailable"}]});
    let stub = spawn_stub(StatusCode::OK, body.to_string());
    let err = content_fetcher(&stub)
        .get_content(&ContentRequest::new("github.com/acme/widget").with_path("go.mod"))
        .unwrap_err();
    assert!(matches!(err, FetchError::Upstream(_)), "got {err:?}");
}

#[test]
fn fetch_returns_small_file_verbatim() {
    let stub = spawn_stub(StatusCode::OK, blob_body("module github.com/acme/widget\n"));
    let request = ContentRequest::new("github.com/acme/widget").with_path("go.mod");
    let content = content_fetcher(&stub).get_content(&request).unwrap();
    assert_eq!(content, "module github.com/acme/widget\n");

    let variables = stub.variables();
    assert_eq!(variables["repo"], "github.com/acme/widget");
    assert_eq!(variables["path"], "go.mod");
    assert_eq!(variables["rev"], "HEAD");
}

#[test]
fn fetch_truncates_large_file_to_exact_prefix() {
    let big: String = (0..150_000)
        .map(|i| char::from(b'a' + (i % 26) as u8))
        .collect();
    let stub = spawn_stub(StatusCode::OK, blob_body(&big));

    let request = ContentRequest::new("github.com/acme/widget").with_path("vendor/big.txt");
    let content = content_fetcher(&stub).get_content(&request).unwrap();
    assert_eq!(content.chars().count(), MAX_FILE_SIZE);
    assert_eq!(content, big[..MAX_FILE_SIZE]);
}

#[test]
fn fetch_binary_blob_returns_placeholder() {
    let body = json!({
        "data": {"repository": {"commit": {"path": {
            "__typename": "GitBlob", "content": "", "binary": true, "byteSize": 2048
        }}}}
    });
    let stub = spawn_stub(StatusCode::OK, body.to_string());
    let content = content_fetcher(&stub)
        .get_content(&ContentRequest::new("github.com/acme/widget").with_path("logo.png"))
        .unwrap();
    assert_eq!(content, "<binary file, 2048 bytes>");
}

#[test]
fn fetch_directory_renders_tree_to_requested_depth() {
    let body = json!({
        "data": {"repository": {"commit": {"path": {
            "__typename": "GitTree",
            "entries": [
                {"path": "cmd", "isDirectory": true},
                {"path": "cmd/widget", "isDirectory": true},
                {"path": "cmd/widget/main.go", "isDirectory": false},
                {"path": "go.mod", "isDirectory": false},
            ]
        }}}}
    });
    let stub = spawn_stub(StatusCode::OK, body.to_string());
    let fetcher = content_fetcher(&stub);

    let listing = fetcher
        .get_content(&ContentRequest::new("github.com/acme/widget"))
        .unwrap();
    assert_eq!(
        listing,
        "github.com/acme/widget/\n  cmd/\n    widget/\n  go.mod\n"
    );
    assert_eq!(stub.variables()["recursive"], true);

    let shallow = fetcher
        .get_content(&ContentRequest::new("github.com/acme/widget").with_depth(1))
        .unwrap();
    assert_eq!(shallow, "github.com/acme/widget/\n  cmd/\n  go.mod\n");
    assert_eq!(stub.variables()["recursive"], false);
}
