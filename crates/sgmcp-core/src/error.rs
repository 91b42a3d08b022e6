use thiserror::Error;

/// Canonical tool-level error codes returned to MCP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolErrorCode {
    InvalidInput,
    InvalidQuery,
    InvalidArguments,
    UpstreamError,
    ServiceUnavailable,
    InternalError,
}

impl ProtocolErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::InvalidQuery => "invalid_query",
            Self::InvalidArguments => "invalid_arguments",
            Self::UpstreamError => "upstream_error",
            Self::ServiceUnavailable => "service_unavailable",
            Self::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ProtocolErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("missing required config value: {0}")]
    MissingRequired(String),

    #[error("invalid config value: {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failures raised by a search backend.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The upstream rejected the query itself.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("upstream search failed: {0}")]
    Upstream(String),

    /// The upstream answered with a shape we cannot interpret.
    #[error("malformed search response: {0}")]
    Malformed(String),
}

impl SearchError {
    /// Use with `.map_err(SearchError::upstream)`.
    pub fn upstream<E: std::fmt::Display>(e: E) -> Self {
        Self::Upstream(e.to_string())
    }

    pub fn malformed<E: std::fmt::Display>(e: E) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Failures raised by a content backend.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("not found: repository={repository}, path={path}, ref={git_ref}")]
    NotFound {
        repository: String,
        path: String,
        git_ref: String,
    },

    #[error("upstream fetch failed: {0}")]
    Upstream(String),

    #[error("malformed content response: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn not_found(
        repository: impl Into<String>,
        path: impl Into<String>,
        git_ref: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            repository: repository.into(),
            path: path.into(),
            git_ref: git_ref.into(),
        }
    }

    /// Use with `.map_err(FetchError::upstream)`.
    pub fn upstream<E: std::fmt::Display>(e: E) -> Self {
        Self::Upstream(e.to_string())
    }

    pub fn malformed<E: std::fmt::Display>(e: E) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// The public error set surfaced by tool calls. Messages are short summaries;
/// upstream detail stays in the logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidQuery(String),

    #[error("{0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Server is shutting down")]
    ServiceUnavailable,

    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    pub const fn code(&self) -> ProtocolErrorCode {
        match self {
            Self::InvalidInput(_) => ProtocolErrorCode::InvalidInput,
            Self::InvalidQuery(_) => ProtocolErrorCode::InvalidQuery,
            Self::InvalidArguments(_) => ProtocolErrorCode::InvalidArguments,
            Self::Upstream(_) => ProtocolErrorCode::UpstreamError,
            Self::ServiceUnavailable => ProtocolErrorCode::ServiceUnavailable,
            Self::Internal(_) => ProtocolErrorCode::InternalError,
        }
    }

    /// Errors the caller can fix by changing its arguments.
    pub const fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::InvalidQuery(_) | Self::InvalidArguments(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_code_strings_match_registry() {
        assert_eq!(ProtocolErrorCode::InvalidInput.as_str(), "invalid_input");
        assert_eq!(ProtocolErrorCode::InvalidQuery.as_str(), "invalid_query");
        assert_eq!(
            ProtocolErrorCode::InvalidArguments.as_str(),
            "invalid_arguments"
        );
        assert_eq!(ProtocolErrorCode::UpstreamError.as_str(), "upstream_error");
        assert_eq!(
            ProtocolErrorCode::ServiceUnavailable.as_str(),
            "service_unavailable"
        );
        assert_eq!(ProtocolErrorCode::InternalError.as_str(), "internal_error");
    }

    #[test]
    fn tool_error_codes_separate_client_and_service_faults() {
        assert!(ToolError::InvalidQuery("bad".into()).is_client_fault());
        assert!(ToolError::InvalidArguments("missing".into()).is_client_fault());
        assert!(!ToolError::Upstream("down".into()).is_client_fault());
        assert!(!ToolError::ServiceUnavailable.is_client_fault());
        assert_eq!(
            ToolError::ServiceUnavailable.code(),
            ProtocolErrorCode::ServiceUnavailable
        );
        assert_eq!(
            ToolError::ServiceUnavailable.to_string(),
            "Server is shutting down"
        );
    }

    #[test]
    fn not_found_display_names_repository_and_path() {
        let err = FetchError::not_found("github.com/acme/widget", "missing/file.go", "HEAD");
        let msg = err.to_string();
        assert!(msg.contains("github.com/acme/widget"));
        assert!(msg.contains("missing/file.go"));
        assert!(msg.ends_with("ref=HEAD"));
    }
}
