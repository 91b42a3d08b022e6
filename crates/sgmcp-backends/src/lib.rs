//! Backends that answer search and content requests against a Sourcegraph
//! instance. Callers should depend on [`SearchClient`] and [`ContentFetcher`]
//! rather than on the concrete clients.

pub mod content;
mod graphql;
pub mod protocols;
pub mod search;

pub use content::SourcegraphContentFetcher;
pub use protocols::{ContentFetcher, SearchClient};
pub use search::SourcegraphClient;
