pub mod fetch;
pub mod guide;
pub mod search;
pub mod serve;
