pub mod git;
pub mod http;

pub use git::GitSource;
pub use http::HttpSource;
