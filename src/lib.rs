//! # GitLab Code Search
//!
//! A Rust library for searching code across every GitLab group and
//! repository a token can see, with concurrent per-repository searches,
//! rate-limit handling, and progress visualization.
//!
//! ## Main Components
//!
//! - [`CodeSearcher`]: drives the three-stage pipeline — group resolution,
//!   repository enumeration, per-repository code search
//! - [`SearchParams`]: everything one search invocation needs
//! - [`Settings`]: base address, private token and pagination depth bound
//! - [`Reporter`]: per-stage progress feedback
//!
//! ## Example
//!
//! ```no_run
//! use gitlab_code_search_lib::{CodeSearcher, Reporter, SearchParams, Settings, Visibility};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gitlab_code_search_lib::SearchError> {
//!     let settings = Settings::load()?;
//!     let searcher = CodeSearcher::new(settings, Reporter::new())?;
//!
//!     let params = SearchParams {
//!         groups: None,
//!         search_text: "connection_pool".to_string(),
//!         max_workers: 5,
//!         visibility: vec![Visibility::Internal, Visibility::Public, Visibility::Private],
//!         extension: None,
//!         filename: None,
//!         path: None,
//!         max_jitter_secs: 0.0,
//!     };
//!
//!     let results = searcher.search(&params).await?;
//!     for entry in results.iter().filter(|entry| !entry.matches.is_empty()) {
//!         println!("{}: {} matches", entry.name, entry.matches.len());
//!     }
//!     Ok(())
//! }
//! ```

mod args;
mod config;
mod display;
mod error;
mod models;
mod paginator;
mod progress;
mod search;

pub use crate::args::{Cli, Command, SearchArgs};
pub use crate::config::{store_gitlab_url, store_token, Settings, StoredSettings};
pub use crate::display::print_results;
pub use crate::error::SearchError;
pub use crate::models::{CodeMatch, PendingRequest, Repo, RepoResult, SearchParams, Visibility};
pub use crate::paginator::paginate;
pub use crate::progress::{Reporter, Stage};
pub use crate::search::CodeSearcher;
