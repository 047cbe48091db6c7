use clap::ValueEnum;
use serde::Deserialize;

/// Access-control tier of a repository as reported by GitLab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Internal,
    Public,
    Private,
}

/// Everything one search invocation needs, fixed up front.
///
/// Constructed once by the CLI layer and passed by reference through every
/// pipeline stage; never mutated.
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Explicit comma-separated group ids; `None` searches every visible
    /// group.
    pub groups: Option<String>,

    /// Text to search for in file contents.
    pub search_text: String,

    /// Upper bound on parallel requests per fan-out stage.
    pub max_workers: usize,

    /// Visibility levels a repository must have to be searched.
    pub visibility: Vec<Visibility>,

    /// Restrict matches to a filename extension.
    pub extension: Option<String>,

    /// Restrict matches to a filename.
    pub filename: Option<String>,

    /// Restrict matches to a path prefix.
    pub path: Option<String>,

    /// Upper bound in seconds for the random pause between successive pages.
    pub max_jitter_secs: f64,
}

impl SearchParams {
    /// Search text with the optional scope qualifiers appended, in the
    /// extension, filename, path order GitLab expects.
    pub fn scoped_search_term(&self) -> String {
        let mut term = self.search_text.clone();

        if let Some(extension) = &self.extension {
            term.push_str(&format!(" extension:{extension}"));
        }

        if let Some(filename) = &self.filename {
            term.push_str(&format!(" filename:{filename}"));
        }

        if let Some(path) = &self.path {
            term.push_str(&format!(" path:{path}"));
        }

        term
    }
}

/// Cursor over one paginated collection: the URL to fetch next and the query
/// parameters to send with it.
///
/// The paginator replaces the URL with the next-page link after each page and
/// clears the parameters. A cursor is owned by the single paginated call that
/// created it and never crosses a task boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl PendingRequest {
    pub fn new(url: impl Into<String>, params: &[(&str, &str)]) -> Self {
        PendingRequest {
            url: url.into(),
            params: params
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }
}

/// One repository as listed under a group.
///
/// Equality and hashing cover all four fields, so a `HashSet<Repo>`
/// deduplicates repositories reported by more than one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Repo {
    pub id: u64,
    pub name: String,
    pub visibility: Visibility,
    pub web_url: String,
}

/// One code-search hit inside a repository, as returned by the blob-scope
/// search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CodeMatch {
    pub path: String,
    pub filename: String,
    pub project_id: u64,
    pub data: String,
    #[serde(rename = "startline")]
    pub start_line: u64,
    #[serde(rename = "ref")]
    pub ref_name: String,
}

/// All matches found in one repository, built once its pages are drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoResult {
    pub name: String,
    pub web_url: String,
    pub matches: Vec<CodeMatch>,
}
