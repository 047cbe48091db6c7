use clap::{Args, Parser, Subcommand};

use crate::models::{SearchParams, Visibility};

/// GitLab code search CLI for searching file contents across every group and
/// repository a token can see, with concurrency control, rate-limit handling
/// and progress visualization.
#[derive(Parser)]
#[clap(
    author,
    version,
    about,
    long_about = "A concurrent CLI tool for searching code across all GitLab groups and repositories visible to your token, with rate-limit handling and progress visualization."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Search code across the repositories visible to your token.
    Search(SearchArgs),

    /// Register the private token used to authenticate API requests.
    ///
    /// Generate the token on your GitLab profile with the read_api scope:
    /// https://gitlab.com/-/profile/personal_access_tokens
    SetupToken { token: String },

    /// Register the GitLab address used for API requests.
    SetupGitlabUrl { address: String },
}

#[derive(Args)]
pub struct SearchArgs {
    /// Text to search for in file contents.
    pub search_text: String,

    /// Comma-separated group ids to search instead of every visible group.
    #[clap(short, long)]
    pub groups: Option<String>,

    /// Maximum number of parallel requests.
    #[clap(short = 'w', long, default_value = "5")]
    pub max_workers: usize,

    /// Repository visibility levels to include.
    #[clap(
        short,
        long,
        value_enum,
        default_values = ["internal", "public", "private"]
    )]
    pub visibility: Vec<Visibility>,

    /// Restrict matches to a filename extension (py, js, rs, ...).
    #[clap(short, long)]
    pub extension: Option<String>,

    /// Restrict matches to a filename.
    #[clap(short, long)]
    pub filename: Option<String>,

    /// Restrict matches to a path prefix.
    #[clap(short, long)]
    pub path: Option<String>,

    /// Upper bound in seconds for the random pause between successive pages.
    #[clap(long, default_value = "0", value_name = "SECONDS")]
    pub jitter: f64,
}

impl From<&SearchArgs> for SearchParams {
    fn from(args: &SearchArgs) -> Self {
        SearchParams {
            groups: args.groups.clone(),
            search_text: args.search_text.clone(),
            max_workers: args.max_workers,
            visibility: args.visibility.clone(),
            extension: args.extension.clone(),
            filename: args.filename.clone(),
            path: args.path.clone(),
            max_jitter_secs: args.jitter,
        }
    }
}
