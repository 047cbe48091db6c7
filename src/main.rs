use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;

use gitlab_code_search_lib::{
    print_results, store_gitlab_url, store_token, Cli, CodeSearcher, Command, Reporter,
    SearchError, SearchParams, Settings,
};

#[tokio::main]
async fn main() {
    // Initialize the tracing logger
    tracing_subscriber::fmt::init();

    dotenv().ok();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("{}", format!("Error: {error}").red());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), SearchError> {
    match cli.command {
        Command::Search(args) => {
            // Settings are validated before any request is made; a missing
            // token is reported here, not as a network failure.
            let settings = Settings::load()?;
            let params = SearchParams::from(&args);

            let searcher = CodeSearcher::new(settings, Reporter::new())?;
            let results = searcher.search(&params).await?;

            print_results(&results, &params.search_text);
        }
        Command::SetupToken { token } => {
            store_token(&token)?;
            println!("{}", "Successfully registered.".green());
        }
        Command::SetupGitlabUrl { address } => {
            store_gitlab_url(&address)?;
            println!("{}", "Successfully registered.".green());
        }
    }

    Ok(())
}
