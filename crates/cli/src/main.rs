use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_shared::StaticToken;
use reader_core::{
    config::server_url_from_env_value,
    models::{ContentItem, Feedback, Sentiment, UserContentItem},
    ApiClient, ApiError, FeedQuery, ReaderApi, RequestContext,
};

#[derive(Parser)]
#[command(name = "reader")]
#[command(about = "Reader recommendation API CLI")]
struct Cli {
    /// Backend origin
    #[arg(long, env = "SERVER_URL", global = true)]
    server_url: Option<String>,
    /// Bearer token for the backend (anonymous when unset)
    #[arg(long, env = "READER_API_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the next page of the feed
    Feed {
        /// Restrict the feed to one flavour
        #[arg(long)]
        flavour: Option<i64>,
    },
    /// List onboarding candidates
    Onboarding,
    /// Complete onboarding with the selected content ids
    Onboard {
        #[arg(required = true)]
        content_ids: Vec<i64>,
    },
    /// List flavours
    Flavours,
    /// Show one flavour
    Flavour { flavour_id: i64 },
    /// Create a flavour seeded from a content item
    NewFlavour { content_id: i64 },
    /// Delete a flavour
    DeleteFlavour { flavour_id: i64 },
    /// Rate a content item
    Feedback { content_id: i64, vote: Vote },
    /// Print the embeddings visualisation HTML
    Visualization,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Vote {
    Up,
    Down,
    Neutral,
}

impl From<Vote> for Sentiment {
    fn from(vote: Vote) -> Self {
        match vote {
            Vote::Up => Sentiment::Upvoted,
            Vote::Down => Sentiment::Downvoted,
            Vote::Neutral => Sentiment::Neutral,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reader_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'reader --help' for commands");
        return Ok(ExitCode::SUCCESS);
    };

    let server_url = server_url_from_env_value(cli.server_url)?;
    let tokens = StaticToken::from_env_value(cli.token).context("invalid READER_API_TOKEN")?;
    let api = ReaderApi::new(ApiClient::new(
        RequestContext::Privileged {
            backend: server_url,
        },
        reqwest::Client::new(),
    ));

    let outcome = match run(&api, &tokens, command).await {
        Ok(outcome) => outcome,
        Err(e) if e.requires_onboarding() => {
            eprintln!("Onboarding is not complete. Run 'reader onboarding' to pick some content.");
            Outcome::NeedsOnboarding
        }
        Err(e) => return Err(e.into()),
    };
    Ok(outcome.exit_code())
}

/// How a command ended, when it did not fail outright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Done,
    NotFound,
    NeedsOnboarding,
}

impl Outcome {
    fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Done => ExitCode::SUCCESS,
            Outcome::NotFound => ExitCode::FAILURE,
            Outcome::NeedsOnboarding => ExitCode::from(2),
        }
    }
}

async fn run(
    api: &ReaderApi,
    tokens: &StaticToken,
    command: Commands,
) -> Result<Outcome, ApiError> {
    match command {
        Commands::Feed { flavour } => {
            let query = FeedQuery {
                flavour_id: flavour,
                ..FeedQuery::default()
            };
            let items = api.feed(&query, tokens).await?;
            if items.is_empty() {
                println!("Feed is empty.");
            }
            for item in &items {
                println!("{}", feed_line(item));
            }
        }
        Commands::Onboarding => {
            for item in api.onboarding_candidates(&[], tokens).await? {
                println!("{}", content_line(&item));
            }
        }
        Commands::Onboard { content_ids } => {
            api.complete_onboarding(&content_ids, tokens).await?;
            println!("Onboarded with {} item(s)", content_ids.len());
        }
        Commands::Flavours => {
            let flavours = api.flavours(tokens).await?;
            if flavours.is_empty() {
                println!("No flavours found.");
            }
            for flavour in flavours {
                println!("ID: {}, Name: {}", flavour.id, flavour.display_name());
            }
        }
        Commands::Flavour { flavour_id } => match api.flavour(flavour_id, tokens).await {
            Ok(details) => println!(
                "ID: {}, Name: {}",
                flavour_id,
                details.nickname.as_deref().unwrap_or("Untitled flavour")
            ),
            Err(e) if e.is_not_found() => {
                eprintln!("Flavour {} not found", flavour_id);
                return Ok(Outcome::NotFound);
            }
            Err(e) => return Err(e),
        },
        Commands::NewFlavour { content_id } => {
            let id = api.new_flavour_from_content(content_id, tokens).await?;
            println!("Created flavour with ID: {}", id);
        }
        Commands::DeleteFlavour { flavour_id } => {
            api.delete_flavour(flavour_id, tokens).await?;
            println!("Deleted flavour {}", flavour_id);
        }
        Commands::Feedback { content_id, vote } => {
            let rating = Sentiment::from(vote).rating();
            api.send_feedback(Feedback { content_id, rating }, tokens)
                .await?;
            println!("Rated content {} as {}", content_id, rating);
        }
        Commands::Visualization => {
            println!("{}", api.visualization(tokens).await?);
        }
    }

    Ok(Outcome::Done)
}

fn content_line(item: &ContentItem) -> String {
    let date = item
        .published_at()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| item.date.clone());
    let host = item.host().unwrap_or_default();
    format!("[{}] {} {} ({})", item.id, date, item.title, host)
}

fn feed_line(item: &UserContentItem) -> String {
    let marker = match item.sentiment() {
        Sentiment::Upvoted => "+",
        Sentiment::Downvoted => "-",
        Sentiment::Neutral => " ",
    };
    format!("{} {}", marker, content_line(&item.item))
}
