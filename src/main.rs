use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use blog_discovery::{
    models::{ContentFilter, RecommendationQuery},
    Config, ContentService, EngagementRegistry, FeedState, HttpGateway, MemorySession,
    RecommendationFeed, RecommendationService, SessionStore,
};

#[derive(Parser)]
#[command(name = "blog-discovery")]
#[command(about = "Browse, rank and engage with posts on a blog backend")]
struct Cli {
    /// Backend base URL (overrides API_BASE_URL)
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Most engaged posts of the recent window
    Trending {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        days: Option<u32>,
    },
    /// Personalized picks for the signed-in user
    Recommended {
        /// Post to bias the picks towards
        #[arg(long)]
        anchor: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Posts similar to the given one
    Similar {
        slug: String,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Published posts, optionally filtered
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Full post with comments
    Show { slug: String },
    /// Toggle the like on a post
    Like { slug: String },
    /// Toggle the bookmark on a post
    Bookmark { slug: String },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = cli.api_base_url {
        config.api_base_url = url;
    }
    let weights = config.weights()?;

    let session: Arc<dyn SessionStore> = Arc::new(match config.api_token.as_deref() {
        Some(token) => MemorySession::with_token(token),
        None => MemorySession::new(),
    });
    let gateway = Arc::new(HttpGateway::new(&config, session.clone())?);

    tracing::debug!(
        base_url = %config.api_base_url,
        signed_in = session.token().is_some(),
        "Client configured"
    );

    let recommendations = Arc::new(RecommendationService::new(gateway.clone(), config.limits()));
    let content = ContentService::new(gateway.clone(), weights);

    let query = match cli.command {
        Command::Trending { limit, days } => {
            let mut query = RecommendationQuery::trending();
            query.limit = limit;
            query.days = days;
            Some(query)
        }
        Command::Recommended { anchor, limit } => {
            let mut query = RecommendationQuery::personalized();
            query.anchor = anchor;
            query.limit = limit;
            Some(query)
        }
        Command::Similar { slug, limit } => {
            let mut query = RecommendationQuery::similar_to(slug);
            query.limit = limit;
            Some(query)
        }
        Command::List {
            category,
            tag,
            search,
        } => {
            let filter = ContentFilter {
                category,
                tag,
                search,
                ..Default::default()
            };
            print_json(&content.list(&filter).await?)?;
            None
        }
        Command::Show { slug } => {
            print_json(&content.get(&slug).await?)?;
            None
        }
        Command::Like { slug } | Command::Bookmark { slug } if session.token().is_none() => {
            anyhow::bail!("API_TOKEN is required to engage with {}", slug);
        }
        Command::Like { slug } => {
            let registry = EngagementRegistry::new(gateway.clone(), session.clone(), weights);
            let detail = content.get(&slug).await?;
            let sync = registry.attach(&detail.summary).await;
            sync.toggle_like().await?;
            print_json(&sync.state().await)?;
            None
        }
        Command::Bookmark { slug } => {
            let registry = EngagementRegistry::new(gateway.clone(), session.clone(), weights);
            let detail = content.get(&slug).await?;
            let sync = registry.attach(&detail.summary).await;
            sync.toggle_bookmark().await?;
            print_json(&sync.state().await)?;
            None
        }
    };

    if let Some(query) = query {
        let feed = RecommendationFeed::new(recommendations);
        match feed.show(query).await {
            FeedState::Populated(list) => print_json(&list)?,
            FeedState::Failed(e) => return Err(e.into()),
            FeedState::Pending => anyhow::bail!("recommendations did not settle"),
        }
    }

    Ok(())
}
