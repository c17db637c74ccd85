use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use bf_core::{ArticleStore, EnhancedArticleStore};
use bf_enhance::{EnhancementOrchestrator, GeminiModel, SerpApiSearch};
use bf_progress::{ArticleOutcome, ProgressSink, ProgressTracker, StepStatus};
use bf_scraper::{ReferenceScraper, ScrapeOrchestrator};
use bf_storage::MemoryStore;
use bf_web::{create_app, AppState};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Blog article scraping and enhancement toolkit")]
struct Cli {
    #[arg(long, default_value = "memory", help = "Storage backend: memory or sqlite")]
    storage: String,
    #[arg(long, default_value = "articles.db", help = "SQLite database path")]
    db_path: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the REST API server
    Serve {
        #[arg(long, default_value_t = 3001)]
        port: u16,
    },
    /// Scrape a batch of articles from the configured blog
    Scrape {
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
    /// Enhance one stored article by id
    Enhance { id: String },
    /// List stored articles
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

/// Sink that narrates job progress into the log stream.
struct LoggingSink;

#[async_trait::async_trait]
impl ProgressSink for LoggingSink {
    async fn begin(&self, total: usize) {
        info!("processing {} articles", total);
    }

    async fn message(&self, msg: &str) {
        info!("{}", msg);
    }

    async fn article(&self, outcome: ArticleOutcome) {
        match outcome.message {
            Some(message) => warn!("{} ({}): {}", outcome.title, outcome.source_url, message),
            None => info!("{:?}: {}", outcome.status, outcome.title),
        }
    }

    async fn step(&self, index: usize, status: StepStatus) {
        if status == StepStatus::InProgress {
            info!("step {}: {}", index + 1, bf_enhance::ENHANCE_STEPS[index]);
        }
    }

    async fn fail(&self, error: &str) {
        warn!("job failed: {}", error);
    }
}

struct Stores {
    articles: Arc<dyn ArticleStore>,
    enhanced: Arc<dyn EnhancedArticleStore>,
}

async fn create_stores(backend: &str, db_path: &PathBuf) -> anyhow::Result<Stores> {
    match backend {
        "memory" => {
            let store = Arc::new(MemoryStore::new());
            Ok(Stores {
                articles: store.clone(),
                enhanced: store,
            })
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let store = Arc::new(bf_storage::SqliteStore::open(db_path).await?);
            Ok(Stores {
                articles: store.clone(),
                enhanced: store,
            })
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => {
            let _ = db_path;
            Err(anyhow!("this build does not include the sqlite backend"))
        }
        other => Err(anyhow!("unknown storage backend: {}", other)),
    }
}

fn base_url() -> anyhow::Result<String> {
    std::env::var("BLOG_BASE_URL").context("BLOG_BASE_URL is not set")
}

fn build_enhancer(stores: &Stores) -> anyhow::Result<Arc<EnhancementOrchestrator>> {
    let search = SerpApiSearch::from_env()?;
    let model = GeminiModel::from_env()?;
    let loader = ReferenceScraper::new()?;
    Ok(Arc::new(EnhancementOrchestrator::new(
        stores.articles.clone(),
        stores.enhanced.clone(),
        Arc::new(search),
        Arc::new(model),
        Arc::new(loader),
    )))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let stores = create_stores(&cli.storage, &cli.db_path).await?;
    info!("💾 storage initialized (using {})", cli.storage);

    match cli.command {
        Commands::Serve { port } => {
            let scraper = match base_url() {
                Ok(url) => Some(Arc::new(ScrapeOrchestrator::new(
                    stores.articles.clone(),
                    url,
                )?)),
                Err(e) => {
                    warn!("scraping disabled: {}", e);
                    None
                }
            };
            let enhancer = match build_enhancer(&stores) {
                Ok(enhancer) => Some(enhancer),
                Err(e) => {
                    warn!("enhancement disabled: {}", e);
                    None
                }
            };

            let app = create_app(AppState {
                store: stores.articles,
                enhanced: stores.enhanced,
                tracker: ProgressTracker::new(),
                scraper,
                enhancer,
            });

            let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
            info!("🚀 listening on port {}", port);
            axum::serve(listener, app).await?;
        }
        Commands::Scrape { count } => {
            let scraper = ScrapeOrchestrator::new(stores.articles.clone(), base_url()?)?;
            let stored = scraper.scrape_batch(count, &LoggingSink).await?;
            info!("✅ stored {} articles", stored.len());
            for article in stored {
                println!("{}  {}", article.id, article.title);
            }
        }
        Commands::Enhance { id } => {
            let enhancer = build_enhancer(&stores)?;
            let record = enhancer.enhance(&id, &LoggingSink).await?;
            info!("✅ enhanced with {}", record.model_used);
            println!("{}  {}", record.id, record.title);
        }
        Commands::List { page, limit } => {
            let offset = (page.max(1) - 1) * limit;
            let total = stores.articles.count().await?;
            let articles = stores.articles.list(offset, limit).await?;
            println!("{} articles total", total);
            for article in articles {
                println!(
                    "{}  v{}  {}  {}",
                    article.id, article.version, article.published_date.date_naive(), article.title
                );
            }
        }
    }

    Ok(())
}
