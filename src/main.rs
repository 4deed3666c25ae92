use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

use news_sitemap::scrape::{self, DEFAULT_MAX_LINKS, DEFAULT_SITE_URL};
use news_sitemap::sitemap::{Publication, DEFAULT_LANGUAGE, DEFAULT_PUBLICATION_NAME};
use news_sitemap::source::FeedSource;
use news_sitemap::{generate, Result, DEFAULT_INPUT, DEFAULT_OUTPUT};

/// news-sitemap - generate a Google News sitemap from the last 48h of a feed
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    sitemap: SitemapArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build news-sitemap.xml from a remote or local feed (default)
    Sitemap(SitemapArgs),
    /// Scrape the news listing page into rss.xml
    Scrape(ScrapeArgs),
}

#[derive(Args, Debug)]
struct SitemapArgs {
    /// URL of the RSS/Atom feed
    #[arg(long, env = "FEED_URL")]
    feed_url: Option<String>,

    /// Read the local feed produced by `scrape` instead of fetching
    #[arg(long)]
    local: bool,

    /// Local feed path used with --local
    #[arg(long, default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Where to write the sitemap
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Publication name in every news:publication block
    #[arg(long, default_value = DEFAULT_PUBLICATION_NAME)]
    publication_name: String,

    /// Two-letter publication language
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    language: String,

    /// Timeout in milliseconds for the feed request
    #[arg(short = 't', long = "timeout-ms", default_value_t = 10000)]
    timeout_ms: u64,
}

#[derive(Args, Debug)]
struct ScrapeArgs {
    /// Listing page linking the articles
    #[arg(long, default_value = DEFAULT_SITE_URL)]
    site_url: Url,

    /// Maximum number of article links to consider
    #[arg(short = 'n', long = "max-links", default_value_t = DEFAULT_MAX_LINKS)]
    max_links: usize,

    /// Where to write the feed
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    output: PathBuf,

    /// Timeout in milliseconds for the page request
    #[arg(short = 't', long = "timeout-ms", default_value_t = 10000)]
    timeout_ms: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Sitemap(cli.sitemap));

    match run(command) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Sitemap(args) => {
            let source = if args.local {
                FeedSource::local(&args.input)
            } else {
                FeedSource::remote(args.feed_url.as_deref(), Duration::from_millis(args.timeout_ms))?
            };
            let publication = Publication {
                name: args.publication_name,
                language: args.language,
            };
            let count = generate(&source, &args.output, &publication)?;
            println!("Generated {} with {} URLs (last 48h).", args.output.display(), count);
        }
        Command::Scrape(args) => {
            let count = scrape::run(
                &args.site_url,
                args.max_links,
                &args.output,
                Duration::from_millis(args.timeout_ms),
            )?;
            if count > 0 {
                println!("Generated {} with {} items.", args.output.display(), count);
            }
        }
    }
    Ok(())
}
