mod acquire;
mod output;
mod problems;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use painradar_core::{Platform, Target};
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "painradar")]
#[command(about = "Collect posts from public platforms and rank user problems")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch what is trending on each platform
    Trending {
        #[command(flatten)]
        targets: TargetArgs,
        #[command(flatten)]
        shaping: ShapingArgs,
    },
    /// Search every selected platform for a query
    Search {
        query: String,
        #[command(flatten)]
        targets: TargetArgs,
        #[command(flatten)]
        shaping: ShapingArgs,
    },
    /// Find, score and rank problem posts about a topic
    Problems {
        topic: String,
        #[command(flatten)]
        targets: TargetArgs,
        /// Number of search queries derived from the topic (topic included)
        #[arg(long, default_value_t = 3)]
        max_variations: usize,
        /// Drop posts with a lower engagement score (0-100)
        #[arg(long, default_value_t = 0)]
        min_engagement: u8,
        /// Drop posts with a lower problem score (0-100)
        #[arg(long = "min-problem", default_value_t = 0)]
        min_problem_score: u8,
        #[arg(long, default_value_t = 50)]
        max_results: usize,
        /// Summarize the ranked posts with a language model (needs OPENROUTER_API_KEY)
        #[arg(long)]
        analyze: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Show an author or channel profile
    Profile {
        handle: String,
        #[arg(long, short = 'p')]
        platform: Platform,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Fetch posts from a hub, tag or section
    Category {
        name: String,
        #[arg(long, short = 'p')]
        platform: Platform,
        #[command(flatten)]
        shaping: ShapingArgs,
    },
    /// Fetch posts from a channel; several Telegram channels may be comma separated
    Channel {
        name: String,
        #[arg(long, short = 'p', default_value = "telegram")]
        platform: Platform,
        #[command(flatten)]
        shaping: ShapingArgs,
    },
    /// Fetch recent posts by one author
    UserPosts {
        handle: String,
        #[arg(long, short = 'p')]
        platform: Platform,
        #[command(flatten)]
        shaping: ShapingArgs,
    },
}

#[derive(Debug, Args)]
struct TargetArgs {
    /// Platform to query; repeat for several, or `all` for the configured defaults
    #[arg(long = "platform", short = 'p', default_value = "all")]
    platforms: Vec<Target>,
}

/// Post-processing applied to raw acquisition results before output.
#[derive(Debug, Args)]
struct ShapingArgs {
    /// Remove repeated posts (same URL or same opening text) per platform
    #[arg(long)]
    dedupe: bool,
    /// Sort each platform's posts by likes + comments + views/100
    #[arg(long)]
    sort_popular: bool,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = painradar_core::load_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("painradar: no command given, run with --help for usage");
        return Ok(());
    };

    match command {
        Commands::Trending { targets, shaping } => {
            acquire::run_trending(&config, &targets.platforms, &shaping).await
        }
        Commands::Search {
            query,
            targets,
            shaping,
        } => acquire::run_search(&config, &query, &targets.platforms, &shaping).await,
        Commands::Problems {
            topic,
            targets,
            max_variations,
            min_engagement,
            min_problem_score,
            max_results,
            analyze,
            output,
        } => {
            let options = painradar_signals::FindOptions {
                max_variations,
                min_engagement,
                min_problem_score,
                max_results,
            };
            problems::run_problems(&config, &topic, &targets.platforms, options, analyze, &output)
                .await
        }
        Commands::Profile {
            handle,
            platform,
            output,
        } => acquire::run_profile(&config, &handle, platform, &output).await,
        Commands::Category {
            name,
            platform,
            shaping,
        } => acquire::run_single(&config, acquire::Single::Category(&name), platform, &shaping).await,
        Commands::Channel {
            name,
            platform,
            shaping,
        } => acquire::run_single(&config, acquire::Single::Channel(&name), platform, &shaping).await,
        Commands::UserPosts {
            handle,
            platform,
            shaping,
        } => {
            acquire::run_single(&config, acquire::Single::UserPosts(&handle), platform, &shaping)
                .await
        }
    }
}

#[cfg(test)]
mod tests;
