//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use histmerge_client::{MediaWikiClient, has_redundant_banners};
use histmerge_shared::{
    AppConfig, RECORD_TEMPLATE, ResumeToken, bot_password, config_file_path, init_config,
    load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// histmerge — fold redundant talk page banners into {{article history}}.
#[derive(Parser)]
#[command(
    name = "histmerge",
    version,
    about = "Merge redundant event-notice banners into article history records.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Merge the banners on a single talk page.
    Fix {
        /// Page title; a bare article title gets a `Talk:` prefix.
        page: String,

        /// Print the merged wikitext instead of saving it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Walk the transclusion work queue, merging as it goes.
    Run {
        /// Stop after this many saved edits.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Resume the work queue from a token printed by a previous run.
        #[arg(long)]
        resume: Option<ResumeToken>,

        /// Process pages but save nothing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Dump the titles of pages with mergeable banners to a JSON file.
    List {
        /// Output file for the candidate titles.
        #[arg(short, long, default_value = "candidates.json")]
        out: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "histmerge=info",
        1 => "histmerge=debug",
        _ => "histmerge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Fix { page, dry_run } => cmd_fix(&page, dry_run).await,
        Command::Run {
            limit,
            resume,
            dry_run,
        } => cmd_run(limit, resume, dry_run).await,
        Command::List { out } => cmd_list(&out).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Build a logged-in client from the loaded config.
async fn connect(config: &AppConfig) -> Result<MediaWikiClient> {
    if config.site.username.is_empty() {
        return Err(eyre!(
            "no bot username configured — set [site] username in {}",
            config_file_path()?.display()
        ));
    }
    let password = bot_password(config)?;

    let client = MediaWikiClient::new(&config.site.api_url)?;
    client.login(&config.site.username, &password).await?;
    Ok(client)
}

/// Talk pages are the only thing worth fixing; accept bare article titles.
fn talk_title(page: &str) -> String {
    if page.starts_with("Talk:") {
        page.to_string()
    } else {
        format!("Talk:{page}")
    }
}

// ---------------------------------------------------------------------------
// fix
// ---------------------------------------------------------------------------

async fn cmd_fix(page: &str, dry_run: bool) -> Result<()> {
    let config = load_config()?;
    let client = connect(&config).await?;

    let title = talk_title(page);
    let text = client
        .fetch_text(&title)
        .await?
        .ok_or_else(|| eyre!("{title} doesn't exist"))?;

    let merged = histmerge_engine::process(&text)?;
    if merged == text {
        println!("{title}: nothing to merge.");
        return Ok(());
    }

    if dry_run {
        println!("{merged}");
        return Ok(());
    }

    client.save_text(&title, &merged, &config.run.summary).await?;
    println!("{title}: merged and saved.");
    Ok(())
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(
    limit: Option<usize>,
    mut resume: Option<ResumeToken>,
    dry_run: bool,
) -> Result<()> {
    let config = load_config()?;
    let client = connect(&config).await?;

    let spinner = work_spinner();
    let mut edits = 0usize;
    let mut seen = 0usize;

    'queue: loop {
        let batch = client
            .transclusions_page(RECORD_TEMPLATE, config.run.page_size, resume.as_ref())
            .await?;

        for title in &batch.titles {
            seen += 1;
            spinner.set_message(format!("[{edits} edits] {title}"));

            let Some(text) = client.fetch_text(title).await? else {
                continue;
            };
            if !has_redundant_banners(&text) {
                continue;
            }

            let merged = match histmerge_engine::process(&text) {
                Ok(merged) => merged,
                // The driver's policy for a failed document is skip-and-log.
                Err(e) => {
                    warn!(title = %title, error = %e, "merge failed, skipping page");
                    continue;
                }
            };
            if merged == text {
                continue;
            }

            if !dry_run {
                client.save_text(title, &merged, &config.run.summary).await?;
                tokio::time::sleep(std::time::Duration::from_millis(config.run.rate_limit_ms))
                    .await;
            }
            edits += 1;
            info!(title = %title, edits, "page merged");

            if limit.is_some_and(|limit| edits >= limit) {
                info!(edits, "edit limit reached");
                break 'queue;
            }
        }

        // The token only advances once a batch completes, so an interrupted
        // run replays at most one (idempotent) batch.
        resume = batch.resume;
        if resume.is_none() {
            break;
        }
    }

    spinner.finish_and_clear();

    println!();
    println!("  Pages seen:  {seen}");
    println!("  Edits made:  {edits}{}", if dry_run { " (dry run)" } else { "" });
    match resume {
        Some(token) => println!("  Resume with: --resume '{token}'"),
        None => println!("  Work queue exhausted."),
    }
    println!();

    Ok(())
}

/// Steady-tick spinner for long queue walks.
fn work_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("spinner template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

async fn cmd_list(out: &Path) -> Result<()> {
    let config = load_config()?;
    let client = connect(&config).await?;

    let spinner = work_spinner();
    let mut candidates: Vec<String> = Vec::new();
    let mut resume: Option<ResumeToken> = None;

    loop {
        let batch = client
            .transclusions_page(RECORD_TEMPLATE, config.run.page_size, resume.as_ref())
            .await?;

        for title in &batch.titles {
            spinner.set_message(format!("[{} found] {title}", candidates.len()));
            let Some(text) = client.fetch_text(title).await? else {
                continue;
            };
            if has_redundant_banners(&text) {
                candidates.push(title.clone());
            }
        }

        resume = batch.resume;
        if resume.is_none() {
            break;
        }
    }

    spinner.finish_and_clear();

    let json = serde_json::to_string_pretty(&candidates)?;
    std::fs::write(out, json)?;

    println!("{} candidate pages dumped to {}.", candidates.len(), out.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config written to {}.", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn talk_title_prefixes_bare_titles() {
        assert_eq!(talk_title("Dyslexia"), "Talk:Dyslexia");
        assert_eq!(talk_title("Talk:Dyslexia"), "Talk:Dyslexia");
    }
}
