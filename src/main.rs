// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::{Emoji, Term};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use podplay::store::read_legacy_entries;
use podplay::{
    DEFAULT_CATALOG_URL, EngineConfig, JsonFileStore, MemoryStore, Phase, PlaybackEngine,
    PlaybackObserver, PlaybackState, PlayerEvent, ReqwestClient, SimulatedMedia, Snapshot, SnapshotStore,
    fetch_catalog, fetch_show,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[>] ");
static PLAY: Emoji<'_, '_> = Emoji("▶️  ", "> ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[?] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");

/// Browse the podcast catalog and play episodes with resumable progress
#[derive(Parser, Debug)]
#[command(name = "podplay")]
#[command(about = "Browse the podcast catalog and play episodes with resumable progress")]
#[command(version)]
struct Args {
    /// Path to the playback state file
    #[arg(long, env = "PODPLAY_STATE_FILE", global = true)]
    state_file: Option<PathBuf>,

    /// Keep playback state in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Catalog endpoint
    #[arg(long, env = "PODPLAY_CATALOG_URL", default_value = DEFAULT_CATALOG_URL, global = true)]
    catalog_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List shows in the catalog
    Shows {
        /// Maximum number of shows to list
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List the episodes of a show
    Episodes { show_id: String },

    /// Play an episode on a simulated clock
    Play {
        show_id: String,

        #[arg(short, long, default_value = "1")]
        season: u32,

        #[arg(short, long, default_value = "1")]
        episode: u32,

        /// Length of the simulated track in seconds
        #[arg(long, default_value = "225")]
        duration: f64,

        /// Wall-clock milliseconds per simulated second
        #[arg(long, default_value = "1000")]
        tick_ms: u64,

        /// Stop after this many simulated seconds
        #[arg(long)]
        listen: Option<u64>,

        /// Restart the episode when it ends
        #[arg(long)]
        repeat: bool,

        /// Volume percentage
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: Option<u8>,
    },

    /// Show saved progress
    History,

    /// Show recently played episodes
    Recent,

    /// Clear saved progress and recently played episodes
    Clear {
        /// Only clear the recently played list
        #[arg(long)]
        recent_only: bool,
    },

    /// Set the saved volume
    Volume {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },

    /// Import state saved in the legacy key-value layout
    ImportLegacy {
        /// JSON object mapping legacy keys to their stored strings
        file: PathBuf,
    },
}

type Engine = PlaybackEngine<SimulatedMedia, Box<dyn SnapshotStore>>;

/// Observer printing playback activity to the terminal
struct ConsoleObserver {
    term: Term,
}

impl ConsoleObserver {
    fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    fn line(&self, text: String) {
        let _ = self.term.clear_line();
        let _ = self.term.write_line(&text);
    }
}

impl PlaybackObserver for ConsoleObserver {
    fn notify(&self, event: &PlayerEvent) {
        match event {
            PlayerEvent::StateChanged(state) => {
                if let Some(episode) = &state.current_episode
                    && state.is_playing
                {
                    let _ = self.term.clear_line();
                    let _ = self.term.write_str(&format!(
                        "{PLAY}{} {} / {}",
                        truncate_title(&episode.title, 40).bold(),
                        format_time(state.current_time).cyan(),
                        format_time(state.duration)
                    ));
                }
            }

            PlayerEvent::PlaybackStarted { episode_id } => {
                self.line(format!("{HEADPHONES}Now playing {}", episode_id.green()));
            }

            PlayerEvent::PlaybackFailed { error } => {
                self.line(format!("{FAILURE}{}", error.to_string().red()));
            }

            PlayerEvent::PersistenceDegraded { error } => {
                self.line(format!(
                    "{WARNING}{} {}",
                    "Progress is not being saved:".yellow(),
                    error.dimmed()
                ));
            }

            PlayerEvent::ProgressSaved { .. }
            | PlayerEvent::RecentlyPlayedChanged { .. }
            | PlayerEvent::HistoryCleared => {}
        }
    }
}

/// Format seconds as `m:ss`
fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Summary printed when a play session ends, replacing the progress line
fn stopped_line(state: &PlaybackState) -> String {
    format!(
        "{SUCCESS}{} at {} / {}",
        "Stopped".bold().green(),
        format_time(state.current_time).cyan(),
        format_time(state.duration)
    )
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let head: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

fn default_state_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("unable to resolve data directory")?;
    Ok(base.join("podplay").join("state.json"))
}

fn open_store(args: &Args) -> Result<Box<dyn SnapshotStore>> {
    if args.ephemeral {
        return Ok(Box::new(MemoryStore::new()));
    }

    let path = match &args.state_file {
        Some(path) => path.clone(),
        None => default_state_path()?,
    };
    Ok(Box::new(JsonFileStore::new(path)))
}

fn open_engine(args: &Args, duration: f64) -> Result<Engine> {
    let store = open_store(args)?;
    Ok(PlaybackEngine::new(
        SimulatedMedia::new(duration),
        store,
        EngineConfig::default(),
    ))
}

async fn list_shows(client: &ReqwestClient, url: &str, limit: Option<usize>) -> Result<()> {
    let shows = fetch_catalog(client, url)
        .await
        .context("Failed to load the show catalog")?;

    let limit = limit.unwrap_or(shows.len());
    for show in shows.iter().take(limit) {
        let updated = show
            .updated_at()
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        println!(
            "  {:>6}  {}  {} {}",
            show.id.cyan(),
            truncate_title(&show.title, 50).bold(),
            format!("{} seasons", show.seasons).yellow(),
            updated.dimmed()
        );
    }
    println!("\n{} shows", shows.len().to_string().green());
    Ok(())
}

async fn list_episodes(client: &ReqwestClient, url: &str, show_id: &str) -> Result<()> {
    let show = fetch_show(client, url, show_id)
        .await
        .with_context(|| format!("Failed to load show {show_id}"))?;

    println!("{HEADPHONES}{}\n", show.title.bold().green());
    for episode in show.episodes() {
        println!(
            "  S{:02}E{:02}  {}  {}",
            episode.season,
            episode.episode,
            truncate_title(&episode.title, 60),
            episode.episode_id.dimmed()
        );
    }
    Ok(())
}

/// Settings for a simulated playback session
#[derive(Debug, Clone)]
struct PlayOptions {
    season: u32,
    episode: u32,
    duration: f64,
    tick: Duration,
    listen: Option<u64>,
    repeat: bool,
    volume: Option<u8>,
}

async fn play(
    args: &Args,
    client: &ReqwestClient,
    show_id: &str,
    options: &PlayOptions,
) -> Result<()> {
    let show = fetch_show(client, &args.catalog_url, show_id)
        .await
        .with_context(|| format!("Failed to load show {show_id}"))?;
    let Some(episode) = show.find_episode(options.season, options.episode) else {
        bail!(
            "Show {show_id} has no episode S{:02}E{:02}",
            options.season,
            options.episode
        );
    };

    let mut engine = open_engine(args, options.duration)?;
    engine.subscribe(Arc::new(ConsoleObserver::new()));
    if let Some(volume) = options.volume {
        engine.set_volume(volume);
    }
    if options.repeat != engine.state().is_repeat_active {
        engine.toggle_repeat();
    }

    engine.play_episode(episode);
    engine.pump(Duration::ZERO);

    let listen = options.listen;
    let mut ticker = tokio::time::interval(options.tick);
    ticker.tick().await;
    let mut listened = 0u64;

    loop {
        ticker.tick().await;
        engine.pump(Duration::from_secs(1));
        engine.fire_due_timers(Instant::now());
        listened += 1;

        let state = engine.state();
        if state.phase == Phase::Ended && engine.next_deadline().is_none() {
            break;
        }
        if state.phase == Phase::Paused && !state.is_playing {
            break;
        }
        if listen.is_some_and(|limit| listened >= limit) {
            let position = state.current_time;
            if state.is_playing {
                engine.toggle_play_pause();
            }
            engine.save_progress(position, false);
            break;
        }
    }

    // The progress line is written without a newline
    let term = Term::stdout();
    term.clear_line()?;
    term.write_line(&stopped_line(engine.state()))?;
    Ok(())
}

fn show_history(args: &Args) -> Result<()> {
    let engine = open_engine(args, 0.0)?;
    let history = engine.playback_history();

    if history.is_empty() {
        println!("No saved progress");
        return Ok(());
    }

    for (episode_id, record) in history {
        let status = if record.completed {
            "completed".green()
        } else {
            "in progress".yellow()
        };
        println!(
            "  {}  {} / {}  {}  {}",
            episode_id.cyan(),
            format_time(record.current_time),
            format_time(record.duration),
            status,
            record.last_listened.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
    }
    Ok(())
}

fn show_recent(args: &Args) -> Result<()> {
    let engine = open_engine(args, 0.0)?;

    if engine.recently_played().is_empty() {
        println!("Nothing played yet");
        return Ok(());
    }

    for (index, episode) in engine.recently_played().iter().enumerate() {
        let progress = engine
            .get_episode_progress(&episode.episode_id)
            .map(|record| format_time(record.current_time))
            .unwrap_or_default();
        println!(
            "  {:>2}. {} {} {}",
            index + 1,
            truncate_title(&episode.title, 50).bold(),
            episode.show_title.dimmed(),
            progress.cyan()
        );
    }
    Ok(())
}

fn import_legacy(args: &Args, file: &Path) -> Result<()> {
    let entries = read_legacy_entries(file)
        .with_context(|| format!("Failed to read legacy state from {}", file.display()))?;
    let snapshot = Snapshot::from_legacy_entries(&entries, EngineConfig::default().default_volume)
        .context("Failed to convert legacy state")?;

    open_store(args)?
        .save(&snapshot)
        .context("Failed to write imported state")?;

    println!(
        "{SUCCESS}Imported {} progress records and {} recently played episodes",
        snapshot.playback_history.len().to_string().green(),
        snapshot.recently_played.len().to_string().green()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "podplay=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let client = ReqwestClient::new();

    println!(
        "\n{}{} {}\n",
        MICROPHONE,
        "podplay".bold().magenta(),
        "- Podcast Player".dimmed()
    );

    match &args.command {
        Command::Shows { limit } => list_shows(&client, &args.catalog_url, *limit).await?,
        Command::Episodes { show_id } => list_episodes(&client, &args.catalog_url, show_id).await?,
        Command::Play {
            show_id,
            season,
            episode,
            duration,
            tick_ms,
            listen,
            repeat,
            volume,
        } => {
            let options = PlayOptions {
                season: *season,
                episode: *episode,
                duration: *duration,
                tick: Duration::from_millis((*tick_ms).max(1)),
                listen: *listen,
                repeat: *repeat,
                volume: *volume,
            };
            play(&args, &client, show_id, &options).await?
        }
        Command::History => show_history(&args)?,
        Command::Recent => show_recent(&args)?,
        Command::Clear { recent_only } => {
            let mut engine = open_engine(&args, 0.0)?;
            if *recent_only {
                engine.clear_recently_played();
            } else {
                engine.reset_history();
            }
            println!("{SUCCESS}{}", "History cleared".green());
        }
        Command::Volume { percent } => {
            let mut engine = open_engine(&args, 0.0)?;
            engine.set_volume(*percent);
            println!("{SUCCESS}Volume set to {}%", engine.state().volume);
        }
        Command::ImportLegacy { file } => import_legacy(&args, file)?,
    }

    if let Some(path) = args.state_file.as_ref().filter(|_| !args.ephemeral) {
        println!("\n{FOLDER}State: {}\n", path.display().to_string().cyan());
    }

    Ok(())
}
