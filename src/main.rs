use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use autoclicker::config::parse_duration;
use autoclicker::params::clamp_interval;
use autoclicker::{
    ClickEngine, Config, EngineEvent, EnigoSender, HotkeySpec, Profile, RdevKeySource,
};

const DEFAULT_CONFIG: &str = "autoclicker.json";

#[derive(Parser)]
#[command(name = "autoclicker", version, about = "Hotkey-toggled auto clicker")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the engine until Ctrl-C
    Run {
        /// Settings file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: String,

        /// Profile to load (defaults to the last used one)
        #[arg(short, long)]
        profile: Option<String>,

        /// Override the toggle hotkey, e.g. "Ctrl+Alt+F8"
        #[arg(long)]
        hotkey: Option<String>,

        /// Override the steady delay, e.g. "100ms" or "1s"
        #[arg(long, value_parser = parse_duration)]
        delay: Option<Duration>,

        /// Start clicking immediately instead of waiting for the hotkey
        #[arg(long)]
        start: bool,

        /// Append points recorded with F12 to the profile and save on exit
        #[arg(long)]
        record: bool,
    },

    /// Validate a hotkey string and print its normalized form
    CheckHotkey { spec: String },

    /// List saved profiles
    Profiles {
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: String,
    },
}

struct RunArgs {
    config: String,
    profile: Option<String>,
    hotkey: Option<String>,
    delay: Option<Duration>,
    start: bool,
    record: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Command::Run {
            config,
            profile,
            hotkey,
            delay,
            start,
            record,
        } => {
            run(RunArgs {
                config,
                profile,
                hotkey,
                delay,
                start,
                record,
            })
            .await
        }
        Command::CheckHotkey { spec } => check_hotkey(&spec),
        Command::Profiles { config } => list_profiles(&config),
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config = Config::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config))?;

    let hotkey = match &args.hotkey {
        Some(text) => text.parse::<HotkeySpec>()?,
        None => config.hotkey_or_default(),
    };

    let (profile_name, mut profile) = match &args.profile {
        Some(name) => (name.clone(), config.profile(name)?.clone()),
        None => match config.active_profile() {
            Some((name, profile)) => (name.to_string(), profile.clone()),
            None => ("default".to_string(), Profile::default()),
        },
    };

    let mut params = profile.to_params();
    if let Some(delay) = args.delay {
        params.delay_ms = clamp_interval(i64::try_from(delay.as_millis()).unwrap_or(i64::MAX));
    }

    let sender = Arc::new(EnigoSender::new().context("creating input backend")?);
    let engine = ClickEngine::new(sender, Box::new(RdevKeySource::new()))
        .context("starting key hook")?;
    engine.set_params(params);
    engine.update_hotkey(hotkey.clone());
    let mut events = engine.subscribe();

    println!(
        "{} profile '{}' loaded, press {} to toggle, F12 to record, Ctrl-C to quit",
        "🖱️".bold(),
        profile_name.cyan(),
        hotkey.to_string().bold()
    );

    if args.start {
        engine.start();
    }

    let mut recorded = Vec::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(EngineEvent::StateChanged { running: true }) => {
                    println!("{}", "▶️  Clicking STARTED".green());
                }
                Ok(EngineEvent::StateChanged { running: false }) => {
                    println!("{}", "⏸️  Clicking STOPPED".yellow());
                }
                Ok(EngineEvent::PointRecorded(point)) => {
                    println!("{} ({}, {})", "📍 Recorded".cyan(), point.x, point.y);
                    recorded.push(point);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "engine event receiver lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c => {
                info!("ctrl-c received");
                break;
            }
        }
    }

    tokio::task::spawn_blocking(move || engine.shutdown())
        .await
        .context("waiting for engine shutdown")?;

    if args.record && !recorded.is_empty() {
        let count = recorded.len();
        profile.recorded_points.extend(recorded);
        let at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        config.push_history(profile_name.clone(), profile.clone(), at);
        config.upsert_profile(profile_name.clone(), profile);
        config.save_to_file(&args.config)?;
        println!(
            "{} saved {} point(s) to profile '{}'",
            "💾".bold(),
            count,
            profile_name
        );
    }

    Ok(())
}

fn check_hotkey(spec: &str) -> Result<()> {
    let hotkey: HotkeySpec = spec.parse()?;
    println!("{} {}", "✓".green(), hotkey);
    Ok(())
}

fn list_profiles(path: &str) -> Result<()> {
    let config = Config::load_or_default(path).with_context(|| format!("loading {path}"))?;
    if config.profiles.is_empty() {
        println!("no profiles in {path}");
        return Ok(());
    }

    let last = config.last_profile.as_deref();
    for (name, profile) in &config.profiles {
        let marker = if Some(name.as_str()) == last { "*" } else { " " };
        println!(
            "{} {} ({:?}, {} ms, {} recorded point(s))",
            marker.green(),
            name.bold(),
            profile.button,
            profile.delay_ms,
            profile.recorded_points.len()
        );
    }
    Ok(())
}
