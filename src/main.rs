use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use key_dispatch::{
    default_backend, CharacterResolver, DispatchConfig, Dispatcher, EventBackend, EventKind,
    FailurePolicy, KeySender, ProcessDirectory, ProcessFinder, ProcessHandle, RecordingBackend,
    SendReport, SystemLauncher, TextStyle, UsLayout,
};

#[derive(Parser, Debug)]
#[command(name = "kd", version, about = "Send synthetic key events to a process or globally")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Build and log events without posting them
    #[arg(long)]
    dry_run: bool,

    /// Keep going when an event fails instead of aborting
    #[arg(long)]
    best_effort: bool,

    /// Do not post a key-up after each key-down
    #[arg(long)]
    no_key_up: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Type text character by character
    Type {
        text: String,

        /// Emit explicit down/up pairs instead of presses
        #[arg(long)]
        down_up: bool,

        #[command(flatten)]
        target: Target,
    },
    /// Send a key chord such as `cmd+shift+s`
    Key {
        chord: String,

        /// down, up or press
        #[arg(long, default_value = "press")]
        kind: EventKind,

        #[command(flatten)]
        target: Target,
    },
    /// List running processes
    List {
        /// Only show processes whose name contains this text
        filter: Option<String>,
    },
}

#[derive(Args, Debug)]
struct Target {
    /// Application name to deliver to
    #[arg(short, long, conflicts_with_all = ["pid", "global", "frontmost"])]
    app: Option<String>,

    /// Process ID to deliver to
    #[arg(short, long, conflicts_with_all = ["global", "frontmost"])]
    pid: Option<u32>,

    /// Post to the system-wide input stream
    #[arg(short, long, conflicts_with = "frontmost")]
    global: bool,

    /// Deliver to the focused process
    #[arg(short, long)]
    frontmost: bool,

    /// Launch the application first if it is not running
    #[arg(long, requires = "app")]
    open: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => DispatchConfig::from_file(path)?,
        None => DispatchConfig::default(),
    };
    if cli.best_effort {
        config.failure_policy = FailurePolicy::BestEffort;
    }
    if cli.no_key_up {
        config.send_key_up = false;
    }

    match cli.command {
        Command::List { filter } => list_processes(filter.as_deref()),
        Command::Type {
            text,
            down_up,
            target,
        } => {
            if down_up {
                config.text_style = TextStyle::DownUp;
            }
            let resolver = CharacterResolver::new(UsLayout::new());
            let sender = KeySender::from_text(&text, &resolver, config.text_style);
            let typed = text.chars().count();
            let expected = typed * config.text_style.events_per_char();
            if sender.len() != expected {
                println!(
                    "{} {} of {} characters have no key on this layout and were skipped",
                    "⚠️".yellow(),
                    typed - sender.len() / config.text_style.events_per_char(),
                    typed
                );
            }
            deliver(&sender, &target, config, cli.dry_run)
        }
        Command::Key {
            chord,
            kind,
            target,
        } => {
            let (key, modifiers) = key_dispatch::parse_chord(&chord)?;
            let sender = KeySender::from_key(key, modifiers, kind);
            deliver(&sender, &target, config, cli.dry_run)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn deliver(sender: &KeySender, target: &Target, config: DispatchConfig, dry_run: bool) -> Result<()> {
    let recording = Arc::new(RecordingBackend::new());
    let backend: Box<dyn EventBackend> = if dry_run {
        Box::new(Arc::clone(&recording))
    } else {
        default_backend()?
    };
    config.validate()?;
    let mut dispatcher = Dispatcher::new(
        backend,
        Box::new(ProcessFinder::new()),
        Box::new(SystemLauncher::new()),
        config,
    );

    let report = if let Some(pid) = target.pid {
        sender.send_to_process(&dispatcher, &ProcessHandle::new(pid, format!("pid {pid}")))?
    } else if let Some(app) = &target.app {
        if target.open {
            sender.open_and_send(&mut dispatcher, app)?
        } else {
            sender.send_to_app(&mut dispatcher, app)?
        }
    } else if target.frontmost {
        sender.send_to_frontmost(&mut dispatcher)?
    } else if target.global {
        sender.send_globally(&dispatcher)?
    } else {
        anyhow::bail!("no target given: use --app, --pid, --frontmost or --global");
    };

    print_report(report);
    if dry_run {
        for posted in recording.posted() {
            println!(
                "   {:?} {} {} (flags 0x{:08X})",
                posted.target,
                posted.event.kind(),
                posted.event.key(),
                posted.event.flags()
            );
        }
    }
    Ok(())
}

fn print_report(report: SendReport) {
    if report.failed == 0 {
        println!("{} Posted {} key events", "✅".green(), report.posted);
    } else {
        println!(
            "{} Posted {} key events, {} failed",
            "⚠️".yellow(),
            report.posted,
            report.failed
        );
    }
}

fn list_processes(filter: Option<&str>) -> Result<()> {
    let mut finder = ProcessFinder::new();
    let processes = finder
        .all_running_processes()
        .context("failed to enumerate processes")?;
    let filter = filter.map(str::to_lowercase);

    for process in processes
        .iter()
        .filter(|p| match &filter {
            Some(f) => p.name.to_lowercase().contains(f),
            None => true,
        })
    {
        println!("{:>8}  {}", process.pid.to_string().cyan(), process.name);
    }
    Ok(())
}
