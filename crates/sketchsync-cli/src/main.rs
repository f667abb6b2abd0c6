//! Command-line client: replay recorded board traffic or watch a live board.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use sketchsync_core::{
    ConfigError, ConnectionState, MemoryRelay, ProtocolError, Session, SessionConfig, Transport, TransportError,
    WebSocketTransport,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing board id; pass --board, set SKETCHSYNC_BOARD or add boardId to the config file")]
    MissingBoard,
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("connection to relay failed")]
    ConnectionLost,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "sketchsync", about = "Shared drawing board session client")]
struct Cli {
    /// JSON session config file.
    #[arg(long, env = "SKETCHSYNC_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "SKETCHSYNC_BOARD")]
    board: Option<String>,

    /// Display name shown with the cursor.
    #[arg(long, env = "SKETCHSYNC_NAME")]
    name: Option<String>,

    #[arg(long, env = "SKETCHSYNC_HISTORY_LIMIT")]
    history_limit: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply recorded frames (one JSON object per line) to a snapshot and print the result.
    Replay(ReplayArgs),
    /// Join a live board over WebSocket and follow its changes.
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Frames file, `-` for stdin.
    #[arg(default_value = "-")]
    input: String,

    /// JSON array of elements to start from.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct WatchArgs {
    #[arg(long, env = "SKETCHSYNC_URL", default_value = "ws://127.0.0.1:3030/ws")]
    url: String,

    /// Stop after this many seconds.
    #[arg(long)]
    seconds: Option<u64>,

    #[arg(long, default_value_t = 50)]
    interval_ms: u64,

    /// Print the final document on exit.
    #[arg(long)]
    print: bool,
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = resolve_config(&cli)?;
    match cli.command {
        Command::Replay(args) => run_replay(config, args),
        Command::Watch(args) => run_watch(config, args),
    }
}

/// Config file first, then flags and environment on top.
fn resolve_config(cli: &Cli) -> Result<SessionConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(board) = &cli.board {
        config.board_id = board.clone();
    }
    if let Some(name) = &cli.name {
        config.display_name = name.clone();
    }
    if cli.history_limit.is_some() {
        config.history_limit = cli.history_limit;
    }
    config.validate()?;
    if config.board_id.is_empty() {
        return Err(CliError::MissingBoard);
    }
    Ok(config)
}

#[derive(Debug, Default, PartialEq)]
struct ReplaySummary {
    applied: usize,
    /// Valid frames that did not change the board (stale, duplicate, locally authored).
    ignored: usize,
    dropped: usize,
}

fn run_replay(config: SessionConfig, args: ReplayArgs) -> Result<(), CliError> {
    let relay = MemoryRelay::new();
    let mut session = Session::join(config, relay.connect());

    if let Some(path) = &args.snapshot {
        let raw: Vec<Value> = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        let report = session.load(raw);
        for skipped in &report.skipped {
            log::warn!("Snapshot element {} skipped: {}", skipped.index, skipped.reason);
        }
    }

    let reader: Box<dyn BufRead> = if args.input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&args.input)?))
    };
    let summary = replay(&mut session, reader)?;
    log::info!(
        "Replayed {} frames ({} ignored, {} dropped), history {}/{}",
        summary.applied,
        summary.ignored,
        summary.dropped,
        session.history().cursor(),
        session.history().len()
    );

    let out = if args.pretty {
        serde_json::to_string_pretty(session.document())?
    } else {
        session.document().to_json()?
    };
    println!("{out}");
    Ok(())
}

fn replay<T: Transport>(session: &mut Session<T>, reader: impl BufRead) -> Result<ReplaySummary, CliError> {
    let mut summary = ReplaySummary::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match session.handle_message(line) {
            Ok(()) => summary.applied += 1,
            Err(ProtocolError::OutboundOnly(name)) => log::debug!("line {}: skipping {name}", index + 1),
            Err(ProtocolError::NotApplied(e)) => {
                log::debug!("line {}: {e}", index + 1);
                summary.ignored += 1;
            }
            Err(e) => {
                log::warn!("line {}: {e}", index + 1);
                summary.dropped += 1;
            }
        }
    }
    Ok(summary)
}

fn run_watch(config: SessionConfig, args: WatchArgs) -> Result<(), CliError> {
    let transport = WebSocketTransport::connect(&args.url)?;
    let mut session = Session::join(config, transport);
    let deadline = args.seconds.map(|s| Instant::now() + Duration::from_secs(s));
    let mut last_seen = None;

    loop {
        session.pump();
        if session.transport().state() == ConnectionState::Error {
            return Err(CliError::ConnectionLost);
        }

        let seen = (session.document().len(), session.history().len());
        if last_seen != Some(seen) {
            println!(
                "{} elements, history {}/{}",
                seen.0,
                session.history().cursor(),
                seen.1
            );
            last_seen = Some(seen);
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        thread::sleep(Duration::from_millis(args.interval_ms));
    }

    session.leave();
    if args.print {
        println!("{}", serde_json::to_string_pretty(session.document())?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn cli(config: Option<PathBuf>, board: Option<&str>, name: Option<&str>) -> Cli {
        Cli {
            config,
            board: board.map(str::to_string),
            name: name.map(str::to_string),
            history_limit: None,
            command: Command::Replay(ReplayArgs {
                input: "-".to_string(),
                snapshot: None,
                pretty: false,
            }),
        }
    }

    #[test]
    fn test_replay_frames() {
        let relay = MemoryRelay::new();
        let mut session = Session::join(SessionConfig::new("b1"), relay.connect());
        let frames = [
            r#"{"type":"element:start","boardId":"b1","tempId":"t1","element":{"id":"t1","type":"RECTANGLE","x1":0,"y1":0,"x2":0,"y2":0}}"#,
            r#"{"type":"element:update","boardId":"b1","tempId":"t1","patch":{"x2":10,"y2":10}}"#,
            "",
            r##"{"type":"cursor","boardId":"b1","x":1,"y":1,"color":"#000000","name":"x"}"##,
            r#"{"type":"element:commit","boardId":"b1","tempId":"t1","finalId":"f1","element":{"id":"f1","type":"RECTANGLE","x1":0,"y1":0,"x2":10,"y2":10}}"#,
            r#"{"type":"element:commit","boardId":"b1","tempId":"t1","finalId":"f1","element":{"id":"f1","type":"RECTANGLE","x1":0,"y1":0,"x2":10,"y2":10}}"#,
            r#"{"type":"element:update","boardId":"b1","tempId":"t1","patch":{"x2":20}}"#,
            r#"{"type":"element:erase","boardId":"b2","elementIds":["f1"]}"#,
            "not json",
        ]
        .join("\n");

        let summary = replay(&mut session, Cursor::new(frames)).unwrap();
        assert_eq!(
            summary,
            ReplaySummary {
                applied: 3,
                ignored: 2,
                dropped: 2
            }
        );
        assert_eq!(session.document().len(), 1);
        assert!(session.document().contains(&"f1".into()));
        assert_eq!(session.history().cursor(), 1);
    }

    #[test]
    fn test_resolve_config_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"boardId": "from-file", "displayName": "file"}}"#).unwrap();
        let path = file.path().to_path_buf();

        let config = resolve_config(&cli(Some(path.clone()), None, Some("flag"))).unwrap();
        assert_eq!(config.board_id, "from-file");
        assert_eq!(config.display_name, "flag");

        let config = resolve_config(&cli(Some(path), Some("b9"), None)).unwrap();
        assert_eq!(config.board_id, "b9");
        assert_eq!(config.display_name, "file");
    }

    #[test]
    fn test_resolve_config_requires_board() {
        assert!(matches!(resolve_config(&cli(None, None, None)), Err(CliError::MissingBoard)));
    }
}
