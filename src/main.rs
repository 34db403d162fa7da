mod app;
mod ui;

use anyhow::Result;
use chrono::Local;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use tracing::warn;

use scanlog::capture::{decoder::default_decoder, open_camera, CaptureLoop};
use scanlog::config::Config;
use scanlog::db::DetectionStore;
use scanlog::dedup::DedupWindow;
use scanlog::export::export_daily_report;
use scanlog::logging;
use scanlog::recording::{FfmpegSinkFactory, RecordingController};
use scanlog::tasks::BackgroundWriter;

use app::App;

#[derive(Debug, Default)]
struct Args {
    config_path: Option<PathBuf>,
    export_report: bool,
    no_camera: bool,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("scanlog {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    parsed.config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--export-report" => parsed.export_report = true,
            "--no-camera" => parsed.no_camera = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn print_help() {
    println!(
        r#"scanlog - barcode scan recorder

USAGE:
    scanlog [OPTIONS]

OPTIONS:
    --config, -c PATH   Path to config file
    --export-report     Write the daily report CSV and exit
    --no-camera         Start without opening the camera
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    SCANLOG_CONFIG      Path to config file (overrides default location)
    SCANLOG_LOG         Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/scanlog/config.toml"#
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();

    // Initialize logging (uses journald on Linux, file fallback otherwise)
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    let config = match args.config_path {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    logging::log_startup(&config);

    let store = DetectionStore::open(&config.db_path())?;

    if args.export_report {
        let now = Local::now().naive_local();
        match export_daily_report(&store, &config.data_dir(), now)? {
            Some(path) => println!("Report saved to: {}", path.display()),
            None => println!("No data available to export."),
        }
        return Ok(());
    }

    let recorder = RecordingController::new(
        config.recordings_dir(),
        &config.recording,
        Box::new(FfmpegSinkFactory::new(&config.recording)),
    );
    let mut capture = CaptureLoop::new(
        default_decoder(),
        DedupWindow::from_secs(config.capture.dedup_interval_secs),
        recorder,
        BackgroundWriter::new(store.clone()),
    )
    .with_annotation(config.preview.annotate);

    let camera_error = if args.no_camera {
        Some("Camera disabled (--no-camera).".to_string())
    } else {
        match open_camera(&config.capture) {
            Ok(source) => {
                capture.open(source);
                None
            }
            Err(e) => {
                warn!("{}", e);
                Some(e.to_string())
            }
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, store, capture, camera_error)?;
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
