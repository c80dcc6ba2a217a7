use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use yolabel::detection::{Detector, PrecomputedDetector};
use yolabel::image_source::DirectoryImageSource;
use yolabel::config::LogLevel;
use yolabel::{AppConfig, EditingSession, EditorCommand, SessionError};

#[derive(Parser)]
#[command(name = "yolabel")]
#[command(version, about = "Bounding-box labelling with YOLO label files", long_about = None)]
struct Cli {
    /// Directory containing the images to label
    #[arg(short, long, value_name = "DIR")]
    images: PathBuf,

    /// Directory the label files are read from and written to
    #[arg(short, long, value_name = "DIR")]
    labels: PathBuf,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory of precomputed detections (classes.txt + <image>.json)
    #[arg(short, long, value_name = "DIR")]
    detections: Option<PathBuf>,

    /// Read commands from this file instead of stdin
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), SessionError> {
    init_logging();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_from_default_path().unwrap_or_default(),
    };
    if std::env::var_os(RUST_LOG_ENV).is_none() {
        log::set_max_level(config.preferences.log_level.to_level_filter());
    }

    let images = DirectoryImageSource::open(&cli.images)?;
    let detector = match &cli.detections {
        Some(dir) => Some(Box::new(PrecomputedDetector::open(dir)?) as Box<dyn Detector>),
        None => None,
    };
    let mut session = EditingSession::open(Box::new(images), &cli.labels, &config, detector)?;
    print_current(&session);

    let input: Box<dyn BufRead> = match &cli.script {
        Some(path) => Box::new(std::io::BufReader::new(std::fs::File::open(path)?)),
        None => Box::new(std::io::stdin().lock()),
    };

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match line {
            "quit" | "exit" => break,
            "list" => {
                print_list(&session);
                continue;
            }
            _ => {}
        }

        let command = match line.parse::<EditorCommand>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        match session.dispatch(command) {
            Ok(outcome) => println!("{}", outcome),
            Err(e) => eprintln!("{}", e),
        }
        session.clear_dirty();
    }

    if let Some(path) = session.save_current()? {
        println!("Saved {}", path.display());
    }
    Ok(())
}

const RUST_LOG_ENV: &str = "RUST_LOG";

/// Install the logger before the config is read, at the default level. The
/// configured level is applied afterwards unless `RUST_LOG` is set.
fn init_logging() {
    let mut builder = env_logger::Builder::new();
    if std::env::var_os(RUST_LOG_ENV).is_some() {
        builder.parse_env(RUST_LOG_ENV);
    } else {
        builder.filter_level(log::LevelFilter::Trace);
    }
    builder.init();

    if std::env::var_os(RUST_LOG_ENV).is_none() {
        log::set_max_level(LogLevel::default().to_level_filter());
    }
}

fn print_current(session: &EditingSession) {
    if let Some(entry) = session.current_image() {
        let (width, height) = session.image_size();
        println!(
            "{} ({}/{}) {}x{}, {} annotations",
            entry.name,
            session.current_index() + 1,
            session.image_count(),
            width,
            height,
            session.store().len()
        );
    }
}

fn print_list(session: &EditingSession) {
    print_current(session);
    for label in session.registry().iter() {
        let marker = if session.registry().active_id() == Some(label.id) {
            "*"
        } else {
            " "
        };
        println!("{} label {} '{}' {}", marker, label.id, label.name, label.color.name());
    }
    for rendered in session.render_list() {
        let b = rendered.bbox;
        println!(
            "  {} label {} ({:.1}, {:.1}, {:.1}, {:.1}) {}",
            rendered.handle,
            rendered.label_id,
            b.x1,
            b.y1,
            b.x2,
            b.y2,
            rendered.color.name()
        );
    }
}
