//! Livemath - render the math in a Markdown document the way the live editor
//! shows it
//!
//! Entry point for the command line tool. Handles CLI argument parsing,
//! logging initialization, and runs the pipeline once over a file.

use livemath::config::Config;
use livemath::document::read_document;
use livemath::editor::{EditorHost, EditorView, HeadingsPlugin, Transaction};
use livemath::error::{AppError, AppResult};
use livemath::math::{MathController, Typesetter};
use std::path::PathBuf;
use std::rc::Rc;
use tokio::task::LocalSet;

/// Application name for logging
const APP_NAME: &str = "livemath";

/// Parsed command line
#[derive(Debug, Default)]
struct Options {
    file: Option<PathBuf>,
    cursor: Option<usize>,
    config: Option<PathBuf>,
    html: bool,
}

fn main() {
    // Initialize logging
    init_logging();

    let options = parse_args();

    if let Err(err) = run(options) {
        match &err {
            AppError::FileIO(file_err) => eprintln!("Error: {}", file_err.user_message()),
            other => eprintln!("Error: {}", other),
        }
        std::process::exit(1);
    }
}

/// Initialize the logging system
fn init_logging() {
    // Set default log level if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,livemath=debug");
    }

    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();
}

fn run(options: Options) -> AppResult<()> {
    let config = match &options.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::Unexpected(format!("could not start runtime: {}", e)))?;

    LocalSet::new().block_on(&runtime, render_document(options, config))
}

async fn render_document(options: Options, config: Config) -> AppResult<()> {
    let Some(path) = options.file else {
        return Err(AppError::Unexpected("no input file".to_string()));
    };
    let text = read_document(&path).await?;
    log::info!("Rendering math in {}", path.display());

    let typesetter = Rc::new(Typesetter::mathml(config.engine.clone()));
    typesetter.ensure_ready().await?;

    let view = EditorView::new(&text);
    let host: Rc<dyn EditorHost> = view.clone();
    let math = MathController::new(Rc::downgrade(&host), typesetter, config.math.clone());
    view.attach(Rc::new(HeadingsPlugin::new(Rc::downgrade(&host))));
    view.attach(math.clone());

    if let Some(pos) = options.cursor {
        view.dispatch(Transaction::new().cursor(pos));
    }

    // Let the debounced rebuild fire and every render land
    while math.is_debouncing() || !math.queue().is_idle() {
        if math.is_debouncing() {
            tokio::time::sleep(config.math.debounce()).await;
        } else {
            math.queue().wait_idle().await;
        }
    }

    let annotations = view.annotations();
    if options.html {
        for (annotation, widget) in annotations.widgets() {
            println!("<!-- {}..{} -->", annotation.from, annotation.to);
            println!("{}", widget.to_html());
        }
    } else {
        for annotation in &annotations {
            println!("{}", annotation);
        }
    }

    log::info!(
        "{} annotations, {} formulas cached, {} failed",
        annotations.len(),
        math.cache_len(),
        math.error_count()
    );
    Ok(())
}

/// Parse command line arguments
fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-c" | "--cursor" => match args.get(i + 1).and_then(|v| v.parse().ok()) {
                Some(pos) => {
                    options.cursor = Some(pos);
                    i += 1;
                }
                None => {
                    eprintln!("Error: --cursor requires a character offset");
                    std::process::exit(1);
                }
            },
            "--config" => {
                if i + 1 < args.len() {
                    options.config = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--html" => options.html = true,
            arg if arg.starts_with('-') => {
                eprintln!("Unknown option: {}", arg);
                eprintln!("Use --help for usage information");
                std::process::exit(1);
            }
            _ => {
                if options.file.is_some() {
                    eprintln!("Error: only one file can be rendered at a time");
                    std::process::exit(1);
                }
                options.file = Some(PathBuf::from(&args[i]));
            }
        }
        i += 1;
    }

    if options.file.is_none() {
        eprintln!("Error: missing FILE argument");
        eprintln!("Use --help for usage information");
        std::process::exit(1);
    }

    options
}

/// Print help message
fn print_help() {
    println!(
        r#"Livemath - live math rendering for Markdown

USAGE:
    livemath [OPTIONS] FILE

OPTIONS:
    -h, --help              Show this help message
    -v, --version           Show version information
    -c, --cursor OFFSET     Place the cursor at a character offset first
        --config PATH       Read configuration from PATH
        --html              Print widget HTML instead of annotations

EXAMPLES:
    livemath notes.md                 List the annotations for notes.md
    livemath -c 120 notes.md          Same, with the cursor at offset 120
    livemath --html notes.md          Print the rendered formulas
"#
    );
}

/// Print version information
fn print_version() {
    println!("{} {}", APP_NAME, env!("CARGO_PKG_VERSION"));
}
