use clap::{ArgAction, Parser, Subcommand};
use drawalong::imaging::RustBackend;
use drawalong::{config, output, process};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "drawalong")]
#[command(about = "Normalize drawing uploads: upright, bounded, JPEG")]
#[command(long_about = "\
Normalize drawing uploads: upright, bounded, JPEG

Every image is read once for its EXIF orientation, scaled so neither side
exceeds the size bound (never upscaled), painted upright and re-encoded as
JPEG. Metadata problems never fail a file; they fall back to 'as stored'.

  drawalong normalize uploads/ --out-dir out/
  drawalong normalize cat.png --max-dim 1024 --quality 0.7
  drawalong inspect IMG_0001.jpeg

Settings are read from ./drawalong.toml when present (or --config FILE).
Run 'drawalong gen-config' to generate a documented one.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./drawalong.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more detail to stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Overrides for the `[normalize]` config section.
#[derive(clap::Args, Clone)]
struct NormalizeArgs {
    /// Cap on the longer output side, in pixels
    #[arg(long)]
    max_dim: Option<u32>,

    /// JPEG quality (clamped to 0.5-0.95)
    #[arg(long)]
    quality: Option<f32>,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize image files (directories are searched recursively)
    Normalize {
        /// Image files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Where normalized JPEGs are written
        #[arg(long, default_value = "normalized")]
        out_dir: PathBuf,

        /// Print the batch summary as JSON instead of per-file lines
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        args: NormalizeArgs,
    },
    /// Show orientation and planned output size without encoding
    Inspect {
        /// Image files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        args: NormalizeArgs,
    },
    /// Print a stock drawalong.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Normalize {
            paths,
            out_dir,
            json,
            args,
        } => {
            let app_config = load_app_config(cli.config.as_deref(), &args)?;
            init_thread_pool(&app_config.processing);
            let options = app_config.normalize.to_options();
            let inputs = process::collect_inputs(&paths)?;
            let backend = RustBackend::new();

            let summary = if json {
                let summary = process::normalize_files(&backend, &inputs, &out_dir, &options, None)?;
                println!("{}", serde_json::to_string_pretty(&summary)?);
                summary
            } else {
                let (tx, rx) = std::sync::mpsc::channel();
                let printer = std::thread::spawn(move || {
                    for event in rx {
                        for line in output::format_process_event(&event) {
                            println!("{}", line);
                        }
                    }
                });
                let summary =
                    process::normalize_files(&backend, &inputs, &out_dir, &options, Some(tx))?;
                printer.join().map_err(|_| "output thread panicked")?;
                output::print_summary(&summary);
                summary
            };

            if summary.has_failures() {
                return Err(format!("{} of {} files failed", summary.failed.len(), inputs.len()).into());
            }
        }
        Command::Inspect { paths, args } => {
            let app_config = load_app_config(cli.config.as_deref(), &args)?;
            let options = app_config.normalize.to_options();
            let inputs = process::collect_inputs(&paths)?;
            let inspected = process::inspect_files(&RustBackend::new(), &inputs, &options);
            output::print_inspect_output(&inspected);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Stock defaults, then the config file, then command-line flags.
fn load_app_config(
    path: Option<&Path>,
    args: &NormalizeArgs,
) -> Result<config::AppConfig, config::ConfigError> {
    let mut app_config = match path {
        Some(path) if !path.exists() => {
            return Err(config::ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file not found: {}", path.display()),
            )));
        }
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(Path::new("."))?,
    };
    if let Some(max_dim) = args.max_dim {
        app_config.normalize.max_dimension = max_dim;
    }
    if let Some(quality) = args.quality {
        app_config.normalize.quality = quality;
    }
    // Flag values are clamped, not rejected; only the dimension can be invalid.
    if app_config.normalize.max_dimension == 0 {
        return Err(config::ConfigError::Validation(
            "--max-dim must be non-zero".into(),
        ));
    }
    Ok(app_config)
}

/// Logs go to stderr so stdout stays the report.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
