use anyhow::Result;
use clap::Parser;
use motioncam::config::DEFAULT_CONFIG_TEMPLATE;
use motioncam::{EngineStats, MotionCamApp, MotionCamConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "motioncam")]
#[command(about = "Motion-triggered camera recorder")]
#[command(version)]
#[command(long_about = "Watches a camera feed, measures motion against a learned background \
and records a fixed-length clip whenever the motion exceeds a threshold. A cooldown after \
each clip prevents back-to-back recordings.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "motioncam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging, including per-frame noise values")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without opening the camera")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - open the camera and build the pipeline, but don't analyze
    #[arg(long, help = "Perform dry run - open the camera and exit before motion detection")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Stop on Enter, q or Esc
    #[arg(short, long, help = "Stop when Enter, q or Esc is pressed in the terminal")]
    keyboard: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("# Motioncam configuration file");
        println!("# Every option is shown with its default value");
        println!();
        println!("{}", DEFAULT_CONFIG_TEMPLATE);
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting motioncam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = MotionCamConfig::load_from_file(&args.config).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    if args.verbose {
        config.preview.debug = true;
    }

    match config.validate() {
        Ok(()) if args.validate_config => {
            println!("✓ Configuration is valid");
            return Ok(());
        }
        Ok(()) => {}
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
    }

    let mut app = MotionCamApp::new(config).await.map_err(|e| {
        error!("Failed to start: {}", e);
        e
    })?;
    app.set_keyboard_enabled(args.keyboard);

    if args.dry_run {
        app.initialize().await?;
        println!("{}", app.config().to_toml()?);
        app.shutdown(Ok(EngineStats::default())).await?;
        println!("✓ Dry run completed successfully - camera opened and pipeline built");
        return Ok(());
    }

    let exit_code = app.run().await.map_err(|e| {
        error!("System error during execution: {}", e);
        e
    })?;

    info!("motioncam exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "info"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("motioncam={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("pretty") => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some("compact") | None => fmt::layer()
            .compact()
            .with_target(args.debug)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_target(true).boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}
