mod cli;

use ripforge::{
    config, server,
    storage::StatvfsProbe,
    workflow::{self, JobKind, RipContext, RipJob, RipReport},
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use ripforge_av::SystemRunner;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise pick defaults from --verbose
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "rip=debug,ripforge=trace,ripforge_av=debug,tower_http=debug".to_string()
        } else {
            "rip=info,ripforge=info,ripforge_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Dvd {
            device,
            category,
            movie,
            query,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let device = device.unwrap_or_else(|| config.drive.default_device.clone());
            if let Some(ref m) = movie {
                println!("Using provided movie name: {}", m);
            }
            let query = movie.or(query).unwrap_or_default();
            let job = RipJob::movie(device, category.unwrap_or_default(), query);
            run_rip(&config, &job)
        }
        Commands::Tv {
            query,
            season_disc,
            device,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let device = device.unwrap_or_else(|| config.drive.default_device.clone());
            let job = RipJob::tv(device, query, &season_disc)?;
            run_rip(&config, &job)
        }
        Commands::Web {
            host,
            port,
            storage,
        } => start_web(host, port, storage, cli.config.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("rip {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_rip(config: &config::Config, job: &RipJob) -> Result<()> {
    tracing::info!("Starting rip: {}", job.describe());

    let makemkvcon =
        ripforge_av::get_tool_path("makemkvcon", config.tools.makemkvcon_path.as_deref())
            .context("makemkvcon is required; run `rip check-tools`")?;
    tracing::debug!("Using makemkvcon at {:?}", makemkvcon);

    let runner = SystemRunner;
    let space = StatvfsProbe;
    let ctx = RipContext::new(config, &runner, &space);

    let report = workflow::run_job(&ctx, job)?;
    print_report(job, &report);
    Ok(())
}

fn print_report(job: &RipJob, report: &RipReport) {
    println!("-------------------------------------------------------");
    println!("RIP COMPLETE!");
    println!("Files are in: {}", report.output_dir.display());

    if let Some(ref disk) = report.disk {
        println!(
            "Pool disk: {} ({:.2} GB free before rip)",
            disk.mount_path.display(),
            disk.available_bytes as f64 / (1024.0 * 1024.0 * 1024.0)
        );
    }

    for file in &report.kept_files {
        println!("  {}", file.file_name().unwrap_or_default().to_string_lossy());
    }
    if !report.removed_files.is_empty() {
        println!("Removed {} non-episode file(s)", report.removed_files.len());
    }

    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }

    if job.kind == JobKind::Tv {
        let season = job.season.unwrap_or(1);
        println!("\nNext steps:");
        println!("  1. Verify episodes match S{:02}E01, S{:02}E02, etc.", season, season);
        println!("  2. Verify file names are correct.");
        println!("  3. Scan the library in your media server.");
    }
}

fn start_web(
    host: Option<String>,
    port: Option<u16>,
    storage: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(storage) = storage {
        config.storage.path = storage;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting rip web server");
    println!(
        "Open http://localhost:{} in your browser",
        config.server.port
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(server::start_server(config))
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");

    let tools = ripforge_av::check_tools(|name| config.tools.program_for(name));
    let mut required_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            if tool.required {
                required_ok = false;
            }
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        if !tool.available && !tool.required {
            print!(" (optional)");
        }

        println!();
    }

    println!();
    if required_ok {
        println!("All required tools are available!");
    } else {
        println!("Some required tools are missing. Install them before ripping.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_config_summary(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            print_config_summary(&config);
        }
    }

    Ok(())
}

fn print_config_summary(config: &config::Config) {
    println!("  Storage: {}", config.storage.path.display());
    println!("  Pool enabled: {}", config.storage.pool.enabled);
    println!("  Default device: {}", config.drive.default_device.display());
    println!("  Server: {}:{}", config.server.host, config.server.port);
}
