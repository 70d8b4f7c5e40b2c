use anyhow::Context;
use clap::Parser;
use kinsta_deploy::config::cli::LogFormat;
use kinsta_deploy::config::VERBOSE_VAR;
use kinsta_deploy::utils::logger;
use kinsta_deploy::{CliArgs, DeployError, DeploymentReport, Deployer, StepOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let verbose = args.verbose || std::env::var(VERBOSE_VAR).map(|v| v == "true").unwrap_or(false);
    match args.log_format {
        LogFormat::Text => logger::init_cli_logger(verbose),
        LogFormat::Json => logger::init_json_logger(verbose),
    }

    tracing::info!("Starting kinsta-deploy v{}", env!("CARGO_PKG_VERSION"));
    if verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    if verbose {
        tracing::debug!("Resolved config: {:?}", config);
    }

    let deployer = Deployer::new(config).context("failed to prepare the deployment")?;

    let outcome = tokio::select! {
        result = deployer.run() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    // Dropping the deployer removes its scratch workspace; process::exit would skip that.
    drop(deployer);

    match outcome {
        Some(Ok(report)) => {
            match args.log_format {
                LogFormat::Text => print_summary(&report),
                LogFormat::Json => println!("{}", report_json(&report)?),
            }
            Ok(())
        }
        Some(Err(e)) => fail(&e),
        None => {
            tracing::warn!("🛑 Interrupted; the remote site may be partially updated");
            eprintln!("🛑 Deployment interrupted");
            std::process::exit(1);
        }
    }
}

fn fail(e: &DeployError) -> ! {
    tracing::error!(
        "❌ Deployment failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

fn print_summary(report: &DeploymentReport) {
    let stats = &report.stats;
    let mode = if report.dry_run { " (dry run)" } else { "" };
    println!("✅ Deployment completed via {}{}", report.transport, mode);
    println!(
        "📊 Files: {}  Bytes: {}  Time: {}s{}",
        stats.files,
        stats.bytes,
        stats.elapsed_secs,
        if stats.estimated { "  (estimated)" } else { "" }
    );
    println!("🔌 MU plugin: {}", describe(&report.plugin));
    println!("🧹 Cache: {}", describe(&report.cache));
}

fn report_json(report: &DeploymentReport) -> kinsta_deploy::Result<String> {
    Ok(serde_json::to_string(report)?)
}

fn describe(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Succeeded => "done".to_string(),
        StepOutcome::Skipped(reason) => format!("skipped ({})", reason),
        StepOutcome::Degraded(reason) => format!("⚠️ {}", reason),
    }
}
