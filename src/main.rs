use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use netwhy::*;
use std::process::ExitCode;
use std::time::Duration;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Warn
        })
        .init();

    let thresholds = cli.thresholds();
    let diagnostics = match cli.to_config().and_then(Diagnostics::new) {
        Ok(diagnostics) => diagnostics,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            return ExitCode::from(1);
        }
    };

    let spinner = if cli.json {
        ProgressBar::hidden()
    } else {
        progress_spinner()
    };

    let interrupted = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let result = diagnostics.run_until(interrupted).await;
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(NetworkError::Cancelled) => {
            eprintln!("\nInterrupted by user");
            return ExitCode::from(130);
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            return ExitCode::from(1);
        }
    };

    let verdict = summarize(&report, &thresholds);

    if cli.json {
        match output::render_json(&report, &verdict) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                return ExitCode::from(1);
            }
        }
    } else {
        output::print_human(&report, &verdict, cli.summary);
    }

    if report.has_hard_failure() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn progress_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Running latency, DNS and HTTP checks...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
