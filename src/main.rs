//! asynctest - Asynchronous parameterized test runner
//!
//! Runs attribute-driven test suites: discovery over declared metadata,
//! parameter hosts wrapped around cancellable invokers, result trees
//! rendered as text or JSON. Suites run locally, fixtures-in-parallel, or
//! on a remote runner over TCP.

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::time::Duration;
use tracing::{info, warn};

use asynctest::cli::{self, Args};
use asynctest::config::{SettingsBag, TestConfiguration, TestFilter};
use asynctest::context::CancellationToken;
use asynctest::executor::{RunError, RunSummary, TestSession};
use asynctest::models::TestResult;
use asynctest::output::{OutputFormat, ResultFormatter};
use asynctest::remoting::{RemoteClient, RunParameters, TestServer};
use asynctest::selftest;
use asynctest::utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    });

    match args.command {
        cli::Command::Run(run_args) => run_suite(run_args).await?,
        cli::Command::List(list_args) => list_suite(list_args),
        cli::Command::Listen(listen_args) => listen(listen_args).await?,
        cli::Command::Connect(connect_args) => connect(connect_args).await?,
    }

    Ok(())
}

fn load_settings(path: Option<&str>) -> Result<SettingsBag> {
    match path {
        Some(path) => SettingsBag::load(path),
        None => Ok(SettingsBag::new()),
    }
}

async fn run_suite(args: cli::RunArgs) -> Result<()> {
    let mut settings = load_settings(args.settings.as_deref())?;
    if let Some(category) = &args.category {
        settings.set("category", category.clone());
    }
    if let Some(repeat) = args.repeat {
        settings.set("repeat", repeat.to_string());
    }

    let (suite, registry) = selftest::sample_suite();
    info!(
        "Running {} ({} fixtures, {} cases)",
        suite.name(),
        suite.fixtures().len(),
        suite.case_count()
    );

    let filter = TestFilter::new(TestConfiguration::from_settings(&settings));
    let session = TestSession::new(suite)
        .with_settings(settings)
        .with_filter(filter)
        .with_registry(registry);

    let token = CancellationToken::new();
    if let Some(secs) = args.timeout {
        token.cancel_after(Duration::from_secs(secs));
    }

    let started = Utc::now();
    let outcome = if args.parallel {
        session.run_parallel(args.concurrent, &token).await
    } else {
        session.run(&token).await
    };

    let (result, aborted) = match outcome {
        Ok(result) => (result, false),
        Err(RunError::Aborted { partial }) => (partial, true),
        Err(error) => return Err(error.into()),
    };

    let summary = RunSummary::over(&result, started);
    emit(&result, &args.format, args.no_color, args.output.as_deref())?;
    info!(
        "Completed in {}ms - pass rate {:.1}%",
        summary.duration_ms(),
        summary.pass_rate()
    );

    if aborted {
        warn!("Run aborted before completion");
        std::process::exit(1);
    }
    if !summary.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn list_suite(args: cli::ListArgs) {
    let (suite, _) = selftest::sample_suite();
    println!("{}", suite.name());
    for fixture in suite.fixtures() {
        println!("  {}", fixture.name());
        if args.detailed {
            for case in fixture.cases() {
                let categories: Vec<&str> =
                    case.categories().iter().map(|c| c.name()).collect();
                if categories.is_empty() {
                    println!("    {}", case.name());
                } else {
                    println!("    {} [{}]", case.name(), categories.join(", "));
                }
            }
        }
    }
}

async fn listen(args: cli::ListenArgs) -> Result<()> {
    let settings = load_settings(args.settings.as_deref())?;
    let (suite, registry) = selftest::sample_suite();

    let server = TestServer::bind(suite, settings, registry, args.addr.as_str()).await?;
    server.serve(CancellationToken::new()).await
}

async fn connect(args: cli::ConnectArgs) -> Result<()> {
    let mut params = RunParameters::new();
    if let Some(category) = &args.category {
        params = params.with_category(category.clone());
    }
    if let Some(repeat) = args.repeat {
        params = params.with_repeat(repeat);
    }

    info!("Session {}: connecting to {}", params.session, args.addr);
    let mut client = RemoteClient::connect(args.addr.as_str()).await?;
    let outcome = client.run(&params).await?;

    emit(
        &outcome.result,
        &args.format,
        args.no_color,
        args.output.as_deref(),
    )?;

    if outcome.aborted {
        warn!("Remote run aborted before completion");
        std::process::exit(1);
    }
    if outcome.result.counts().errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn emit(result: &TestResult, format: &str, no_color: bool, output: Option<&str>) -> Result<()> {
    let format = OutputFormat::from_str(format)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {format}"))?;
    let mut formatter = ResultFormatter::new(format);
    if no_color || output.is_some() {
        formatter = formatter.no_color();
    }

    let rendered = formatter.format_tree(result);
    match output {
        Some(path) => {
            std::fs::write(path, &rendered)?;
            println!("✓ Results written to {path}");
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
