//! depconf - dependency graph constraint modeling CLI
//!
//! Exit codes:
//! - 0: a configuration was found (or the query succeeded)
//! - 1: error
//! - 2: no configuration, or no graph for the root
//! - 3: the solver ran out of time

use chrono::Utc;
use clap::Parser;
use depconf::cli::{CliArgs, Command};
use depconf::config::Settings;
use depconf::domain::{Ecosystem, Outcome};
use depconf::enrich::NoImpact;
use depconf::logging;
use depconf::model::ModelBuilder;
use depconf::output::{create_formatter, OutputConfig, OutputFormatter};
use depconf::progress::Progress;
use depconf::registry::create_provider;
use depconf::request::OperationRequest;
use depconf::service::{AnalysisService, CatalogService};
use depconf::store::{FileGraphStore, FileModelStore, FilePackageStore};
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

const EXIT_NOT_FOUND: u8 = 2;
const EXIT_TIMED_OUT: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    logging::init(args.verbose, args.quiet);

    // Run the main logic and handle errors
    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let settings = Settings::load_optional(args.config.as_deref())?;
    let cache_dir = args.cache_dir_or(&settings.cache.dir);
    let formatter = create_formatter(OutputConfig::from_cli(args.json, args.verbose, args.quiet));

    if let Some(request) = args.operation_request()? {
        let service = analysis_service(&args.graph_dir, &cache_dir, &settings)?;
        let progress = Progress::new(!args.quiet && !args.json);
        return solve(&service, &request, formatter.as_ref(), progress).await;
    }

    let mut stdout = io::stdout().lock();
    match &args.command {
        Command::Info { root } => {
            let service = analysis_service(&args.graph_dir, &cache_dir, &settings)?;
            match service.info(root, args.depth()?).await? {
                Some(summary) => {
                    formatter.format_summary(root, &summary, &mut stdout)?;
                    stdout.flush()?;
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("No dependency graph for '{}'", root);
                    Ok(ExitCode::from(EXIT_NOT_FOUND))
                }
            }
        }
        Command::Versions { ecosystem, package } => {
            let catalog = catalog_service(*ecosystem, &cache_dir, &settings)?;
            let package = catalog.versions(package, Utc::now()).await?;
            formatter.format_package(&package, &mut stdout)?;
            stdout.flush()?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Requires {
            ecosystem,
            package,
            version,
        } => {
            let catalog = catalog_service(*ecosystem, &cache_dir, &settings)?;
            let requirements = catalog.requirements(package, version).await?;
            formatter.format_requirements(package, version, &requirements, &mut stdout)?;
            stdout.flush()?;
            Ok(ExitCode::SUCCESS)
        }
        // Operation commands always produce a request
        _ => unreachable!(),
    }
}

fn analysis_service(graph_dir: &Path, cache_dir: &Path, settings: &Settings) -> anyhow::Result<AnalysisService> {
    let graphs = Arc::new(FileGraphStore::new(graph_dir));
    let models = Arc::new(FileModelStore::new(cache_dir.join("models")));
    let builder = ModelBuilder::new(settings.runtime.normalizer()?);
    Ok(AnalysisService::new(graphs, models).with_builder(builder))
}

fn catalog_service(ecosystem: Ecosystem, cache_dir: &Path, settings: &Settings) -> anyhow::Result<CatalogService> {
    let provider = create_provider(ecosystem, settings.registry.client()?);
    Ok(CatalogService::new(
        FilePackageStore::new(cache_dir.join("packages")),
        provider,
        Box::new(NoImpact),
        settings.runtime.normalizer()?,
        settings.refresh.max_age(),
    ))
}

/// Run one operation and print its outcome
async fn solve(
    service: &AnalysisService,
    request: &OperationRequest,
    formatter: &dyn OutputFormatter,
    mut progress: Progress,
) -> anyhow::Result<ExitCode> {
    progress.spinner(&format!("Solving {} for {}", request.operation.name(), request.root));
    let result = service.run(request).await;
    progress.finish_and_clear();
    let outcome = result?;

    let mut stdout = io::stdout().lock();
    formatter.format_outcome(&request.root, request.operation.name(), &outcome, &mut stdout)?;
    stdout.flush()?;

    Ok(match outcome {
        Outcome::Configurations(_) => ExitCode::SUCCESS,
        Outcome::NotFound => ExitCode::from(EXIT_NOT_FOUND),
        Outcome::TimedOut(_) => ExitCode::from(EXIT_TIMED_OUT),
    })
}
