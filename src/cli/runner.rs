use tracing::{info, info_span, warn};
use tracing_subscriber::EnvFilter;

use aniso1d::{LaunchedRun, ParameterSet, PreparedRun, RunDispatcher, WorkerIdentity};

use super::args::CliArgs;
use super::errors::AppError;

/// How far a worker's run got.
#[derive(Debug)]
pub enum RunOutcome {
    /// `--dry-run`: files written, nothing launched
    Prepared(PreparedRun),
    /// Launched and left running
    Launched(LaunchedRun),
    /// `--wait`: launched and exited successfully
    Finished(PreparedRun),
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn resolve_identity(args: &CliArgs) -> Result<WorkerIdentity, AppError> {
    match (args.rank, args.size) {
        (Some(rank), size) => Ok(WorkerIdentity::new(rank, size.unwrap_or(rank + 1))?),
        (None, Some(_)) => Err(AppError::SizeWithoutRank),
        (None, None) => Ok(WorkerIdentity::from_env()?),
    }
}

/// Parameter file first, then explicit flags on top.
fn resolve_parameters(args: &CliArgs) -> Result<ParameterSet, AppError> {
    let mut params = match &args.params {
        Some(path) => {
            info!("Reading parameters from {:?}", path);
            ParameterSet::from_json_file(path)?
        }
        None => ParameterSet::new(),
    };
    params.merge(args.to_parameter_set());
    Ok(params)
}

/// Run this worker's share of the suite.
pub fn execute(args: &CliArgs) -> Result<RunOutcome, AppError> {
    let identity = resolve_identity(args)?;
    let span = info_span!("worker", rank = identity.rank, size = identity.size);
    let _entered = span.enter();

    let params = resolve_parameters(args)?;
    let mut dispatcher = RunDispatcher::new(params, identity);

    if args.dry_run {
        let prepared = dispatcher.prepare()?;
        info!(
            "Dry run: would launch {:?} in {:?}",
            prepared.command.argv(),
            prepared.command.current_dir
        );
        return Ok(RunOutcome::Prepared(prepared));
    }

    let mut launched = dispatcher.dispatch()?;
    info!(
        "Inversion for {} started (pid {})",
        launched.prepared.inputs.station,
        launched.child.id()
    );
    if !args.wait {
        return Ok(RunOutcome::Launched(launched));
    }

    let status = launched.child.wait()?;
    let station = &launched.prepared.inputs.station;
    if !status.success() {
        warn!("Inversion for {} failed: {}", station, status);
        return Err(AppError::InversionFailed {
            status: status.to_string(),
        });
    }
    info!("Inversion for {} finished", station);
    Ok(RunOutcome::Finished(launched.prepared))
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.log);
    execute(&args)?;
    Ok(())
}
