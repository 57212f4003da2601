//! Top-level command execution and the error type exit codes map from.

use capture_source::{CaptureError, CaptureSource, PipeSource};
use rotolog::{LineFormat, RetentionTrigger, RotatingWriter};
use thiserror::Error;
use tracing::info;

use crate::cli::{Cli, CliError, Command, PipeArgs};
use crate::session::{self, SessionStats};
use crate::shutdown;

#[cfg(feature = "live-capture")]
use crate::cli::LiveArgs;

/// Session-level failures, ordered by when they can occur: usage errors
/// before any resource is acquired, startup errors while opening the
/// backend, runtime errors after the pipeline is live.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Usage(#[from] CliError),
    #[error(transparent)]
    Startup(#[from] CaptureError),
    #[error("capture pipeline failed; see log output")]
    Runtime,
}

pub async fn run(cli: Cli) -> Result<SessionStats, AppError> {
    match cli.command {
        Command::Pipe(args) => run_pipe(args).await,
        #[cfg(feature = "live-capture")]
        Command::Live(args) => run_live(args).await,
    }
}

async fn run_pipe(args: PipeArgs) -> Result<SessionStats, AppError> {
    let (rotation, retention) = args.shared.validate()?;
    let argv = args.command_line()?;
    let source = PipeSource::spawn(&argv)?;
    let writer = RotatingWriter::new(
        args.shared.log_dir.clone(),
        source.describe().to_string(),
        Box::new(LineFormat),
        rotation,
        RetentionTrigger::new(args.shared.log_dir.clone(), retention),
    );
    supervise(source, writer).await
}

#[cfg(feature = "live-capture")]
async fn run_live(args: LiveArgs) -> Result<SessionStats, AppError> {
    use capture_source::{LiveConfig, LiveSource};
    use rotolog::{DataLink, PcapFormat};

    let (rotation, retention) = args.shared.validate()?;
    let mut config = LiveConfig::new(args.interface.clone());
    config.filter = args.filter.clone();
    let source = LiveSource::open(config)?;
    let format = PcapFormat::new(source.snaplen(), DataLink::from(source.datalink() as u32));
    let writer = RotatingWriter::new(
        args.shared.log_dir.clone(),
        source.describe().to_string(),
        Box::new(format),
        rotation,
        RetentionTrigger::new(args.shared.log_dir.clone(), retention),
    );
    supervise(source, writer).await
}

async fn supervise<S>(source: S, writer: RotatingWriter) -> Result<SessionStats, AppError>
where
    S: CaptureSource + 'static,
{
    let shutdown = shutdown::install();
    info!(source = source.describe(), "capture session starting");
    let stats = session::run(source, writer, shutdown).await;
    info!(
        records_forwarded = stats.records_forwarded,
        records_written = stats.writer.records_written,
        records_dropped = stats.writer.records_dropped,
        files_completed = stats.writer.files_completed,
        "capture session drained"
    );
    if stats.capture_failed {
        Err(AppError::Runtime)
    } else {
        Ok(stats)
    }
}
