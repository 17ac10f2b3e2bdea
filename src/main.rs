use std::{ffi::OsString, process::ExitCode};

use clap::{error::ErrorKind, Parser};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::args::{log_usage, validate_dirs, Args};
use crate::error::UpdaterError;

mod args;

mod error;

mod installer;

mod locator;

mod restore;

#[cfg(test)]
mod test_utils;

const UPDATED: u8 = 0;

const INVALID_ARGUMENTS: u8 = 2;

/// Runs the whole update and returns the exit code.
///
/// Bad arguments are logged and reported through the exit code before anything is
/// downloaded or copied; every later failure is returned as an error.
async fn run<I, T>(argv: I) -> Result<u8, UpdaterError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match Args::try_parse_from(argv) {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            debug!("{err}");
            log_usage();
            return Ok(INVALID_ARGUMENTS);
        }
    };

    if let Err(err) = validate_dirs(&args.server_install_dir, &args.backup_dir) {
        error!("{err}");
        return Ok(INVALID_ARGUMENTS);
    }

    let client = reqwest::ClientBuilder::new().gzip(true).build()?;

    let archive = locator::locate_and_download(
        &client,
        &args.download_page,
        &args.link_prefix,
        &args.backup_dir,
    )
    .await?;

    let server_backup_dir =
        installer::install_new_version(&args.server_install_dir, &args.backup_dir, &archive)?;

    restore::restore_configs(&args.server_install_dir, &server_backup_dir)?;

    info!("Ok");

    Ok(UPDATED)
}

#[tokio::main]
async fn main() -> Result<ExitCode, UpdaterError> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(ExitCode::from(run(std::env::args_os()).await?))
}
