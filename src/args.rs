use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::error;

use crate::error::{Result, UpdaterError};

pub const BEDROCK_SERVER_PAGE: &str = "https://www.minecraft.net/en-us/download/server/bedrock";

pub const BEDROCK_LINUX_LINK_PREFIX: &str =
    "https://minecraft.azureedge.net/bin-linux/bedrock-server-";

/// Updates a bedrock server to the latest release, keeping a backup and its config
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory where the current bedrock server is installed
    #[arg(value_name = "SERVER_INSTALL_DIR")]
    pub server_install_dir: PathBuf,

    /// Directory where the downloaded archive and backups are written
    #[arg(value_name = "BACKUP_DIR")]
    pub backup_dir: PathBuf,

    /// Page scanned for the server download link
    #[arg(long, value_name = "URL", default_value = BEDROCK_SERVER_PAGE)]
    pub download_page: String,

    /// Start of the download link as it appears on the page
    #[arg(long, value_name = "PREFIX", default_value = BEDROCK_LINUX_LINK_PREFIX)]
    pub link_prefix: String,
}

/// An idiomatic way to throw an error
pub trait ElseErr {
    fn else_err<E>(self, err: E) -> std::result::Result<(), E>;
}

/// False values will return an error
impl ElseErr for bool {
    fn else_err<E>(self, err: E) -> std::result::Result<(), E> {
        match self {
            true => Ok(()),
            false => Err(err),
        }
    }
}

pub fn log_usage() {
    error!(
        "Invalid arguments: {} <server_install_dir> <backup_dir>",
        env!("CARGO_PKG_NAME")
    );
    error!("\t<server_install_dir> -> directory where the current bedrock server is installed");
    error!("\t<backup_dir> -> directory where the backups should be copied to");
}

fn is_existing_dir(path: &Path, label: &str) -> bool {
    let valid = path.is_dir();
    if !valid {
        error!("{label} does not exist or is not a directory: {path:?}");
    }
    valid
}

/// Checks that both directories exist before anything is downloaded or copied.
///
/// Every bad path is logged, not just the first one.
pub fn validate_dirs<T, U>(server_install_dir: T, backup_dir: U) -> Result<()>
where
    T: AsRef<Path>,
    U: AsRef<Path>,
{
    let server_ok = is_existing_dir(server_install_dir.as_ref(), "Server install directory");
    let backup_ok = is_existing_dir(backup_dir.as_ref(), "Backup directory");

    (server_ok && backup_ok).else_err(UpdaterError::InvalidArguments)
}
