use std::path::PathBuf;

use tracing::subscriber::SetGlobalDefaultError;
use url::ParseError;

use zip::result::ZipError;

pub(crate) type Result<T> = ::std::result::Result<T, UpdaterError>;

#[derive(thiserror::Error, Debug)]
pub enum UpdaterError {
    #[error("invalid arguments")]
    InvalidArguments,
    #[error(transparent)]
    RequestError(#[from] reqwest::Error),
    #[error("no download link found on the page, this probably means the page changed")]
    NoDownloadLink,
    #[error("download link does not end in .zip")]
    NoArchiveExtension,
    #[error(transparent)]
    CannotParseUrl(#[from] ParseError),
    #[error("download link has no file name")]
    NoFileName,
    #[error(transparent)]
    PatternError(#[from] regex::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("setting global default tracing subscriber failed")]
    GlobalSubscriberFailed(#[from] SetGlobalDefaultError),
    #[error("server zip could not be read. did the download link download the correct file?")]
    ServerZipReadFailed(#[from] ZipError),
    #[error("entry is outside of the target dir: {0}")]
    EntryOutsideTarget(String),
    #[error("could not copy server directory to backup")]
    BackupCopyError(#[from] fs_extra::error::Error),
    #[error("config file {0:?} is missing from the backup")]
    MissingConfig(PathBuf),
}
