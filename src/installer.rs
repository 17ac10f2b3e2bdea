use std::{
    fs::{self, File},
    io::{self, BufReader},
    path::{Component, Path, PathBuf},
};

use chrono::NaiveDateTime;
use fs_extra::dir::CopyOptions;
use tracing::{debug, info, trace};
use zip::ZipArchive;

use crate::error::{Result, UpdaterError};

const BACKUP_PREFIX: &str = "backup_";

const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M";

/// Name of the backup taken at `now`, e.g. `backup_2024-03-07-0915`
pub fn backup_dir_name(now: NaiveDateTime) -> String {
    format!("{BACKUP_PREFIX}{}", now.format(BACKUP_TIMESTAMP_FORMAT))
}

/// Copies `from` into `to`, leaving out the `excluded` canonical paths.
///
/// Directories that merely contain an excluded path are walked into so their
/// other contents still get copied.
fn copy_excluding(
    from: &Path,
    to: &Path,
    excluded: &[PathBuf],
    options: &CopyOptions,
) -> Result<u64> {
    let mut items = Vec::new();
    let mut copied = 0;

    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let path = entry.path();

        if let Ok(canonical) = fs::canonicalize(&path) {
            if excluded.contains(&canonical) {
                debug!("leaving {path:?} out of the backup");
                continue;
            }

            if path.is_dir() && excluded.iter().any(|skip| skip.starts_with(&canonical)) {
                let nested = to.join(entry.file_name());
                fs_extra::dir::create_all(&nested, false)?;
                copied += copy_excluding(&path, &nested, excluded, options)?;
                continue;
            }
        }

        items.push(path);
    }

    copied += fs_extra::copy_items(&items, to, options)?;

    Ok(copied)
}

/// Copies the contents of the install directory into a timestamped directory under `backup_dir`
///
/// The backup directory may live inside the install directory, in which case it is
/// left out of the copy. Running twice within the same minute reuses the directory
/// and overwrites its files.
#[tracing::instrument]
pub fn backup_install(server_dir: &Path, backup_dir: &Path, now: NaiveDateTime) -> Result<PathBuf> {
    let server_backup_dir = backup_dir.join(backup_dir_name(now));
    info!("Copy to backup dir: {server_backup_dir:?}");

    fs_extra::dir::create_all(&server_backup_dir, false)?;
    let excluded = [
        fs::canonicalize(backup_dir)?,
        fs::canonicalize(&server_backup_dir)?,
    ];

    let copied = copy_excluding(
        server_dir,
        &server_backup_dir,
        &excluded,
        &CopyOptions::new().overwrite(true),
    )?;
    debug!("backed up {copied} bytes");

    Ok(server_backup_dir)
}

/// Resolves where a zip entry would land under `dest` without touching the filesystem.
///
/// The result must lie strictly inside `dest`: absolute names, drive prefixes and
/// `..` components climbing out of `dest` are refused.
pub fn resolve_entry_path(dest: &Path, entry_name: &str) -> Result<PathBuf> {
    let outside = || UpdaterError::EntryOutsideTarget(entry_name.to_owned());

    let mut relative = PathBuf::new();
    for component in Path::new(entry_name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return Err(outside());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(outside()),
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(outside());
    }

    Ok(dest.join(relative))
}

/// Refuses an entry whose target a symlink under `dest` would redirect outside of it.
///
/// The deepest part of `out_path` that already exists is canonicalized, so a link
/// anywhere along the way (or a dangling one at the end) is followed before comparing.
fn check_resolved_path(canonical_dest: &Path, out_path: &Path, entry_name: &str) -> Result<()> {
    let resolved = out_path
        .ancestors()
        .find(|path| path.symlink_metadata().is_ok())
        .and_then(|path| fs::canonicalize(path).ok());

    match resolved {
        Some(resolved) if resolved.starts_with(canonical_dest) => Ok(()),
        _ => Err(UpdaterError::EntryOutsideTarget(entry_name.to_owned())),
    }
}

/// Permission bits applied to an extracted file; setuid, setgid and sticky are dropped
#[cfg(unix)]
fn extracted_mode(unix_mode: u32) -> u32 {
    unix_mode & 0o777
}

/// Extracts `archive` over `dest`, overwriting files that already exist.
///
/// Every entry is checked before the first one is written, so an archive with an
/// escaping entry leaves `dest` untouched.
#[tracing::instrument]
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let mut zip = ZipArchive::new(BufReader::new(File::open(archive)?))?;
    let canonical_dest = fs::canonicalize(dest)?;

    let mut targets = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let entry = zip.by_index(index)?;
        let out_path = resolve_entry_path(dest, entry.name())?;
        check_resolved_path(&canonical_dest, &out_path, entry.name())?;
        targets.push(out_path);
    }

    for (index, out_path) in targets.into_iter().enumerate() {
        let mut entry = zip.by_index(index)?;

        if entry.is_dir() {
            trace!("dir {out_path:?}");
            fs::create_dir_all(&out_path)?;
            continue;
        }

        // Windows-created archives may omit directory entries
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }

        debug!("extracting {out_path:?}");
        let mut out_file = File::create(&out_path)?;
        io::copy(&mut entry, &mut out_file)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(extracted_mode(mode)))?;
        }
    }

    Ok(())
}

/// Backs up the install directory, then unpacks the new server over it.
///
/// Returns the backup directory so the config files can be restored from it.
#[tracing::instrument(skip_all)]
pub fn install_new_version(server_dir: &Path, backup_dir: &Path, archive: &Path) -> Result<PathBuf> {
    let now = chrono::Local::now().naive_local();
    let server_backup_dir = backup_install(server_dir, backup_dir, now)?;

    info!("Unzipping to server install dir ...");
    extract_archive(archive, server_dir)?;

    Ok(server_backup_dir)
}
