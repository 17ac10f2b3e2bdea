use std::{fs, path::Path};

use tracing::{debug, info};

use crate::error::{Result, UpdaterError};

/// Files the operator edits, which the new release would otherwise reset to defaults
pub const CONFIG_FILES: [&str; 3] = ["server.properties", "allowlist.json", "permissions.json"];

/// Copies the config files from the backup over the freshly extracted defaults
#[tracing::instrument]
pub fn restore_configs(server_dir: &Path, server_backup_dir: &Path) -> Result<()> {
    info!("Restoring config files ...");

    for file_name in CONFIG_FILES {
        let from = server_backup_dir.join(file_name);
        if !from.is_file() {
            return Err(UpdaterError::MissingConfig(from));
        }

        let to = server_dir.join(file_name);
        debug!("copying {from:?} to {to:?}");
        fs::copy(&from, &to)?;
    }

    info!("All done!");

    Ok(())
}
