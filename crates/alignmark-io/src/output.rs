//! Writing a layout to disk without clobbering earlier runs.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use alignmark_core::LayoutDatabase;

use crate::gds::{GdsError, GdsReader, GdsWriter};

/// File extension of every layout this crate writes.
pub const GDS_EXTENSION: &str = "gds";

/// Pick the path a layout named `base_filename` should be written to.
///
/// With `overwrite` the plain `<base>.gds` is always used. Otherwise the first
/// of `<base>.gds`, `<base>_1.gds`, `<base>_2.gds`, … that does not exist yet.
pub fn resolve_output_path(directory: &Path, base_filename: &str, overwrite: bool) -> PathBuf {
    let plain = directory.join(format!("{}.{}", base_filename, GDS_EXTENSION));
    if overwrite || !plain.exists() {
        return plain;
    }
    (1u32..)
        .map(|n| directory.join(format!("{}_{}.{}", base_filename, n, GDS_EXTENSION)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(plain)
}

/// Write `db` as GDS-II into `directory`, creating it if needed.
///
/// Returns the path actually written.
pub fn save_layout(
    db: &LayoutDatabase,
    directory: &Path,
    base_filename: &str,
    overwrite: bool,
) -> Result<PathBuf, GdsError> {
    fs::create_dir_all(directory)?;
    let path = resolve_output_path(directory, base_filename, overwrite);
    write_gds_file(db, &path)?;
    log::info!("Layout saved to {}", path.display());
    Ok(path)
}

/// Write `db` to exactly `path`, replacing any existing file.
pub fn write_gds_file(db: &LayoutDatabase, path: &Path) -> Result<(), GdsError> {
    let file = File::create(path)?;
    GdsWriter::new(BufWriter::new(file)).write(db)
}

/// Load a GDS-II file written by [`save_layout`] (or any tool using the same subset).
pub fn read_gds_file(path: &Path) -> Result<LayoutDatabase, GdsError> {
    let file = File::open(path)?;
    let db = GdsReader::new(BufReader::new(file)).read()?;
    log::debug!("Read {} cells from {}", db.cell_count(), path.display());
    Ok(db)
}
