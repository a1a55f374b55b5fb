//! Disk-space exhaustion under `/tmp`.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::observability::SOURCE;

/// Shared name prefix so cleanup can locate fill files.
pub const FILE_PREFIX: &str = "diskspace-failure-";

/// MiB written when the flag carries no size.
pub const DEFAULT_MEGABYTES: u32 = 100;

const TMP_DIR: &str = "/tmp";
const CHUNK_SIZE: usize = 1024 * 1024;

/// Write `megabytes` MiB of zeros to a uniquely named file under `/tmp`.
/// Writes happen in 1 MiB chunks to keep the allocation flat. Errors are
/// logged and never re-raised.
pub fn inject(megabytes: Option<u32>) {
    let megabytes = megabytes.unwrap_or(DEFAULT_MEGABYTES);
    let filename = format!("{TMP_DIR}/{FILE_PREFIX}{}.tmp", Uuid::new_v4());

    info!(
        source = SOURCE,
        mode = "diskspace",
        action = "inject",
        disk_space_mb = megabytes,
        file = %filename,
    );

    match fs::File::create(&filename) {
        Ok(mut file) => {
            let chunk = vec![0u8; CHUNK_SIZE];
            for _ in 0..megabytes {
                if let Err(e) = file.write_all(&chunk) {
                    error!(
                        source = SOURCE,
                        mode = "diskspace",
                        action = "error",
                        message = %e,
                    );
                    break;
                }
            }
        }
        Err(e) => {
            error!(
                source = SOURCE,
                mode = "diskspace",
                action = "error",
                message = format!("failed to create {filename}: {e}"),
            );
        }
    }
}

/// Remove every `/tmp` entry carrying the fill-file prefix.
pub fn clear() {
    let entries = match fs::read_dir(Path::new(TMP_DIR)) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                source = SOURCE,
                mode = "diskspace",
                action = "error",
                message = %e,
            );
            return;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(FILE_PREFIX) {
            continue;
        }
        if let Err(e) = fs::remove_file(entry.path()) {
            warn!(
                source = SOURCE,
                mode = "diskspace",
                action = "error",
                message = %e,
            );
        } else {
            removed += 1;
        }
    }

    if removed > 0 {
        info!(
            source = SOURCE,
            mode = "diskspace",
            action = "clear",
            files_removed = removed,
        );
    }
}
