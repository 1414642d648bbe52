//! File reads with consistent error handling.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Read file contents, mapping failures to `internal.io_error` with the
/// operation and path attached.
pub fn read_file(path: &Path, operation: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        Error::internal_io(
            format!("{}: {}", path.display(), e),
            Some(operation.to_string()),
        )
    })
}
