//! Link source: pulls stream URLs out of a newline-delimited playlist.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("Failed to read playlist {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Extract every line whose trimmed text starts with `http`, in file order.
///
/// Comments (`#EXTINF`, `#EXTM3U`), blank lines and other schemes are skipped.
pub fn parse_links(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with("http"))
        .map(str::to_string)
        .collect()
}

pub fn read_links(path: impl AsRef<Path>) -> Result<Vec<String>, PlaylistError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| PlaylistError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let links = parse_links(&text);
    debug!(path = %path.display(), count = links.len(), "Loaded playlist");
    Ok(links)
}
