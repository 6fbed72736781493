use std::path::PathBuf;

/// The primary error type for all operations in the `packarc` crate.
#[derive(Debug)]
pub enum ArchiverError {
    /// An I/O error occurred, typically while reading or writing a file.
    /// Includes the path where the error happened, when known.
    Io { source: std::io::Error, path: PathBuf },

    /// The archive or byte stream ended before a record could be fully parsed.
    Truncated(String),

    /// Brotli compression or decompression failed for one entry.
    Decompression(String),

    /// A `Reference` or `Copy` record pointed at a folder/file that is not
    /// present earlier in the archive.
    BrokenReference(String),

    /// A command-line usage error (bad arguments, missing files, etc.).
    Usage(String),

    /// A wrapper for anything else that doesn't fit a specific variant.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ArchiverError {
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ArchiverError::Io { source, path: path.into() }
    }
}

impl std::fmt::Display for ArchiverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiverError::Io { source, path } => {
                if path.as_os_str().is_empty() {
                    write!(f, "I/O error: {}", source)
                } else {
                    write!(f, "I/O error on path '{}': {}", path.display(), source)
                }
            }
            ArchiverError::Truncated(msg) => write!(f, "truncated archive: {}", msg),
            ArchiverError::Decompression(msg) => write!(f, "brotli error: {}", msg),
            ArchiverError::BrokenReference(msg) => write!(f, "broken reference: {}", msg),
            ArchiverError::Usage(msg) => write!(f, "usage error: {}", msg),
            ArchiverError::Other(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ArchiverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArchiverError::Io { source, .. } => Some(source),
            ArchiverError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ArchiverError {
    fn from(err: std::io::Error) -> Self {
        ArchiverError::Io { source: err, path: PathBuf::new() }
    }
}
