use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The snapshot file (or its directory) could not be written.
    #[error("cannot write snapshot {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}
