use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Ia32(#[from] ia32::Error),

    #[error("failed to read image {}: {source}", .path.display())]
    Image { path: PathBuf, source: io::Error },

    #[error("unknown VMCS field `{0}`")]
    UnknownField(String),
}
