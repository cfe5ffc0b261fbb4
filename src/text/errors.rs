use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("content cannot be represented in {encoding}")]
    Unencodable { encoding: &'static str },
}
