use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Framework(#[from] pagekit::Error),

    #[error(transparent)]
    Cache(#[from] pagekit_cache::CacheError),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no {what} directory could be determined; pass --{flag}")]
    NoDefaultDir {
        what: &'static str,
        flag: &'static str,
    },
}
