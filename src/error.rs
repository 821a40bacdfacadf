use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoissonError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Solve error: {0}")]
    Solve(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PoissonError>;
