use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("required file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("malformed input ({context}): {message}")]
    MalformedInput { context: String, message: String },

    #[error("failed to read or write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("parquet error in {}: {source}", path.display())]
    Parquet {
        path: PathBuf,
        source: parquet::errors::ParquetError,
    },

    #[error("arrow error building {what}: {source}")]
    Arrow {
        what: &'static str,
        source: arrow_schema::ArrowError,
    },

    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl PipelineError {
    pub fn malformed(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::MissingFile { path };
        }
        Self::Io { path, source }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        let path = path.into();
        if let csv::ErrorKind::Io(io) = source.kind()
            && io.kind() == std::io::ErrorKind::NotFound
        {
            return Self::MissingFile { path };
        }
        Self::Csv { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineError;

    #[test]
    fn not_found_io_maps_to_missing_file() {
        let err = PipelineError::io(
            "data/none.csv",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(err, PipelineError::MissingFile { .. }));
        assert!(err.to_string().contains("data/none.csv"));
    }
}
