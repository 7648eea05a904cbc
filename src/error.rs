use thiserror::Error;

pub type QuoteResult<T> = Result<T, QuoteError>;

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("Quotation is not ready to generate: {0}")]
    Validation(#[from] ValidationError),
    #[error("A quotation is already being generated")]
    Busy,
    #[error("At least one item must stay selected")]
    LastItem,
    #[error("No item with id {0}")]
    UnknownItem(String),
    #[error("Failed to create PDF: {0}")]
    Pdf(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons the generate trigger stays disabled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("client name is required")]
    MissingClientName,
    #[error("client mobile number is required")]
    MissingClientMobile,
    #[error("item {index} has no name")]
    UnnamedItem { index: usize },
}

/// Why a brand image could not be turned into a watermark.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("no watermark source configured")]
    NotConfigured,
    #[error("{path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to fetch URL: {0}")]
    Fetch(String),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("watermark settings rejected: {0}")]
    Settings(String),
    #[error("asset loader stopped: {0}")]
    Interrupted(String),
}
