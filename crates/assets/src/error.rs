/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("HTTP status {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },
    #[error("HDR decode error: {0}")]
    Hdr(String),
    #[error("glTF parse error: {0}")]
    GltfParse(String),
    #[error("glTF buffer {0} has no data")]
    MissingBuffer(usize),
    #[error("unsupported URI: {0}")]
    UnsupportedUri(String),
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image decode error: {0}")]
    Image(String),
    #[error("model contains no triangle primitives")]
    EmptyModel,
}
