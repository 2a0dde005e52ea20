use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read BIP39 wordlist at {path}: {source}")]
    WordlistRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("BIP39 wordlist at {path} is empty")]
    WordlistEmpty { path: String },
}
