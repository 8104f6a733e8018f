use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("history file io error: {0}")]
    Io(#[from] io::Error),
    #[error("history is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config is not valid toml: {0}")]
    Config(#[from] toml::de::Error),
    #[error("HOME is not set")]
    NoHome,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("connection closed")]
    Closed,
}

impl From<tungstenite::Error> for TransportError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::Closed
            }
            other => Self::Send(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Received malformed message: {raw}")]
    Malformed { raw: String },
    #[error("Invalid data for function {function}: {source}")]
    InvalidData {
        function: String,
        #[source]
        source: serde_json::Error,
    },
}
