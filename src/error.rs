//! Errors raised while running nmap and reading its output.

use thiserror::Error;

pub type ScanResult<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    /// The scanner executable could not be started (missing, not executable, ...).
    #[error("could not run {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// nmap exited unsuccessfully.
    #[error("nmap exited with {}: {stderr}", exit_label(.code))]
    Exit { code: Option<i32>, stderr: String },

    /// nmap ran but reported an error (unresolvable host, bad option, ...).
    #[error("{0}")]
    Nmap(String),

    /// The XML document nmap produced could not be decoded.
    #[error("unreadable nmap output: {0}")]
    Parse(String),

    #[error("scan interrupted")]
    Interrupted,
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

impl From<quick_xml::DeError> for ScanError {
    fn from(e: quick_xml::DeError) -> Self {
        ScanError::Parse(e.to_string())
    }
}
