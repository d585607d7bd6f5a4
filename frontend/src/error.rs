use thiserror::Error;
use wasm_bindgen::JsValue;

/// Failure reported by the element tree or the browser host.
#[derive(Debug, Error)]
pub enum DomError {
    #[error("host call failed: {0}")]
    Host(String),
    #[error("document has no {0}")]
    Missing(&'static str),
}

impl From<JsValue> for DomError {
    fn from(value: JsValue) -> Self {
        let message = value
            .as_string()
            .unwrap_or_else(|| format!("{:?}", value));
        DomError::Host(message)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("submission rejected: {0}")]
    Rejected(String),
    #[error("submission was interrupted")]
    Interrupted,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {field} pattern: {source}")]
    Pattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },
}
