#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// No request could be sent, e.g. the URL scheme has no transport.
    #[error("Transport error: {message}")]
    Transport { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_parse_error_display() {
        let e: Error = url::Url::parse("not a url").unwrap_err().into();
        assert!(format!("{}", e).starts_with("URL parse error:"));
    }

    #[test]
    fn transport_error_display() {
        let e = Error::Transport {
            message: "connection refused".to_string(),
        };
        assert_eq!(format!("{}", e), "Transport error: connection refused");
    }
}
