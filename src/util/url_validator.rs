use thiserror::Error;
use url::Url;

/// Errors raised while validating the Articles API base URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP is only accepted for loopback hosts.
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    Insecure,
}

/// Validate the base URL of the Articles API.
///
/// HTTPS is required so the bearer token never crosses the network in the
/// clear. Plain HTTP is tolerated for `localhost`, `127.0.0.1` and `[::1]`,
/// which is what local development servers and mock servers use.
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "https" => Ok(url),
        "http" => {
            let is_loopback = matches!(
                url.host_str(),
                Some("localhost") | Some("127.0.0.1") | Some("[::1]")
            );
            if !is_loopback {
                tracing::error!(base_url = %url, "Rejecting non-HTTPS API base URL");
                return Err(UrlValidationError::Insecure);
            }
            tracing::warn!(base_url = %url, "Using non-HTTPS API base URL (localhost only)");
            Ok(url)
        }
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}
