use super::models::Config;
use thiserror::Error;

const MAX_REDIRECT_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Default method '{0}' is not a valid HTTP method token")]
    InvalidMethod(String),

    #[error("Default content type '{0}' is not a valid MIME type")]
    InvalidContentType(String),

    #[error("Invalid default proxy: {0}")]
    InvalidProxy(String),

    #[error("max_redirects ({actual}) exceeds limit of {limit}")]
    TooManyRedirects { actual: usize, limit: usize },

    #[error("connect_timeout_secs must be positive")]
    InvalidConnectTimeout,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_client(config)?;
    validate_request_defaults(config)?;
    validate_proxy(config)?;
    Ok(())
}

fn validate_client(config: &Config) -> Result<(), ValidationError> {
    if config.client.connect_timeout_secs == 0 {
        return Err(ValidationError::InvalidConnectTimeout);
    }

    if config.client.max_redirects > MAX_REDIRECT_LIMIT {
        return Err(ValidationError::TooManyRedirects {
            actual: config.client.max_redirects,
            limit: MAX_REDIRECT_LIMIT,
        });
    }

    Ok(())
}

fn validate_request_defaults(config: &Config) -> Result<(), ValidationError> {
    let method = &config.request.default_method;
    if reqwest::Method::from_bytes(method.as_bytes()).is_err() {
        return Err(ValidationError::InvalidMethod(method.clone()));
    }

    let content_type = &config.request.default_content_type;
    if content_type.parse::<mime::Mime>().is_err() {
        return Err(ValidationError::InvalidContentType(content_type.clone()));
    }

    Ok(())
}

/// A configured proxy must yield a usable proxy URL
fn validate_proxy(config: &Config) -> Result<(), ValidationError> {
    config
        .proxy
        .proxy_url()
        .map(|_| ())
        .map_err(ValidationError::InvalidProxy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ProxyConfig;

    #[test]
    fn test_valid_config() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_invalid_method() {
        let mut config = Config::default();
        config.request.default_method = "GE T".to_string();

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidMethod(_))));
    }

    #[test]
    fn test_invalid_content_type() {
        let mut config = Config::default();
        config.request.default_content_type = "plain".to_string();

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidContentType(_))));
    }

    #[test]
    fn test_invalid_proxy_port() {
        let mut config = Config::default();
        config.proxy = ProxyConfig::new("proxy.local", "99999");

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidProxy(_))));
    }

    #[test]
    fn test_redirect_limit() {
        let mut config = Config::default();
        config.client.max_redirects = 51;

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::TooManyRedirects { actual: 51, .. })
        ));
    }

    #[test]
    fn test_zero_connect_timeout() {
        let mut config = Config::default();
        config.client.connect_timeout_secs = 0;

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidConnectTimeout)));
    }
}
