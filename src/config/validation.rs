use crate::config::types::{
    Config, CrawlerConfig, ErrorHandlingConfig, ExtractionConfig, OutputConfig,
    ProcessingConfig, ProxyConfig, UserAgentConfig,
};
use crate::url::Glob;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_extraction_config(&config.extraction)?;
    validate_processing_config(&config.processing)?;
    validate_error_handling_config(&config.error_handling)?;
    validate_proxy_config(&config.proxy)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.start_urls.is_empty() {
        return Err(ConfigError::Validation(
            "start_urls must contain at least one URL".to_string(),
        ));
    }

    for start_url in &config.start_urls {
        let url = Url::parse(start_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", start_url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Start URL '{}' must use HTTP or HTTPS",
                start_url
            )));
        }
    }

    // max_crawl_depth = 0 is valid: start URLs bypass the filter, so only
    // the start pages are visited

    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.max_requests_per_crawl < 1 {
        return Err(ConfigError::Validation(format!(
            "max_requests_per_crawl must be >= 1, got {}",
            config.max_requests_per_crawl
        )));
    }

    if config.include_url_globs.is_empty() {
        return Err(ConfigError::Validation(
            "include_url_globs cannot be empty (use [\"**\"] to match everything)".to_string(),
        ));
    }

    for pattern in config
        .include_url_globs
        .iter()
        .chain(config.exclude_url_globs.iter())
    {
        validate_glob(pattern)?;
    }

    Ok(())
}

/// Validates a URL glob pattern
fn validate_glob(pattern: &str) -> Result<(), ConfigError> {
    Glob::new(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern(e.to_string()))
}

/// Validates extraction thresholds
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.fallback_min_text_length > config.min_text_length {
        return Err(ConfigError::Validation(format!(
            "fallback_min_text_length ({}) must not exceed min_text_length ({})",
            config.fallback_min_text_length, config.min_text_length
        )));
    }

    Ok(())
}

/// Validates chunking parameters
fn validate_processing_config(config: &ProcessingConfig) -> Result<(), ConfigError> {
    if config.chunk_size < 1 {
        return Err(ConfigError::Validation(
            "chunk_size must be >= 1".to_string(),
        ));
    }

    if config.chunk_overlap >= config.chunk_size {
        return Err(ConfigError::Validation(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            config.chunk_overlap, config.chunk_size
        )));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_error_handling_config(config: &ErrorHandlingConfig) -> Result<(), ConfigError> {
    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.backoff_multiplier < 1.0 || !config.backoff_multiplier.is_finite() {
        return Err(ConfigError::Validation(format!(
            "backoff_multiplier must be a finite value >= 1.0, got {}",
            config.backoff_multiplier
        )));
    }

    Ok(())
}

/// Validates proxy URLs
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    for proxy in &config.urls {
        Url::parse(proxy).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid proxy URL '{}': {}", proxy, e))
        })?;
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.dataset_path.is_empty() {
        return Err(ConfigError::Validation(
            "dataset_path cannot be empty".to_string(),
        ));
    }

    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
