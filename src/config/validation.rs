use crate::config::types::{
    CommentsConfig, Config, CrawlerConfig, HttpConfig, OutputConfig, PostsConfig, SourceConfig,
};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_source_config(&config.source)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;

    if let Some(posts) = &config.posts {
        validate_posts_config(posts)?;
    }
    if let Some(comments) = &config.comments {
        validate_comments_config(comments)?;
    }

    // Two jobs sharing a store id would overwrite each other's checkpoints
    if let (Some(posts), Some(comments)) = (&config.posts, &config.comments) {
        if posts.progress_store_id == comments.progress_store_id {
            return Err(ConfigError::Validation(format!(
                "posts and comments must use different progress-store-id values, both are '{}'",
                posts.progress_store_id
            )));
        }
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_workers < 1 || config.max_concurrent_workers > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-workers must be between 1 and 64, got {}",
            config.max_concurrent_workers
        )));
    }

    if config.item_timeout == Some(0) {
        return Err(ConfigError::Validation(
            "item-timeout must be > 0 seconds when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates the work item source
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if config.stock_file.is_empty() {
        return Err(ConfigError::Validation(
            "stock-file cannot be empty".to_string(),
        ));
    }

    let regex = Regex::new(&config.pattern)
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", config.pattern, e)))?;

    // captures_len counts the implicit whole-match group
    if regex.captures_len() < 2 {
        return Err(ConfigError::InvalidPattern(format!(
            "'{}' must contain a capture group for the stock code",
            config.pattern
        )));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request-timeout must be > 0 seconds".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.progress_dir.is_empty() {
        return Err(ConfigError::Validation(
            "progress-dir cannot be empty".to_string(),
        ));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_posts_config(config: &PostsConfig) -> Result<(), ConfigError> {
    validate_store_id(&config.progress_store_id)?;
    validate_url_template(
        &config.url_template,
        &[("{code}", "600000"), ("{page}", "1")],
    )?;

    if config.start_page < 1 || config.start_page > config.end_page {
        return Err(ConfigError::Validation(format!(
            "posts page range must satisfy 1 <= start-page <= end-page, got {}..{}",
            config.start_page, config.end_page
        )));
    }

    Ok(())
}

fn validate_comments_config(config: &CommentsConfig) -> Result<(), ConfigError> {
    validate_store_id(&config.progress_store_id)?;
    validate_url_template(
        &config.url_template,
        &[
            ("{code}", "600000"),
            ("{start_date}", "2025-01-01"),
            ("{end_date}", "2025-01-31"),
        ],
    )?;

    if config.start_date > config.end_date {
        return Err(ConfigError::Validation(format!(
            "comments start-date {} is after end-date {}",
            config.start_date, config.end_date
        )));
    }

    Ok(())
}

/// Validates a progress store id
///
/// The id becomes a file name, so it must be non-empty and must not escape
/// the progress directory.
pub(crate) fn validate_store_id(store_id: &str) -> Result<(), ConfigError> {
    if store_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "progress-store-id cannot be empty".to_string(),
        ));
    }

    if store_id.contains(['/', '\\']) || store_id.starts_with('.') {
        return Err(ConfigError::Validation(format!(
            "progress-store-id '{}' must be a plain file stem",
            store_id
        )));
    }

    Ok(())
}

/// Checks that a URL template carries `{code}` and parses once filled in
fn validate_url_template(template: &str, samples: &[(&str, &str)]) -> Result<(), ConfigError> {
    if !template.contains("{code}") {
        return Err(ConfigError::InvalidUrl(format!(
            "url-template '{}' must contain a {{code}} placeholder",
            template
        )));
    }

    let filled = samples
        .iter()
        .fold(template.to_string(), |acc, (key, value)| acc.replace(key, value));

    let url = Url::parse(&filled)
        .map_err(|e| ConfigError::InvalidUrl(format!("url-template '{}': {}", template, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "url-template '{}' must use http or https",
            template
        )));
    }

    Ok(())
}
