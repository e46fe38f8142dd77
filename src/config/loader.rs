//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::ScrubConfig;
use super::secret::secret_string;
use crate::domain::errors::ScrubError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into ScrubConfig
/// 4. Applies environment variable overrides (SCRUB_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
pub fn load_config(path: impl AsRef<Path>) -> Result<ScrubConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ScrubError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ScrubError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    // Perform environment variable substitution
    let contents = substitute_env_vars(&contents)?;

    // Parse TOML
    let mut config: ScrubConfig = toml::from_str(&contents)
        .map_err(|e| ScrubError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    // Apply environment variable overrides
    apply_env_overrides(&mut config);

    // Validate configuration
    config.validate().map_err(|e| {
        ScrubError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid regex literal");
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    // Process line by line to skip comments
    for line in input.lines() {
        let trimmed = line.trim_start();

        // Skip comment lines - don't process env vars in comments
        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(ScrubError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using SCRUB_* prefix
///
/// Environment variables follow the pattern: SCRUB_<SECTION>_<KEY>
/// For example: SCRUB_ENGINE_SALT, SCRUB_AUDIT_LOG_DIR
fn apply_env_overrides(config: &mut ScrubConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("SCRUB_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Engine overrides
    if let Ok(val) = std::env::var("SCRUB_ENGINE_SALT") {
        config.engine.salt = secret_string(val);
    }
    if let Ok(val) = std::env::var("SCRUB_ENGINE_UID_ROOT") {
        config.engine.uid_root = val;
    }

    // Policy store overrides
    if let Ok(val) = std::env::var("SCRUB_POLICY_STORE_PATH") {
        config.policy.store_path = val;
    }

    // Audit overrides
    if let Ok(val) = std::env::var("SCRUB_AUDIT_LOG_DIR") {
        config.audit.log_dir = val;
    }
    if let Ok(val) = std::env::var("SCRUB_AUDIT_SIGNING_ALGORITHM") {
        config.audit.signing.algorithm = val;
    }
    if let Ok(val) = std::env::var("SCRUB_AUDIT_SIGNING_KEY") {
        config.audit.signing.key = secret_string(val);
    }
    if let Ok(val) = std::env::var("SCRUB_AUDIT_ENCRYPTION_ENABLED") {
        config.audit.encryption.enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("SCRUB_AUDIT_ENCRYPTION_KEY") {
        config.audit.encryption.key = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("SCRUB_AUDIT_RETRY_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.audit.retry.max_retries = retries;
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("SCRUB_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("SCRUB_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("SCRUB_TEST_VAR", "test_value");
        let input = "salt = \"${SCRUB_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "salt = \"test_value\"\n");
        std::env::remove_var("SCRUB_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("SCRUB_MISSING_VAR");
        let input = "salt = \"${SCRUB_MISSING_VAR}\"";
        let result = substitute_env_vars(input);
        assert!(result.is_err());
    }

    #[test]
    fn test_substitute_skips_comments() {
        std::env::remove_var("SCRUB_COMMENTED_VAR");
        let input = "# salt = \"${SCRUB_COMMENTED_VAR}\"\nuid_root = \"2.25.\"";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("${SCRUB_COMMENTED_VAR}"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
name = "scrub"
log_level = "info"

[engine]
salt = "site-salt"
uid_root = "2.25."

[policy]
store_path = "policies.json"

[audit]
log_dir = "audit"

[audit.signing]
algorithm = "hmac"
key = "chain-signing-key"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.name, "scrub");
        assert_eq!(config.engine.salt.expose_secret(), "site-salt");
        assert_eq!(config.audit.signing.algorithm, "hmac");
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let toml_content = r#"
[engine]
salt = "site-salt"
uid_root = "no-trailing-dot"

[audit.signing]
key = "chain-signing-key"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        assert!(load_config(temp_file.path()).is_err());
    }
}
