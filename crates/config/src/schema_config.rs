//! External default-value resolution
//!
//! A plugin configuration entry can pre-populate a provider schema property
//! from a literal default, from a file written by an external command, or from
//! a key inside a JSON file. Commands are killed once their timeout elapses.

use openapi_provider_common::{ProviderError, Result};
use serde::Deserialize;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

const DEFAULT_CMD_TIMEOUT_SECONDS: u64 = 10;
const CMD_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Pre-populated value for one provider schema property.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchemaPropertyConfiguration {
    pub schema_property_name: String,
    #[serde(default)]
    pub default_value: Option<String>,
    /// Command argv: first element is the program, the rest its arguments
    #[serde(default)]
    pub cmd: Option<Vec<String>>,
    #[serde(default)]
    pub cmd_timeout: Option<u64>,
    #[serde(default)]
    pub schema_property_external_configuration: Option<ExternalConfiguration>,
}

/// Where and how to read an externally-provided value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExternalConfiguration {
    pub file: String,
    #[serde(default)]
    pub key_name: Option<String>,
    pub content_type: ContentType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Raw,
    Json,
}

impl SchemaPropertyConfiguration {
    /// Resolve the configured value. The command (when present) runs first so
    /// it can produce the external file; the external file wins over the
    /// literal default.
    pub fn resolve(&self) -> Result<Option<String>> {
        if let Some(cmd) = &self.cmd {
            let timeout = self.cmd_timeout.unwrap_or(DEFAULT_CMD_TIMEOUT_SECONDS);
            execute_command(cmd, Duration::from_secs(timeout))?;
        }
        if let Some(external) = &self.schema_property_external_configuration {
            return external.read_value().map(Some);
        }
        Ok(self.default_value.clone())
    }
}

impl ExternalConfiguration {
    fn read_value(&self) -> Result<String> {
        let raw = std::fs::read_to_string(&self.file).map_err(|e| {
            ProviderError::Configuration(format!(
                "could not read external configuration file '{}': {}",
                self.file, e
            ))
        })?;
        match self.content_type {
            ContentType::Raw => Ok(raw.trim_end_matches('\n').to_string()),
            ContentType::Json => self.json_value(&raw),
        }
    }

    fn json_value(&self, raw: &str) -> Result<String> {
        let document: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
            ProviderError::Configuration(format!(
                "external configuration file '{}' is not valid JSON: {}",
                self.file, e
            ))
        })?;
        let key = self.key_name.as_deref().ok_or_else(|| {
            ProviderError::Configuration(format!(
                "external configuration file '{}' has JSON content but no key_name",
                self.file
            ))
        })?;
        let mut current = &document;
        for segment in key.trim_start_matches("$.").split('.') {
            current = current.get(segment).ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "property path '{}' not found in external configuration file '{}'",
                    key, self.file
                ))
            })?;
        }
        match current {
            serde_json::Value::String(s) => Ok(s.clone()),
            other => Ok(other.to_string()),
        }
    }
}

/// Run an argv-style command and wait for it, killing it once the timeout
/// elapses.
fn execute_command(cmd: &[String], timeout: Duration) -> Result<()> {
    let rendered = cmd.join(" ");
    debug!(cmd = %rendered, "running schema configuration command");
    let program = cmd.first().ok_or_else(|| {
        ProviderError::Configuration("schema configuration command is empty".to_string())
    })?;
    let mut child = Command::new(program)
        .args(&cmd[1..])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            ProviderError::Configuration(format!(
                "command '{}' could not be started: {}",
                rendered, e
            ))
        })?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait().map_err(|e| {
            ProviderError::Configuration(format!(
                "command '{}' could not be waited on: {}",
                rendered, e
            ))
        })? {
            Some(status) if status.success() => return Ok(()),
            Some(status) => {
                return Err(ProviderError::Configuration(format!(
                    "command '{}' failed: {}",
                    rendered, status
                )))
            }
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProviderError::Configuration(format!(
                    "command '{}' did not finish executing within the expected time {}s",
                    rendered,
                    timeout.as_secs()
                )));
            }
            None => std::thread::sleep(CMD_POLL_INTERVAL),
        }
    }
}

/// Find the configuration entry for one schema property, if any.
pub fn property_configuration<'a>(
    entries: &'a [SchemaPropertyConfiguration],
    property_name: &str,
) -> Option<&'a SchemaPropertyConfiguration> {
    entries
        .iter()
        .find(|entry| entry.schema_property_name == property_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn entry(name: &str) -> SchemaPropertyConfiguration {
        SchemaPropertyConfiguration {
            schema_property_name: name.to_string(),
            default_value: None,
            cmd: None,
            cmd_timeout: None,
            schema_property_external_configuration: None,
        }
    }

    #[test]
    fn test_literal_default_value() {
        let mut config = entry("apikey_auth");
        config.default_value = Some("apiKeyValue".to_string());
        assert_eq!(config.resolve().unwrap(), Some("apiKeyValue".to_string()));
    }

    #[test]
    fn test_no_configuration_resolves_to_none() {
        assert_eq!(entry("apikey_auth").resolve().unwrap(), None);
    }

    #[test]
    fn test_raw_external_file_wins_over_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"secretFromFile\n").unwrap();

        let mut config = entry("apikey_auth");
        config.default_value = Some("fallback".to_string());
        config.schema_property_external_configuration = Some(ExternalConfiguration {
            file: file.path().to_string_lossy().into_owned(),
            key_name: None,
            content_type: ContentType::Raw,
        });
        assert_eq!(config.resolve().unwrap(), Some("secretFromFile".to_string()));
    }

    #[test]
    fn test_json_external_file_with_key_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"credentials": {"token": "jsonToken"}}"#)
            .unwrap();

        let mut config = entry("apikey_auth");
        config.schema_property_external_configuration = Some(ExternalConfiguration {
            file: file.path().to_string_lossy().into_owned(),
            key_name: Some("$.credentials.token".to_string()),
            content_type: ContentType::Json,
        });
        assert_eq!(config.resolve().unwrap(), Some("jsonToken".to_string()));
    }

    #[test]
    fn test_json_missing_key_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"credentials": {}}"#).unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let mut config = entry("apikey_auth");
        config.schema_property_external_configuration = Some(ExternalConfiguration {
            file: path.clone(),
            key_name: Some("$.credentials.token".to_string()),
            content_type: ContentType::Json,
        });
        let err = config.resolve().unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "property path '$.credentials.token' not found in external configuration file '{}'",
                path
            )
        );
    }

    #[test]
    fn test_command_runs_before_resolution() {
        let mut config = entry("apikey_auth");
        config.cmd = Some(vec!["true".to_string()]);
        config.default_value = Some("afterCmd".to_string());
        assert_eq!(config.resolve().unwrap(), Some("afterCmd".to_string()));
    }

    #[test]
    fn test_command_arguments_may_contain_whitespace() {
        let mut config = entry("apikey_auth");
        config.cmd = Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            "exit 0".to_string(),
        ]);
        config.default_value = Some("afterCmd".to_string());
        assert_eq!(config.resolve().unwrap(), Some("afterCmd".to_string()));
    }

    #[test]
    fn test_command_timeout_message() {
        let mut config = entry("apikey_auth");
        config.cmd = Some(vec!["sleep".to_string(), "5".to_string()]);
        config.cmd_timeout = Some(0);
        let err = config.resolve().unwrap_err();
        assert_eq!(
            err.to_string(),
            "command 'sleep 5' did not finish executing within the expected time 0s"
        );
    }

    #[test]
    fn test_property_configuration_lookup() {
        let entries = vec![entry("first"), entry("second")];
        assert_eq!(
            property_configuration(&entries, "second").map(|e| e.schema_property_name.as_str()),
            Some("second")
        );
        assert!(property_configuration(&entries, "third").is_none());
    }
}
