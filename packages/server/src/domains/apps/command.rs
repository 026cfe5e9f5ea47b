use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info};

use super::{AppNameProvider, ProviderError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs an external command and parses app names from its JSON stdout.
///
/// Accepted output shapes:
/// - `["Safari", "Notes"]`
/// - `[{"_name": "Safari"}, {"name": "Notes"}]`
/// - `{"SPApplicationsDataType": [{"_name": "Safari", ...}]}` (macOS
///   `system_profiler -json`): the first array value of the object is used.
#[derive(Debug, Clone)]
pub struct CommandNameProvider {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandNameProvider {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// `system_profiler SPApplicationsDataType -json`
    pub fn system_profiler() -> Self {
        Self::new("system_profiler", ["SPApplicationsDataType", "-json"])
    }

    /// Split a whitespace-separated command line. `None` when blank.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program, parts))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl AppNameProvider for CommandNameProvider {
    async fn list_app_names(&self) -> Result<Vec<String>, ProviderError> {
        let command = self.command_line();
        debug!(command = %command, "Listing installed apps");

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProviderError::Spawn {
                command: command.clone(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ProviderError::Timeout {
                command: command.clone(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|source| ProviderError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProviderError::Exited {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let names = parse_app_names(&output.stdout)?;
        info!(command = %command, count = names.len(), "Listed installed apps");
        Ok(names)
    }
}

/// Extract names from JSON output, keeping order and dropping blanks and
/// exact duplicates.
pub fn parse_app_names(stdout: &[u8]) -> Result<Vec<String>, ProviderError> {
    let value: Value =
        serde_json::from_slice(stdout).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .into_iter()
            .find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .ok_or_else(|| ProviderError::Parse("object contains no list".to_string()))?,
        other => {
            return Err(ProviderError::Parse(format!(
                "expected a list, got {}",
                json_kind(&other)
            )))
        }
    };

    let mut names: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let name = match &item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj
                .get("_name")
                .or_else(|| obj.get("name"))
                .and_then(Value::as_str),
            _ => None,
        };
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            continue;
        };
        if !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_array() {
        let names = parse_app_names(br#"["Safari", " Notes ", "", "Safari"]"#).unwrap();
        assert_eq!(names, vec!["Safari", "Notes"]);
    }

    #[test]
    fn parses_system_profiler_shape() {
        let stdout = br#"{
            "SPApplicationsDataType": [
                {"_name": "Xcode", "path": "/Applications/Xcode.app"},
                {"_name": "Slack", "version": "4.41"},
                {"path": "/Applications/Unnamed.app"}
            ]
        }"#;
        assert_eq!(parse_app_names(stdout).unwrap(), vec!["Xcode", "Slack"]);
    }

    #[test]
    fn accepts_name_key() {
        let names = parse_app_names(br#"[{"name": "Figma"}, 42]"#).unwrap();
        assert_eq!(names, vec!["Figma"]);
    }

    #[test]
    fn rejects_non_lists() {
        assert!(matches!(
            parse_app_names(b"\"Safari\""),
            Err(ProviderError::Parse(_))
        ));
        assert!(matches!(
            parse_app_names(br#"{"count": 3}"#),
            Err(ProviderError::Parse(_))
        ));
        assert!(matches!(
            parse_app_names(b"not json"),
            Err(ProviderError::Parse(_))
        ));
    }

    #[test]
    fn command_line_round_trip() {
        let provider = CommandNameProvider::from_command_line("  ls  -1 /Applications ").unwrap();
        assert_eq!(provider.command_line(), "ls -1 /Applications");
        assert!(CommandNameProvider::from_command_line("   ").is_none());
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let provider = CommandNameProvider::new("definitely-not-a-real-binary-7f3a", ["--json"]);
        let err = provider.list_app_names().await.unwrap_err();
        assert!(matches!(err, ProviderError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_command_and_parses_stdout() {
        let provider = CommandNameProvider::new("echo", [r#"["Safari","Mail"]"#]);
        let names = provider.list_app_names().await.unwrap();
        assert_eq!(names, vec!["Safari", "Mail"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let provider = CommandNameProvider::new("false", Vec::<String>::new());
        let err = provider.list_app_names().await.unwrap_err();
        assert!(matches!(err, ProviderError::Exited { .. }));
    }
}
