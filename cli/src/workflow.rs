use crate::error::Error;
use eyre::WrapErr;
use std::io::Write;
use std::path::PathBuf;

/// The CI platform the run reports to
///
/// Groups fold the log, outputs are consumed by later steps, and a failure marks the whole step as failed.
pub trait Workflow: Send + Sync {
    fn start_group(&self, name: &str);

    fn end_group(&self);

    /// Hide a value from every later log line
    fn add_mask(&self, secret: &str);

    /// Whether the platform echoes the commands it receives
    fn echo_commands(&self, enabled: bool);

    fn set_output(&self, name: &str, value: &str) -> eyre::Result<()>;

    fn set_failed(&self, message: &str);
}

impl dyn Workflow + '_ {
    /// Open a log group that is closed when the returned guard goes out of scope
    pub fn group(&self, name: &str) -> Group<'_> {
        self.start_group(name);
        Group { workflow: self }
    }
}

/// Ends its group on drop, on the error path as well
pub struct Group<'a> {
    workflow: &'a dyn Workflow,
}

impl Drop for Group<'_> {
    fn drop(&mut self) {
        self.workflow.end_group();
    }
}

/// GitHub Actions workflow commands
///
/// Commands are written to stdout, outputs go to the file GitHub names in GITHUB_OUTPUT.
pub struct GitHubWorkflow {
    output_file: Option<PathBuf>,
}

impl GitHubWorkflow {
    pub fn new(output_file: Option<PathBuf>) -> Self {
        GitHubWorkflow { output_file }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os("GITHUB_OUTPUT")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        )
    }

    fn issue(&self, command: &str, properties: &[(&str, &str)], message: &str) {
        let line = format_command(command, properties, message);
        let mut stdout = std::io::stdout().lock();

        if let Err(e) = writeln!(stdout, "{line}") {
            log::error!("Error while writing to stdout: {e:?}");
        }
    }
}

impl Workflow for GitHubWorkflow {
    fn start_group(&self, name: &str) {
        self.issue("group", &[], name);
    }

    fn end_group(&self) {
        self.issue("endgroup", &[], "");
    }

    fn add_mask(&self, secret: &str) {
        if !secret.is_empty() {
            self.issue("add-mask", &[], secret);
        }
    }

    fn echo_commands(&self, enabled: bool) {
        self.issue("echo", &[], if enabled { "on" } else { "off" });
    }

    fn set_output(&self, name: &str, value: &str) -> eyre::Result<()> {
        let Some(path) = &self.output_file else {
            // Runners without the file command still understand the deprecated form
            self.issue("set-output", &[("name", name)], value);
            return Ok(());
        };

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .wrap_err(Error::new(
                "Failed to open the outputs file",
                Some("Check GITHUB_OUTPUT points to a writable file."),
            ))?;

        file.write_all(output_entry(name, value).as_bytes())
            .wrap_err(Error::new("Failed to write the step output", None))?;

        Ok(())
    }

    fn set_failed(&self, message: &str) {
        self.issue("error", &[], message);
    }
}

/// A single `::command key=value::message` line
pub fn format_command(command: &str, properties: &[(&str, &str)], message: &str) -> String {
    let properties = properties
        .iter()
        .map(|(key, value)| format!("{key}={}", escape_property(value)))
        .collect::<Vec<_>>()
        .join(",");

    if properties.is_empty() {
        format!("::{command}::{}", escape_data(message))
    } else {
        format!("::{command} {properties}::{}", escape_data(message))
    }
}

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

/// An entry of the outputs file, multiline values use the heredoc form
fn output_entry(name: &str, value: &str) -> String {
    if !value.contains('\n') {
        return format!("{name}={value}\n");
    }

    let delimiter = format!(
        "ghadelimiter_{}",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );

    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}

/// Keeps every workflow call in memory
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingWorkflow {
    pub(crate) events: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingWorkflow {
    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Workflow for RecordingWorkflow {
    fn start_group(&self, name: &str) {
        self.record(format!("group:{name}"));
    }

    fn end_group(&self) {
        self.record("endgroup".into());
    }

    fn add_mask(&self, secret: &str) {
        self.record(format!("mask:{secret}"));
    }

    fn echo_commands(&self, enabled: bool) {
        self.record(format!("echo:{enabled}"));
    }

    fn set_output(&self, name: &str, value: &str) -> eyre::Result<()> {
        self.record(format!("output:{name}={value}"));
        Ok(())
    }

    fn set_failed(&self, message: &str) {
        self.record(format!("failed:{message}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_escapes_message() {
        assert_eq!(
            format_command("error", &[], "50% done\nnext"),
            "::error::50%25 done%0Anext"
        );
    }

    #[test]
    fn command_with_properties() {
        assert_eq!(
            format_command("set-output", &[("name", "a:b,c")], "value"),
            "::set-output name=a%3Ab%2Cc::value"
        );
    }

    #[test]
    fn group_guard_closes_group() {
        let recorder = RecordingWorkflow::default();
        let workflow: &dyn Workflow = &recorder;

        {
            let _group = workflow.group("ZipDirectory");
            workflow.add_mask("secret");
        }

        assert_eq!(
            recorder.events(),
            vec!["group:ZipDirectory", "mask:secret", "endgroup"]
        );
    }

    #[test]
    fn output_is_appended_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");
        std::fs::write(&path, "previous=1\n").unwrap();

        let workflow = GitHubWorkflow::new(Some(path.clone()));
        workflow.set_output("time", "12:00:00").unwrap();

        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "previous=1\ntime=12:00:00\n"
        );
    }

    #[test]
    fn multiline_output_uses_delimiter() {
        let entry = output_entry("notes", "a\nb");
        let delimiter = entry.lines().next().unwrap().trim_start_matches("notes<<");

        assert!(delimiter.starts_with("ghadelimiter_"));
        assert_eq!(entry, format!("notes<<{delimiter}\na\nb\n{delimiter}\n"));
    }
}
