use crate::inputs::{self, InputSource};
use clap::Parser;

/// Every input is read from its flag first, then from the variable GitHub Actions sets for it
#[derive(Parser, Default)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// ID of the function a new version is created for
    #[arg(long, env = "INPUT_FUNCTION_ID")]
    pub function_id: Option<String>,

    /// OAuth token used to obtain an IAM token
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Static access key ID for the object storage
    #[arg(long, env = "INPUT_ACCESSKEYID")]
    pub access_key_id: Option<String>,

    /// Static secret access key for the object storage
    #[arg(long, env = "INPUT_SECRETACCESSKEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    /// Runtime of the function version, e.g. nodejs18
    #[arg(long, env = "INPUT_RUNTIME")]
    pub runtime: Option<String>,

    /// Handler of the function version, e.g. index.handler
    #[arg(long, env = "INPUT_ENTRYPOINT")]
    pub entrypoint: Option<String>,

    /// Memory limit in megabytes
    #[arg(long, env = "INPUT_MEMORY")]
    pub memory: Option<String>,

    /// Directory to package, the current one by default
    #[arg(long, env = "INPUT_SOURCE")]
    pub source: Option<String>,

    /// Comma separated glob patterns excluded from the archive
    #[arg(long, env = "INPUT_EXCLUDE")]
    pub exclude: Option<String>,

    /// Execution timeout in seconds
    #[arg(long, env = "INPUT_EXECUTION_TIMEOUT")]
    pub execution_timeout: Option<String>,

    /// Comma separated KEY=value pairs
    #[arg(long, env = "INPUT_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Service account the function version runs as
    #[arg(long, env = "INPUT_SERVICE_ACCOUNT")]
    pub service_account: Option<String>,

    /// Stage the archive in this bucket instead of sending it inline
    #[arg(long, env = "INPUT_BUCKET")]
    pub bucket: Option<String>,

    /// Description of the function version
    #[arg(long, env = "INPUT_DESCRIPTION")]
    pub description: Option<String>,

    /// Commit the archive is named after when staged in a bucket
    #[arg(long, env = "GITHUB_SHA")]
    pub commit_sha: Option<String>,
}

impl InputSource for Cli {
    fn get(&self, name: &str) -> Option<String> {
        let value = match name {
            inputs::FUNCTION_ID => &self.function_id,
            inputs::TOKEN => &self.token,
            inputs::ACCESS_KEY_ID => &self.access_key_id,
            inputs::SECRET_ACCESS_KEY => &self.secret_access_key,
            inputs::RUNTIME => &self.runtime,
            inputs::ENTRYPOINT => &self.entrypoint,
            inputs::MEMORY => &self.memory,
            inputs::SOURCE => &self.source,
            inputs::EXCLUDE => &self.exclude,
            inputs::EXECUTION_TIMEOUT => &self.execution_timeout,
            inputs::ENVIRONMENT => &self.environment,
            inputs::SERVICE_ACCOUNT => &self.service_account,
            inputs::BUCKET => &self.bucket,
            inputs::DESCRIPTION => &self.description,
            inputs::COMMIT_SHA => &self.commit_sha,
            _ => return None,
        };

        value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::Inputs;

    #[test]
    fn flags_resolve_inputs() {
        let cli = Cli::try_parse_from([
            "function-deploy",
            "--function-id",
            "fn1",
            "--token",
            "oauth",
            "--runtime",
            "python311",
            "--entrypoint",
            "main.handler",
            "--exclude",
            "tests/**,*.md",
            "--commit-sha",
            "abcdef",
        ])
        .unwrap();

        let inputs = Inputs::collect(&cli).unwrap();

        assert_eq!(inputs.function_id, "fn1");
        assert_eq!(inputs.runtime, "python311");
        assert_eq!(inputs.source_ignore, "tests/**,*.md");
        assert_eq!(inputs.commit_sha.as_deref(), Some("abcdef"));
    }

    #[test]
    fn unknown_input_is_absent() {
        let cli = Cli {
            bucket: Some("builds".into()),
            ..Default::default()
        };

        assert_eq!(cli.get(inputs::BUCKET).as_deref(), Some("builds"));
        assert_eq!(cli.get("not_an_input"), None);
    }
}
