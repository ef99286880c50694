use crate::error::Error;
use std::collections::HashMap;

pub const FUNCTION_ID: &str = "function_id";
pub const TOKEN: &str = "token";
pub const ACCESS_KEY_ID: &str = "accessKeyId";
pub const SECRET_ACCESS_KEY: &str = "secretAccessKey";
pub const RUNTIME: &str = "runtime";
pub const ENTRYPOINT: &str = "entrypoint";
pub const MEMORY: &str = "memory";
pub const SOURCE: &str = "source";
pub const EXCLUDE: &str = "exclude";
pub const EXECUTION_TIMEOUT: &str = "execution_timeout";
pub const ENVIRONMENT: &str = "environment";
pub const SERVICE_ACCOUNT: &str = "service_account";
pub const BUCKET: &str = "bucket";
pub const DESCRIPTION: &str = "description";

/// Commit the workflow runs for, provided by the CI environment rather than the step inputs
pub const COMMIT_SHA: &str = "GITHUB_SHA";

/// Anything able to resolve a named step input
pub trait InputSource {
    fn get(&self, name: &str) -> Option<String>;
}

impl InputSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Step inputs for a single run
///
/// Optional inputs default to an empty string, numbers are parsed later on.
#[derive(Clone, Default)]
pub struct Inputs {
    pub function_id: String,
    pub token: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub runtime: String,
    pub entrypoint: String,
    pub memory: String,
    pub source: String,
    pub source_ignore: String,
    pub execution_timeout: String,
    pub environment: String,
    pub service_account: String,
    pub bucket: String,
    pub description: String,
    pub commit_sha: Option<String>,
}

impl Inputs {
    /// Read all inputs, failing on the first missing required one
    pub fn collect(source: &dyn InputSource) -> eyre::Result<Self> {
        let required = |name: &str| -> eyre::Result<String> {
            input(source, name).ok_or_else(|| {
                Error::new(
                    &format!("Input required and not supplied: {name}"),
                    Some("Set the input in the step's \"with\" section."),
                )
                .into()
            })
        };

        let optional = |name: &str| input(source, name).unwrap_or_default();

        let inputs = Inputs {
            function_id: required(FUNCTION_ID)?,
            token: required(TOKEN)?,
            access_key_id: optional(ACCESS_KEY_ID),
            secret_access_key: optional(SECRET_ACCESS_KEY),
            runtime: required(RUNTIME)?,
            entrypoint: required(ENTRYPOINT)?,
            memory: optional(MEMORY),
            source: optional(SOURCE),
            source_ignore: optional(EXCLUDE),
            execution_timeout: optional(EXECUTION_TIMEOUT),
            environment: optional(ENVIRONMENT),
            service_account: optional(SERVICE_ACCOUNT),
            bucket: optional(BUCKET),
            description: optional(DESCRIPTION),
            commit_sha: input(source, COMMIT_SHA),
        };

        log::info!("Function inputs set");
        log::debug!("{inputs:?}");
        Ok(inputs)
    }

    /// Values which must never show up in the logs
    pub fn secrets(&self) -> Vec<&str> {
        [self.token.as_str(), self.secret_access_key.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn has_bucket(&self) -> bool {
        !self.bucket.is_empty()
    }
}

/// Secrets are replaced with a placeholder
impl std::fmt::Debug for Inputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hidden = |value: &str| if value.is_empty() { "" } else { "***" };

        f.debug_struct("Inputs")
            .field("function_id", &self.function_id)
            .field("token", &hidden(&self.token))
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &hidden(&self.secret_access_key))
            .field("runtime", &self.runtime)
            .field("entrypoint", &self.entrypoint)
            .field("memory", &self.memory)
            .field("source", &self.source)
            .field("source_ignore", &self.source_ignore)
            .field("execution_timeout", &self.execution_timeout)
            .field("environment", &self.environment)
            .field("service_account", &self.service_account)
            .field("bucket", &self.bucket)
            .field("description", &self.description)
            .field("commit_sha", &self.commit_sha)
            .finish()
    }
}

/// Trimmed value, blank counts as absent
fn input(source: &dyn InputSource, name: &str) -> Option<String> {
    source
        .get(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
