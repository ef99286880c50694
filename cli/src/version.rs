use crate::api::function::Function;
use crate::api::operation::Operation;
use crate::api::version::{CreateFunctionVersionRequest, PackageSource, Resources};
use crate::error::Error;
use crate::functions::FunctionService;
use crate::inputs::Inputs;
use crate::workflow::Workflow;
use std::collections::BTreeMap;
use std::time::Duration;

const BYTES_IN_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Numeric and map settings of the new version, parsed from the string inputs
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settings {
    /// Bytes
    pub memory: Option<u64>,
    pub execution_timeout: Option<Duration>,
    pub environment: BTreeMap<String, String>,
}

impl Settings {
    /// Parse everything up front so a typo fails the run before any upload
    pub fn parse(inputs: &Inputs) -> eyre::Result<Self> {
        let memory = parse_memory(&inputs.memory)?;
        log::info!("Parsed memory: \"{}\"", display(memory));

        let execution_timeout = parse_timeout(&inputs.execution_timeout)?;
        log::info!(
            "Parsed timeout: \"{}\"",
            display(execution_timeout.map(|t| t.as_secs_f64()))
        );

        let environment = parse_environment(&inputs.environment)?;
        log::info!(
            "Environment variables: \"{}\"",
            describe_environment(&environment)
        );

        Ok(Settings {
            memory,
            execution_timeout,
            environment,
        })
    }
}

fn display<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "default".into())
}

fn number(name: &str, value: &str) -> eyre::Result<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .ok_or_else(|| {
            Error::new(
                &format!("Invalid \"{name}\" input: \"{value}\""),
                Some("Expected a non-negative number."),
            )
            .into()
        })
}

/// Memory limit in bytes from megabytes, zero and empty leave the service default
pub fn parse_memory(memory: &str) -> eyre::Result<Option<u64>> {
    if memory.is_empty() {
        return Ok(None);
    }

    let megabytes = number("memory", memory)?;

    if megabytes == 0.0 {
        return Ok(None);
    }

    // Sent as an int64 string
    let bytes = (megabytes * BYTES_IN_MEGABYTE).round();

    if bytes >= i64::MAX as f64 {
        return Err(Error::new(
            &format!("Invalid \"memory\" input: \"{memory}\""),
            Some("The memory limit is too large."),
        )
        .into());
    }

    Ok(Some(bytes as u64))
}

/// Execution timeout from seconds, empty leaves the service default
pub fn parse_timeout(timeout: &str) -> eyre::Result<Option<Duration>> {
    if timeout.is_empty() {
        return Ok(None);
    }

    let seconds = number("execution_timeout", timeout)?;

    Duration::try_from_secs_f64(seconds).map(Some).map_err(|_| {
        Error::new(
            &format!("Invalid \"execution_timeout\" input: \"{timeout}\""),
            Some("The execution timeout is too large."),
        )
        .into()
    })
}

/// Variable names only, values may hold secrets
fn describe_environment(environment: &BTreeMap<String, String>) -> String {
    environment.keys().cloned().collect::<Vec<_>>().join(", ")
}

/// Parse `KEY=value,OTHER=value`, only the first "=" of a pair separates the key
pub fn parse_environment(environment: &str) -> eyre::Result<BTreeMap<String, String>> {
    let mut variables = BTreeMap::new();

    for pair in environment.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = pair.split_once('=').filter(|(key, _)| !key.trim().is_empty())
        else {
            return Err(Error::new(
                &format!("Invalid \"environment\" entry: \"{pair}\""),
                Some("Use comma separated KEY=value pairs."),
            )
            .into());
        };

        variables.insert(key.trim().to_string(), value.to_string());
    }

    Ok(variables)
}

/// Create a new version of the function and check the returned operation
pub async fn create_function_version(
    workflow: &dyn Workflow,
    service: &dyn FunctionService,
    function: &Function,
    inputs: &Inputs,
    settings: &Settings,
    source: PackageSource,
) -> eyre::Result<Operation> {
    let _group = workflow.group("Create function version");
    log::info!("Function {}", function.id);

    if let PackageSource::Bucket(reference) = &source {
        log::info!("From bucket: \"{}\"", reference.bucket_name);
    }

    let request = CreateFunctionVersionRequest {
        function_id: function.id.clone(),
        runtime: inputs.runtime.clone(),
        entrypoint: inputs.entrypoint.clone(),
        resources: Resources {
            memory: settings.memory,
        },
        execution_timeout: settings.execution_timeout,
        service_account_id: inputs.service_account.clone(),
        description: inputs.description.clone(),
        environment: settings.environment.clone(),
        source,
    };

    log::debug!("{request:?}");

    let operation = service.create_version(&request).await?;
    log::info!("Operation complete");

    Ok(operation.into_result()?)
}
