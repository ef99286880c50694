use serde::{Deserialize, Deserializer, Serialize};

/// Handle of a long running action on the deployment service
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub done: bool,

    /// Set when the operation failed
    #[serde(default)]
    pub error: Option<OperationError>,
}

impl Operation {
    /// Turn an embedded error into a failure
    pub fn into_result(self) -> Result<Self, OperationError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}

/// Error status as reported by the service, either inside an operation or as a response body
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: StatusCode,

    #[serde(default)]
    pub message: String,

    #[serde(default, deserialize_with = "details")]
    pub details: Vec<String>,
}

/// `{code}: {message}`, followed by the details in parentheses when there are any
impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;

        if !self.details.is_empty() {
            write!(f, " ({})", self.details.join(", "))?;
        }

        Ok(())
    }
}

impl std::error::Error for OperationError {}

/// gRPC status, by name or by its number
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StatusCode {
    Name(String),
    Number(i64),
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::Number(2)
    }
}

const STATUS_NAMES: [&str; 17] = [
    "OK",
    "CANCELLED",
    "UNKNOWN",
    "INVALID_ARGUMENT",
    "DEADLINE_EXCEEDED",
    "NOT_FOUND",
    "ALREADY_EXISTS",
    "PERMISSION_DENIED",
    "RESOURCE_EXHAUSTED",
    "FAILED_PRECONDITION",
    "ABORTED",
    "OUT_OF_RANGE",
    "UNIMPLEMENTED",
    "INTERNAL",
    "UNAVAILABLE",
    "DATA_LOSS",
    "UNAUTHENTICATED",
];

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusCode::Name(name) => write!(f, "{name}"),
            StatusCode::Number(number) => match usize::try_from(*number)
                .ok()
                .and_then(|n| STATUS_NAMES.get(n))
            {
                Some(name) => write!(f, "{name}"),
                None => write!(f, "{number}"),
            },
        }
    }
}

/// Details are plain strings or structured payloads, the latter are kept as JSON
fn details<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;

    Ok(values
        .unwrap_or_default()
        .into_iter()
        .map(|value| match value {
            serde_json::Value::String(detail) => detail,
            other => other.to_string(),
        })
        .collect())
}
