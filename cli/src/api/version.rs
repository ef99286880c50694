use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;

/// Object in the storage holding the zipped code
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketReference {
    pub bucket_name: String,
    pub object_name: String,
}

/// Where the new version takes its code from
///
/// Exactly one of the two is sent, as either the "content" or the "package" field.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub enum PackageSource {
    #[serde(rename = "content", serialize_with = "as_base64")]
    Inline(Vec<u8>),

    #[serde(rename = "package")]
    Bucket(BucketReference),
}

impl std::fmt::Debug for PackageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageSource::Inline(content) => write!(f, "Inline({}b)", content.len()),
            PackageSource::Bucket(reference) => f.debug_tuple("Bucket").field(reference).finish(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Resources {
    /// Bytes, the service default applies when not set
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "int64")]
    pub memory: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFunctionVersionRequest {
    pub function_id: String,
    pub runtime: String,
    pub entrypoint: String,
    pub resources: Resources,

    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "duration")]
    pub execution_timeout: Option<Duration>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_account_id: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    pub environment: BTreeMap<String, String>,

    #[serde(flatten)]
    pub source: PackageSource,
}

fn as_base64<S: Serializer>(content: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(content))
}

/// 64-bit integers travel as strings in the JSON mapping
fn int64<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.serialize_str(&value.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Durations are seconds with an "s" suffix, e.g. "3s" or "1.5s"
fn duration<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.serialize_str(&format!("{}s", value.as_secs_f64())),
        None => serializer.serialize_none(),
    }
}
