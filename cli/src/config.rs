/// Cloud endpoints the deploy step talks to
///
/// Defaults point at the public cloud, every value may be overridden with a FUNCTION_DEPLOY_* variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    /// Token exchange service
    pub iam: String,

    /// Serverless functions API
    pub functions: String,

    /// S3-compatible object storage
    pub storage: String,

    /// Region used for request signing against the object storage
    pub region: String,
}

pub const IAM_ENDPOINT: &str = "https://iam.api.cloud.yandex.net";
pub const FUNCTIONS_ENDPOINT: &str = "https://serverless-functions.api.cloud.yandex.net";
pub const STORAGE_ENDPOINT: &str = "https://storage.yandexcloud.net";
pub const REGION: &str = "ru-central1";

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            iam: IAM_ENDPOINT.into(),
            functions: FUNCTIONS_ENDPOINT.into(),
            storage: STORAGE_ENDPOINT.into(),
            region: REGION.into(),
        }
    }
}

impl Endpoints {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |name: &str, default: &str| {
            lookup(name)
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let endpoints = Endpoints {
            iam: value("FUNCTION_DEPLOY_IAM_ENDPOINT", IAM_ENDPOINT),
            functions: value("FUNCTION_DEPLOY_FUNCTIONS_ENDPOINT", FUNCTIONS_ENDPOINT),
            storage: value("FUNCTION_DEPLOY_STORAGE_ENDPOINT", STORAGE_ENDPOINT),
            region: value("FUNCTION_DEPLOY_REGION", REGION),
        };

        log::debug!("Using endpoints: {endpoints:?}");
        endpoints
    }
}
