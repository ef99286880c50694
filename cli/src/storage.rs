use crate::api::version::{BucketReference, PackageSource};
use crate::config::Endpoints;
use crate::error::Error;
use crate::inputs::Inputs;
use crate::workflow::Workflow;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use eyre::WrapErr;

/// Static keys for the object storage
#[derive(Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl StorageCredentials {
    /// Both keys are required, the error names the missing ones
    pub fn from_inputs(inputs: &Inputs) -> eyre::Result<Self> {
        let missing = [
            ("ACCESS_KEY_ID", &inputs.access_key_id),
            ("SECRET_ACCESS_KEY", &inputs.secret_access_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect::<Vec<_>>();

        if !missing.is_empty() {
            return Err(Error::new(
                &format!("Missing {}", missing.join(" and ")),
                Some("Set both \"accessKeyId\" and \"secretAccessKey\" inputs when using \"bucket\"."),
            )
            .into());
        }

        Ok(StorageCredentials {
            access_key_id: inputs.access_key_id.clone(),
            secret_access_key: inputs.secret_access_key.clone(),
        })
    }
}

/// Key-addressed blob storage the archive is staged in
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        credentials: &StorageCredentials,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> eyre::Result<()>;
}

/// S3-compatible storage at a fixed endpoint, addressed path-style
pub struct S3Store {
    endpoints: Endpoints,
}

impl S3Store {
    pub fn new(endpoints: Endpoints) -> Self {
        S3Store { endpoints }
    }

    async fn client(&self, credentials: &StorageCredentials) -> aws_sdk_s3::Client {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.endpoints.region.clone()))
            .endpoint_url(&self.endpoints.storage)
            .credentials_provider(Credentials::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                None,
                None,
                "function-deploy",
            ))
            .load()
            .await;

        let config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(true)
            .build();

        aws_sdk_s3::Client::from_conf(config)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(
        &self,
        credentials: &StorageCredentials,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> eyre::Result<()> {
        self.client(credentials)
            .await
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .inspect_err(|err| log::error!("{err:?}"))
            .wrap_err(Error::new(
                "Failed to upload file to the bucket",
                Some("Check the bucket exists and the keys are allowed to write to it."),
            ))?;

        Ok(())
    }
}

/// Name of the staged archive, `{functionId}/{commitSha}.zip`
pub fn object_key(function_id: &str, commit_sha: Option<&str>) -> eyre::Result<String> {
    let commit_sha = commit_sha
        .map(str::trim)
        .filter(|sha| !sha.is_empty())
        .ok_or_else(|| {
            Error::new(
                "Missing GITHUB_SHA",
                Some("The commit is needed to name the object in the bucket."),
            )
        })?;

    Ok(format!("{function_id}/{commit_sha}.zip"))
}

/// Decide where the new version reads its code from
///
/// Without a bucket the archive is sent inline, otherwise it is uploaded and referenced.
pub async fn stage_package(
    workflow: &dyn Workflow,
    store: &dyn ObjectStore,
    inputs: &Inputs,
    archive: Vec<u8>,
) -> eyre::Result<PackageSource> {
    if !inputs.has_bucket() {
        return Ok(PackageSource::Inline(archive));
    }

    let credentials = StorageCredentials::from_inputs(inputs)?;
    let object_name = object_key(&inputs.function_id, inputs.commit_sha.as_deref())?;

    let _group = workflow.group("Upload to bucket");
    log::info!("Upload to bucket: \"{}/{object_name}\"", inputs.bucket);

    store
        .put_object(&credentials, &inputs.bucket, &object_name, archive)
        .await?;

    log::info!("Upload complete");

    Ok(PackageSource::Bucket(BucketReference {
        bucket_name: inputs.bucket.clone(),
        object_name,
    }))
}

/// Remembers uploads instead of sending them
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub(crate) objects: std::sync::Mutex<Vec<(String, String, Vec<u8>)>>,
}

#[cfg(test)]
#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        _credentials: &StorageCredentials,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> eyre::Result<()> {
        self.objects
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string(), body));

        Ok(())
    }
}
