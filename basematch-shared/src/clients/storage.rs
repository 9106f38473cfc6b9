use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client as S3Client;

/// Object storage for user-uploaded media.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `body` under `key` and return its public URL.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, String>;
}

/// S3-compatible bucket (MinIO locally, any S3 endpoint in production).
#[derive(Clone)]
pub struct MinioClient {
    client: S3Client,
    bucket: String,
    public_url: String,
}

impl MinioClient {
    pub async fn new(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_url: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "basematch");

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = S3Client::from_conf(config);

        // Already-exists is the common case here.
        if let Err(e) = client.create_bucket().bucket(bucket).send().await {
            tracing::debug!(bucket = %bucket, error = %e, "create_bucket skipped");
        }

        tracing::info!(endpoint = %endpoint, bucket = %bucket, "object storage client initialized");

        Self {
            client,
            bucket: bucket.to_string(),
            public_url: public_url.to_string(),
        }
    }

    pub fn public_url_for(&self, key: &str) -> String {
        public_object_url(&self.public_url, &self.bucket, key)
    }
}

/// `{public_url}/{bucket}/{key}` with a single slash at each join.
pub fn public_object_url(public_url: &str, bucket: &str, key: &str) -> String {
    format!(
        "{}/{}/{}",
        public_url.trim_end_matches('/'),
        bucket,
        key.trim_start_matches('/')
    )
}

#[async_trait]
impl ObjectStorage for MinioClient {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| format!("upload failed: {e}"))?;

        Ok(self.public_url_for(key))
    }
}
