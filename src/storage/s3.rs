//! S3-compatible storage backend

use std::path::Path;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::region::Region as AwsRegion;
use tracing::{debug, info};

use super::StorageBackend;
use crate::config::S3DiskConfig;
use crate::error::{FileKeeperError, Result};

/// Remote object-storage backend. Stored paths become object keys, optionally
/// behind a configured key prefix. No local filesystem access; transforms go
/// through the staging area.
#[derive(Debug, Clone)]
pub struct S3StorageBackend {
    client: Client,
    config: S3DiskConfig,
}

impl S3StorageBackend {
    pub async fn new(config: S3DiskConfig) -> Result<Self> {
        if config.bucket_name.is_empty() {
            return Err(FileKeeperError::Configuration(
                "S3 bucket name is required".to_string(),
            ));
        }
        if config.access_key_id.is_empty() {
            return Err(FileKeeperError::Configuration(
                "S3 access key ID is required".to_string(),
            ));
        }
        if config.secret_access_key.is_empty() {
            return Err(FileKeeperError::Configuration(
                "S3 secret access key is required".to_string(),
            ));
        }

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None, // session token
            None, // expiry
            "filekeeper-s3",
        );

        let region = if config.region.is_empty() {
            "us-east-1".to_string()
        } else {
            config.region.clone()
        };

        let mut builder = aws_sdk_s3::config::Builder::new()
            .region(AwsRegion::new(region))
            .credentials_provider(credentials)
            .behavior_version_latest();

        // Custom endpoint for S3-compatible services
        if let Some(endpoint_url) = &config.endpoint_url {
            if !endpoint_url.is_empty() {
                builder = builder.endpoint_url(endpoint_url);
                info!("Using custom S3 endpoint: {}", endpoint_url);
            }
        }

        let client = Client::from_conf(builder.build());
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &S3DiskConfig {
        &self.config
    }

    fn object_key(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        match &self.config.prefix {
            Some(prefix) if !prefix.is_empty() => {
                format!("{}/{}", prefix.trim_end_matches('/'), path)
            }
            _ => path.to_string(),
        }
    }

    fn strip_prefix<'a>(&self, key: &'a str) -> &'a str {
        match &self.config.prefix {
            Some(prefix) if !prefix.is_empty() => key
                .strip_prefix(prefix.trim_end_matches('/'))
                .map(|rest| rest.trim_start_matches('/'))
                .unwrap_or(key),
            _ => key,
        }
    }
}

fn is_missing_object_error(message: &str) -> bool {
    message.contains("NoSuchKey") || message.contains("NotFound") || message.contains("404")
}

#[async_trait]
impl StorageBackend for S3StorageBackend {
    async fn initialize(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket_name)
            .send()
            .await
            .map_err(|e| {
                FileKeeperError::Configuration(format!(
                    "cannot access S3 bucket {}: {}",
                    self.config.bucket_name, e
                ))
            })?;
        info!(bucket = %self.config.bucket_name, "initialized S3 storage backend");
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let key = self.object_key(path);
        match self
            .client
            .head_object()
            .bucket(&self.config.bucket_name)
            .key(&key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let message = e.to_string();
                if is_missing_object_error(&message) {
                    Ok(false)
                } else {
                    Err(FileKeeperError::Backend(format!(
                        "failed to check existence of {}: {}",
                        key, message
                    )))
                }
            }
        }
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let key = self.object_key(path);
        let response = self
            .client
            .get_object()
            .bucket(&self.config.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                let message = e.to_string();
                if is_missing_object_error(&message) {
                    FileKeeperError::NotFound {
                        path: path.to_string(),
                    }
                } else {
                    FileKeeperError::Backend(format!("failed to download {}: {}", key, message))
                }
            })?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| FileKeeperError::Backend(format!("failed to read body of {}: {}", key, e)))?;
        let bytes = body.into_bytes().to_vec();
        debug!(key = %key, bytes = bytes.len(), "downloaded S3 object");
        Ok(bytes)
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let key = self.object_key(path);
        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket_name)
            .key(&key)
            .body(ByteStream::from(data.to_vec()));

        if let Some(content_type) = mime_guess::from_path(path).first_raw() {
            request = request.content_type(content_type);
        }

        request.send().await.map_err(|e| {
            FileKeeperError::Backend(format!("failed to store {}: {}", key, e))
        })?;
        debug!(key = %key, bytes = data.len(), "stored S3 object");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let key = self.object_key(path);
        self.client
            .delete_object()
            .bucket(&self.config.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| FileKeeperError::Backend(format!("failed to delete {}: {}", key, e)))?;
        debug!(key = %key, "deleted S3 object");
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_key = self.object_key(from);
        let to_key = self.object_key(to);
        self.client
            .copy_object()
            .bucket(&self.config.bucket_name)
            .copy_source(format!("{}/{}", self.config.bucket_name, from_key))
            .key(&to_key)
            .send()
            .await
            .map_err(|e| {
                FileKeeperError::Backend(format!(
                    "failed to copy {} to {}: {}",
                    from_key, to_key, e
                ))
            })?;
        self.delete(from).await?;
        debug!(from = %from_key, to = %to_key, "renamed S3 object");
        Ok(())
    }

    async fn delete_directory(&self, path: &str) -> Result<()> {
        let objects = self.list_all(path).await?;
        for object in &objects {
            self.delete(object).await?;
        }
        debug!(prefix = %path, count = objects.len(), "deleted S3 prefix");
        Ok(())
    }

    async fn list_all(&self, prefix: &str) -> Result<Vec<String>> {
        let key_prefix = self.object_key(prefix);
        let mut paths = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.config.bucket_name)
                .prefix(&key_prefix);
            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|e| {
                FileKeeperError::Backend(format!("failed to list {}: {}", key_prefix, e))
            })?;

            if let Some(contents) = response.contents {
                for object in contents {
                    if let Some(key) = object.key {
                        if key.ends_with('/') {
                            continue;
                        }
                        paths.push(self.strip_prefix(&key).to_string());
                    }
                }
            }

            match response.next_continuation_token {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }

        paths.sort();
        Ok(paths)
    }

    fn is_remote(&self) -> bool {
        true
    }

    fn native_url(&self, path: &str) -> Option<String> {
        let key = self.object_key(path);
        match &self.config.endpoint_url {
            Some(endpoint) if !endpoint.is_empty() => Some(format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.config.bucket_name,
                key
            )),
            _ => Some(format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.config.bucket_name, self.config.region, key
            )),
        }
    }

    fn local_root(&self) -> Option<&Path> {
        None
    }

    fn backend_type(&self) -> &'static str {
        "s3"
    }
}
