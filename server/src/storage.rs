use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::state::PersistentStoreData;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use thiserror::Error;

const STORE_FILE_MAGIC: [u8; 4] = *b"WMSK";
const STORE_FILE_VERSION: u32 = 1;
const STORE_HEADER_LEN: usize = 8;
const STORE_FILE_NAME: &str = "masks.bin";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid store file format")]
    InvalidFormat,
    #[error("unsupported store file version: {0}")]
    UnsupportedVersion(u32),
    #[error("failed to decode store data: {0}")]
    Decode(String),
    #[error("failed to encode store data: {0}")]
    Encode(String),
    #[error("corrupt points for mask {id}: {reason}")]
    CorruptPoints { id: i64, reason: String },
    #[error("s3 error: {0}")]
    S3(String),
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Loads the last saved snapshot. A store that was never written loads empty.
    async fn load(&self) -> Result<PersistentStoreData, StorageError>;
    async fn save(&self, data: &PersistentStoreData) -> Result<(), StorageError>;
    /// Cheap reachability check used by `/health` and at startup.
    async fn ping(&self) -> Result<(), StorageError>;
}

pub struct FileStorage {
    data_dir: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE_NAME)
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load(&self) -> Result<PersistentStoreData, StorageError> {
        let path = self.path();
        match tokio::fs::read(&path).await {
            Ok(payload) => decode_data(&payload),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No store file at {}, starting empty", path.display());
                Ok(PersistentStoreData::default())
            }
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    async fn save(&self, data: &PersistentStoreData) -> Result<(), StorageError> {
        let path = self.path();
        let tmp = path.with_extension("bin.tmp");
        let payload = encode_data(data)?;
        tokio::fs::write(&tmp, payload)
            .await
            .map_err(|source| StorageError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StorageError::Io { path, source })
    }

    async fn ping(&self) -> Result<(), StorageError> {
        let metadata = tokio::fs::metadata(&self.data_dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.data_dir.clone(),
                source,
            })?;
        if metadata.is_dir() {
            Ok(())
        } else {
            Err(StorageError::Unavailable(format!(
                "{} is not a directory",
                self.data_dir.display()
            )))
        }
    }
}

/// Keeps the encoded snapshot in memory. Used by `--storage memory` and the tests.
#[derive(Default)]
pub struct MemoryStorage {
    payload: Mutex<Option<Vec<u8>>>,
    unavailable: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the backing store going away; every call fails until re-enabled.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("memory store disabled".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self) -> Result<PersistentStoreData, StorageError> {
        self.check()?;
        let payload = self
            .payload
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".into()))?
            .clone();
        match payload {
            Some(payload) => decode_data(&payload),
            None => Ok(PersistentStoreData::default()),
        }
    }

    async fn save(&self, data: &PersistentStoreData) -> Result<(), StorageError> {
        self.check()?;
        let payload = encode_data(data)?;
        *self
            .payload
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".into()))? =
            Some(payload);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check()
    }
}

pub fn encode_data(data: &PersistentStoreData) -> Result<Vec<u8>, StorageError> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&STORE_FILE_MAGIC);
    payload.extend_from_slice(&STORE_FILE_VERSION.to_le_bytes());
    let body = bincode::encode_to_vec(data, bincode::config::standard())
        .map_err(|e| StorageError::Encode(e.to_string()))?;
    payload.extend_from_slice(&body);
    Ok(payload)
}

pub fn decode_data(payload: &[u8]) -> Result<PersistentStoreData, StorageError> {
    if !(payload.starts_with(&STORE_FILE_MAGIC) && payload.len() >= STORE_HEADER_LEN) {
        return Err(StorageError::InvalidFormat);
    }

    let version = u32::from_le_bytes(
        payload[4..8]
            .try_into()
            .map_err(|_| StorageError::InvalidFormat)?,
    );
    let body = &payload[STORE_HEADER_LEN..];
    match version {
        1 => bincode::decode_from_slice(body, bincode::config::standard())
            .map(|(data, _)| data)
            .map_err(|e| StorageError::Decode(e.to_string())),
        _ => Err(StorageError::UnsupportedVersion(version)),
    }
}

#[derive(Clone, Debug)]
pub struct S3StorageConfig {
    pub bucket: String,
    pub prefix: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

pub struct S3Storage {
    bucket: String,
    key: String,
    client: Client,
}

impl S3Storage {
    pub async fn new(config: S3StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let (Some(access_key_id), Some(secret_access_key)) =
            (config.access_key_id, config.secret_access_key)
        {
            let creds = Credentials::new(access_key_id, secret_access_key, None, None, "static");
            loader = loader.credentials_provider(creds);
        }
        if let Some(region) = config.region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint_url) = config.endpoint_url.as_ref() {
            builder = builder.endpoint_url(endpoint_url);
        }
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }
        let prefix = config
            .prefix
            .unwrap_or_default()
            .trim_matches('/')
            .to_string();
        Self {
            bucket: config.bucket,
            key: object_key(&prefix),
            client: Client::from_conf(builder.build()),
        }
    }
}

fn object_key(prefix: &str) -> String {
    if prefix.is_empty() {
        STORE_FILE_NAME.to_string()
    } else {
        format!("{prefix}/{STORE_FILE_NAME}")
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn load(&self) -> Result<PersistentStoreData, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await;
        let output = match response {
            Ok(output) => output,
            Err(error) => {
                if let Some(service_error) = error.as_service_error() {
                    if service_error.is_no_such_key() {
                        log::info!(
                            "No store object at s3://{}/{}, starting empty",
                            self.bucket,
                            self.key
                        );
                        return Ok(PersistentStoreData::default());
                    }
                }
                return Err(StorageError::S3(format!(
                    "failed to load s3://{}/{}: {error:?}",
                    self.bucket, self.key
                )));
            }
        };
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|error| StorageError::S3(format!("failed to read s3 response: {error:?}")))?
            .into_bytes();
        decode_data(&bytes)
    }

    async fn save(&self, data: &PersistentStoreData) -> Result<(), StorageError> {
        let body = ByteStream::from(encode_data(data)?);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .body(body)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| {
                StorageError::S3(format!(
                    "failed to save s3://{}/{}: {error:?}",
                    self.bucket, self.key
                ))
            })
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| {
                StorageError::Unavailable(format!("s3 bucket {}: {error:?}", self.bucket))
            })
    }
}
