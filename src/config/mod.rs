use std::env;

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(default)
}

/// Connection settings for the S3-compatible object store
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Access key (STORAGE_KEY)
    pub key: String,

    /// Secret key (STORAGE_SECRET)
    pub secret: String,

    /// API endpoint (default: "http://127.0.0.1:9000")
    pub endpoint: String,

    /// Region (default: "us-east-1")
    pub region: String,

    /// Bucket receiving uploads (default: "uploads")
    pub bucket: String,

    /// Base URL used to build public file links (defaults to the endpoint)
    pub url: String,

    /// Use path-style addressing, as MinIO expects (default: true)
    pub force_path_style: bool,

    /// Talk plain HTTP to the endpoint (default: false)
    pub disable_ssl: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            secret: String::new(),
            endpoint: "http://127.0.0.1:9000".to_string(),
            region: "us-east-1".to_string(),
            bucket: "uploads".to_string(),
            url: "http://127.0.0.1:9000".to_string(),
            force_path_style: true,
            disable_ssl: false,
        }
    }
}

impl StorageConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();
        let endpoint = env::var("STORAGE_ENDPOINT").unwrap_or(default.endpoint);

        Self {
            key: env::var("STORAGE_KEY").unwrap_or(default.key),
            secret: env::var("STORAGE_SECRET").unwrap_or(default.secret),
            region: env::var("STORAGE_REGION").unwrap_or(default.region),
            bucket: env::var("STORAGE_BUCKET").unwrap_or(default.bucket),
            url: env::var("STORAGE_URL").unwrap_or_else(|_| endpoint.clone()),
            force_path_style: env_flag("STORAGE_FORCE_PATH_STYLE", default.force_path_style),
            disable_ssl: env_flag("STORAGE_DISABLE_SSL", default.disable_ssl),
            endpoint,
        }
    }

    /// Local MinIO with its stock credentials
    pub fn development() -> Self {
        Self {
            key: "minioadmin".to_string(),
            secret: "minioadmin".to_string(),
            disable_ssl: true,
            ..Self::default()
        }
    }

    /// Endpoint with the scheme forced to http when SSL is disabled.
    pub fn endpoint_url(&self) -> String {
        if self.disable_ssl {
            if let Some(rest) = self.endpoint.strip_prefix("https://") {
                return format!("http://{}", rest);
            }
        }
        self.endpoint.clone()
    }
}

/// Chunked upload behaviour
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Part size in bytes (default: 5 MB, the S3 minimum for non-final parts)
    pub part_size: usize,

    /// Parts uploaded in parallel by `upload_file` (default: 4)
    pub concurrency: usize,

    /// Age in seconds after which an unfinished upload is aborted
    /// (default: 0, sweeping disabled)
    pub stale_after_secs: u64,

    /// Seconds between stale upload sweeps (default: 300)
    pub sweep_interval_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            part_size: 5 * 1024 * 1024, // 5 MB
            concurrency: 4,
            stale_after_secs: 0,
            sweep_interval_secs: 300,
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            part_size: env_parse("UPLOAD_PART_SIZE", default.part_size),
            concurrency: env_parse("UPLOAD_CONCURRENCY", default.concurrency).max(1),
            stale_after_secs: env_parse("UPLOAD_STALE_AFTER_SECS", default.stale_after_secs),
            sweep_interval_secs: env_parse(
                "UPLOAD_SWEEP_INTERVAL_SECS",
                default.sweep_interval_secs,
            ),
        }
    }

    pub fn sweeper_enabled(&self) -> bool {
        self.stale_after_secs > 0
    }
}
