use crate::config::StorageConfig;
use crate::services::storage::S3ObjectStore;
use aws_sdk_s3::config::Region;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &StorageConfig) -> Arc<S3ObjectStore> {
    let endpoint_url = config.endpoint_url();
    info!("☁️  S3 Storage: {} (Bucket: {})", endpoint_url, config.bucket);

    let aws_config = aws_config::from_env()
        .endpoint_url(&endpoint_url)
        .region(Region::new(config.region.clone()))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            config.key.clone(),
            config.secret.clone(),
            None,
            None,
            "static",
        ))
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(config.force_path_style)
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    Arc::new(S3ObjectStore::new(
        s3_client,
        config.bucket.clone(),
        config.url.clone(),
        config.force_path_style,
    ))
}
