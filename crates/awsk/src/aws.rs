//! AWS SDK configuration from resolved descriptors.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_dynamodb::config::Credentials as SdkCredentials;
use awsk_core::table::Credentials;
use tracing::debug;

/// Name reported by the static credentials provider.
const PROVIDER_NAME: &str = "awsk";

/// Builds an SDK configuration for one endpoint.
///
/// Credentials are used as given; no credential chain or profile lookup
/// happens here. `endpoint_url` points the clients at a local emulator.
pub async fn sdk_config(
    region: &str,
    credentials: &Credentials,
    endpoint_url: Option<&str>,
) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .credentials_provider(static_credentials(credentials));

    if let Some(endpoint) = endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    debug!(region, endpoint = ?endpoint_url, "Loading AWS configuration");
    loader.load().await
}

fn static_credentials(credentials: &Credentials) -> SdkCredentials {
    SdkCredentials::new(
        credentials.access_key_id.clone(),
        credentials.secret_access_key.clone(),
        credentials.session_token.clone(),
        None,
        PROVIDER_NAME,
    )
}

/// Human readable target of an operation.
pub fn target_display(region: &str, endpoint_url: Option<&str>) -> String {
    match endpoint_url {
        Some(url) => format!("Local endpoint ({url})"),
        None => format!("AWS (region: {region})"),
    }
}
