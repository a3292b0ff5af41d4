use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::app::{Result, SkinshelfError};
use crate::images::{ImageClient, ImageConfig, ImageResponse};

/// reqwest-backed image client. Redirects are handed back to the resolver
/// instead of being followed here, so it can count hops itself.
pub struct HttpImageClient {
    client: Client,
}

impl HttpImageClient {
    pub fn new(config: &ImageConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .redirect(Policy::none())
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ImageClient for HttpImageClient {
    async fn get(&self, url: &str) -> Result<ImageResponse> {
        let response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(SkinshelfError::from))
            .boxed();

        Ok(ImageResponse {
            status,
            location,
            body,
        })
    }
}
