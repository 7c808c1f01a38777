//! Where streamed packets come from

use async_trait::async_trait;

use crate::api::{ApiClient, ApiResult, StreamPacket};

/// Produces one classified packet per call
#[async_trait]
pub trait PacketSource: Send + Sync {
    async fn next_packet(&self) -> ApiResult<StreamPacket>;
}

/// Live source backed by `GET /monitor/stream`
#[derive(Debug, Clone)]
pub struct TokenStream {
    client: ApiClient,
    token: Option<String>,
}

impl TokenStream {
    pub fn new(client: ApiClient, token: Option<String>) -> Self {
        Self { client, token }
    }
}

#[async_trait]
impl PacketSource for TokenStream {
    async fn next_packet(&self) -> ApiResult<StreamPacket> {
        self.client.stream_packet(self.token.as_deref()).await
    }
}
