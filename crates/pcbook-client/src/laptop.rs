//! Typed wrappers for the laptop RPCs.

use std::time::Duration;

use tonic::Request;
use tonic::codegen::InterceptedService;
use tonic::transport::Channel;
use tracing::{debug, info};

use pcbook_proto::v1::laptop_service_client::LaptopServiceClient;
use pcbook_proto::v1::upload_image_request::Data;
use pcbook_proto::v1::{
    CreateLaptopRequest, Filter, ImageInfo, Laptop, RateLaptopRequest, RateLaptopResponse,
    SearchLaptopRequest, UploadImageRequest, UploadImageResponse,
};

use crate::auth::BearerAuth;
use crate::error::ClientError;

/// Bytes per upload chunk.
const DEFAULT_CHUNK_SIZE: usize = 1024;

#[derive(Clone)]
pub struct LaptopClient {
    client: LaptopServiceClient<InterceptedService<Channel, BearerAuth>>,
    request_timeout: Duration,
    chunk_size: usize,
}

impl LaptopClient {
    pub fn new(channel: Channel, auth: BearerAuth) -> Self {
        Self {
            client: LaptopServiceClient::with_interceptor(channel, auth),
            request_timeout: Duration::from_secs(5),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn request<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        request.set_timeout(self.request_timeout);
        request
    }

    /// Create `laptop` and return the id the server stored it under.
    pub async fn create_laptop(&self, laptop: Laptop) -> Result<String, ClientError> {
        let request = self.request(CreateLaptopRequest {
            laptop: Some(laptop),
        });
        let id = self.client.clone().create_laptop(request).await?.into_inner().id;
        info!(%id, "Created laptop");
        Ok(id)
    }

    /// Every laptop matching `filter`.
    pub async fn search_laptops(&self, filter: Filter) -> Result<Vec<Laptop>, ClientError> {
        let request = self.request(SearchLaptopRequest {
            filter: Some(filter),
        });
        let mut stream = self.client.clone().search_laptop(request).await?.into_inner();

        let mut laptops = Vec::new();
        while let Some(found) = stream.message().await? {
            let laptop = found.laptop.ok_or(ClientError::EmptyResponse("laptop"))?;
            debug!(id = %laptop.id, "Found laptop");
            laptops.push(laptop);
        }
        Ok(laptops)
    }

    /// Upload `data` as an image of `laptop_id`, in fixed-size chunks.
    pub async fn upload_image(
        &self,
        laptop_id: &str,
        image_type: &str,
        data: &[u8],
    ) -> Result<UploadImageResponse, ClientError> {
        let info = UploadImageRequest {
            data: Some(Data::Info(ImageInfo {
                laptop_id: laptop_id.to_string(),
                image_type: image_type.to_string(),
            })),
        };
        let messages: Vec<UploadImageRequest> = std::iter::once(info)
            .chain(data.chunks(self.chunk_size).map(|chunk| UploadImageRequest {
                data: Some(Data::ChunkData(chunk.to_vec())),
            }))
            .collect();

        let request = self.request(tokio_stream::iter(messages));
        let reply = self.client.clone().upload_image(request).await?.into_inner();
        info!(id = %reply.id, size = reply.size, "Uploaded image");
        Ok(reply)
    }

    /// Send every `(laptop_id, score)` pair and collect the running averages.
    pub async fn rate_laptops(
        &self,
        scores: &[(String, f64)],
    ) -> Result<Vec<RateLaptopResponse>, ClientError> {
        let outbound: Vec<RateLaptopRequest> = scores
            .iter()
            .map(|(laptop_id, score)| RateLaptopRequest {
                laptop_id: laptop_id.clone(),
                score: *score,
            })
            .collect();

        let request = self.request(tokio_stream::iter(outbound));
        let mut inbound = self.client.clone().rate_laptop(request).await?.into_inner();

        let mut replies = Vec::with_capacity(scores.len());
        while let Some(reply) = inbound.message().await? {
            debug!(laptop_id = %reply.laptop_id, count = reply.rated_count, average = reply.average_score, "Rated");
            replies.push(reply);
        }
        Ok(replies)
    }
}
