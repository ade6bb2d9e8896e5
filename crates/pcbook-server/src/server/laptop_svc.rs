//! LaptopService gRPC implementation.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tonic::{Request, Response, Status, Streaming};
use tracing::{Span, debug, info, instrument, warn};

use pcbook_proto::v1::laptop_service_server::LaptopService;
use pcbook_proto::v1::upload_image_request::Data;
use pcbook_proto::v1::{
    CreateLaptopRequest, CreateLaptopResponse, Filter, Laptop, RateLaptopRequest,
    RateLaptopResponse, SearchLaptopRequest, SearchLaptopResponse, UploadImageRequest,
    UploadImageResponse,
};

use crate::config::{DEFAULT_MAX_IMAGE_BYTES, ScoreRange};
use crate::context::CallContext;
use crate::server::interceptor::caller;
use crate::storage::{
    ImageStore, LaptopStore, RatingStore, StoreError, is_valid_image_type,
};

/// Outbound buffer for search results.
const SEARCH_BUFFER: usize = 16;
/// Outbound buffer for rating replies.
const RATE_BUFFER: usize = 16;

type SearchStream = ReceiverStream<Result<SearchLaptopResponse, Status>>;
type RateStream = ReceiverStream<Result<RateLaptopResponse, Status>>;

pub struct LaptopServiceImpl {
    laptops: Arc<dyn LaptopStore>,
    images: Arc<dyn ImageStore>,
    ratings: Arc<dyn RatingStore>,
    max_image_bytes: usize,
    score_range: ScoreRange,
}

impl LaptopServiceImpl {
    pub fn new(
        laptops: Arc<dyn LaptopStore>,
        images: Arc<dyn ImageStore>,
        ratings: Arc<dyn RatingStore>,
    ) -> Self {
        Self {
            laptops,
            images,
            ratings,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            score_range: ScoreRange::default(),
        }
    }

    /// Upload ceiling in bytes; larger images are refused.
    #[must_use]
    pub const fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    #[must_use]
    pub const fn with_score_range(mut self, score_range: ScoreRange) -> Self {
        self.score_range = score_range;
        self
    }

    /// Store `laptop`, assigning a fresh id when the client sent none.
    pub(crate) async fn create(&self, ctx: &CallContext, laptop: Option<Laptop>) -> Result<String, Status> {
        let mut laptop = laptop.ok_or_else(|| Status::invalid_argument("laptop is required"))?;

        if laptop.id.is_empty() {
            laptop.id = uuid::Uuid::new_v4().to_string();
        } else if uuid::Uuid::parse_str(&laptop.id).is_err() {
            warn!(id = %laptop.id, "Rejected laptop with malformed id");
            return Err(Status::invalid_argument(format!(
                "laptop ID is not a valid UUID: {}",
                laptop.id
            )));
        }

        if let Err(reason) = ctx.check() {
            warn!(id = %laptop.id, %reason, "Laptop not saved");
            return Err(reason.into());
        }

        let store = Arc::clone(&self.laptops);
        let laptop = blocking(move || {
            store.save(&laptop).map_err(|e| match e {
                StoreError::AlreadyExists(id) => {
                    warn!(%id, "Duplicate laptop id");
                    Status::already_exists(format!("laptop {id} already exists"))
                }
                other => store_status(other),
            })?;
            Ok(laptop)
        })
        .await?;

        info!(id = %laptop.id, brand = %laptop.brand, "Laptop saved");
        Ok(laptop.id)
    }

    /// Stream every laptop matching `filter`.
    ///
    /// The scan runs on the blocking pool and stops when the receiver goes
    /// away or the call is cancelled.
    pub(crate) fn search(&self, ctx: CallContext, filter: Filter) -> SearchStream {
        let (tx, rx) = mpsc::channel(SEARCH_BUFFER);
        let store = Arc::clone(&self.laptops);
        let watch = ctx.cancel_on_close(&tx);

        tokio::task::spawn_blocking(move || {
            let _watch = watch;
            let mut sent = 0usize;
            let result = store.search(&ctx, &filter, &mut |laptop| {
                debug!(id = %laptop.id, "Found laptop");
                tx.blocking_send(Ok(SearchLaptopResponse {
                    laptop: Some(laptop),
                }))
                .map_err(|_| StoreError::Sink("search receiver dropped".into()))?;
                sent += 1;
                Ok(())
            });
            match result {
                Ok(()) => debug!(sent, "Search finished"),
                Err(e) => {
                    warn!(error = %e, sent, "Search aborted");
                    let _ = tx.blocking_send(Err(store_status(e)));
                }
            }
        });

        ReceiverStream::new(rx)
    }

    /// Receive an image: one info message, then chunks until end of input.
    pub(crate) async fn upload<S>(&self, ctx: &CallContext, mut stream: S) -> Result<UploadImageResponse, Status>
    where
        S: Stream<Item = Result<UploadImageRequest, Status>> + Unpin,
    {
        let info = match receive(ctx, &mut stream).await? {
            Some(UploadImageRequest {
                data: Some(Data::Info(info)),
            }) => info,
            Some(_) => {
                return Err(Status::invalid_argument(
                    "first upload message must carry image info",
                ));
            }
            None => return Err(Status::invalid_argument("missing image info")),
        };

        if !is_valid_image_type(&info.image_type) {
            warn!(image_type = %info.image_type, "Rejected image type");
            return Err(Status::invalid_argument(format!(
                "invalid image type: {:?}",
                info.image_type
            )));
        }
        require_laptop(&self.laptops, &info.laptop_id).await?;
        debug!(laptop_id = %info.laptop_id, image_type = %info.image_type, "Receiving image");

        let mut data = Vec::new();
        while let Some(message) = receive(ctx, &mut stream).await? {
            match message.data {
                Some(Data::ChunkData(chunk)) => {
                    let size = data.len().saturating_add(chunk.len());
                    if size > self.max_image_bytes {
                        warn!(size, max = self.max_image_bytes, laptop_id = %info.laptop_id, "Image too large");
                        return Err(Status::invalid_argument(format!(
                            "image is too large: {size} > {}",
                            self.max_image_bytes
                        )));
                    }
                    data.extend_from_slice(&chunk);
                }
                Some(Data::Info(_)) => {
                    return Err(Status::invalid_argument("image info sent more than once"));
                }
                None => return Err(Status::invalid_argument("upload message carries no data")),
            }
        }

        let size = u32::try_from(data.len())
            .map_err(|_| Status::invalid_argument("image is too large"))?;
        ctx.check()?;

        let images = Arc::clone(&self.images);
        let laptop_id = info.laptop_id.clone();
        let image_type = info.image_type;
        let id = blocking(move || {
            images
                .save(&laptop_id, &image_type, &data)
                .map_err(store_status)
        })
        .await?;

        info!(%id, laptop_id = %info.laptop_id, size, "Image saved");
        Ok(UploadImageResponse { id, size })
    }

    /// Rate laptops as scores arrive, replying with the running aggregate.
    pub(crate) fn rate<S>(&self, ctx: CallContext, stream: S) -> RateStream
    where
        S: Stream<Item = Result<RateLaptopRequest, Status>> + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(RATE_BUFFER);
        let rater = Rater {
            laptops: Arc::clone(&self.laptops),
            ratings: Arc::clone(&self.ratings),
            score_range: self.score_range,
        };
        let watch = ctx.cancel_on_close(&tx);

        tokio::spawn(async move {
            let _watch = watch;
            match rater.run(&ctx, stream, &tx).await {
                Ok(rated) => debug!(rated, "Rating stream closed"),
                Err(status) => {
                    warn!(code = ?status.code(), message = status.message(), "Rating stream aborted");
                    let _ = tx.send(Err(status)).await;
                }
            }
        });

        ReceiverStream::new(rx)
    }
}

struct Rater {
    laptops: Arc<dyn LaptopStore>,
    ratings: Arc<dyn RatingStore>,
    score_range: ScoreRange,
}

impl Rater {
    async fn run<S>(
        &self,
        ctx: &CallContext,
        mut stream: S,
        tx: &mpsc::Sender<Result<RateLaptopResponse, Status>>,
    ) -> Result<usize, Status>
    where
        S: Stream<Item = Result<RateLaptopRequest, Status>> + Unpin,
    {
        let mut rated = 0;
        while let Some(req) = receive(ctx, &mut stream).await? {
            if !self.score_range.contains(req.score) {
                return Err(Status::invalid_argument(format!(
                    "score {} is outside [{}, {}]",
                    req.score, self.score_range.min, self.score_range.max
                )));
            }
            require_laptop(&self.laptops, &req.laptop_id).await?;

            let ratings = Arc::clone(&self.ratings);
            let laptop_id = req.laptop_id.clone();
            let score = req.score;
            let rating =
                blocking(move || ratings.add(&laptop_id, score).map_err(store_status)).await?;
            debug!(laptop_id = %req.laptop_id, score = req.score, count = rating.count, "Rated");

            let reply = RateLaptopResponse {
                laptop_id: req.laptop_id,
                rated_count: rating.count,
                average_score: rating.average(),
            };
            tx.send(Ok(reply))
                .await
                .map_err(|_| Status::internal("cannot send rating response"))?;
            rated += 1;
        }
        Ok(rated)
    }
}

/// Next inbound message, or `None` once the client closes its side.
async fn receive<S, T>(ctx: &CallContext, stream: &mut S) -> Result<Option<T>, Status>
where
    S: Stream<Item = Result<T, Status>> + Unpin,
{
    ctx.check()?;
    match ctx.run(stream.next()).await? {
        Some(Ok(message)) => Ok(Some(message)),
        Some(Err(status)) => {
            warn!(code = ?status.code(), message = status.message(), "Inbound stream failed");
            Err(status)
        }
        None => Ok(None),
    }
}

/// Run a store call on the blocking pool.
///
/// Store locks are synchronous and a writer can wait out a whole search
/// scan; that wait must never park an async worker.
async fn blocking<T, F>(f: F) -> Result<T, Status>
where
    F: FnOnce() -> Result<T, Status> + Send + 'static,
    T: Send + 'static,
{
    let span = Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(f))
        .await
        .map_err(|e| Status::internal(format!("store task failed: {e}")))?
}

async fn require_laptop(laptops: &Arc<dyn LaptopStore>, laptop_id: &str) -> Result<(), Status> {
    let store = Arc::clone(laptops);
    let id = laptop_id.to_string();
    match blocking(move || store.find(&id).map_err(store_status)).await? {
        Some(_) => Ok(()),
        None => {
            warn!(laptop_id, "Laptop not found");
            Err(Status::not_found(format!("laptop {laptop_id} doesn't exist")))
        }
    }
}

fn store_status(e: StoreError) -> Status {
    match e {
        StoreError::Interrupted(reason) => reason.into(),
        StoreError::AlreadyExists(id) => Status::already_exists(format!("{id} already exists")),
        StoreError::InvalidImageType(t) => Status::invalid_argument(format!("invalid image type: {t:?}")),
        other => Status::internal(other.to_string()),
    }
}

#[tonic::async_trait]
impl LaptopService for LaptopServiceImpl {
    type SearchLaptopStream = SearchStream;
    type RateLaptopStream = RateStream;

    #[instrument(skip(self, request), fields(rpc = "CreateLaptop"))]
    async fn create_laptop(
        &self,
        request: Request<CreateLaptopRequest>,
    ) -> Result<Response<CreateLaptopResponse>, Status> {
        let ctx = CallContext::from_metadata(request.metadata());
        if let Some(claims) = caller(&request) {
            debug!(username = %claims.username, "Create requested");
        }
        let id = self.create(&ctx, request.into_inner().laptop).await?;
        Ok(Response::new(CreateLaptopResponse { id }))
    }

    #[instrument(skip(self, request), fields(rpc = "SearchLaptop"))]
    async fn search_laptop(
        &self,
        request: Request<SearchLaptopRequest>,
    ) -> Result<Response<Self::SearchLaptopStream>, Status> {
        let ctx = CallContext::from_metadata(request.metadata());
        let filter = request.into_inner().filter.unwrap_or_default();
        debug!(?filter, "Search requested");
        Ok(Response::new(self.search(ctx, filter)))
    }

    #[instrument(skip(self, request), fields(rpc = "UploadImage"))]
    async fn upload_image(
        &self,
        request: Request<Streaming<UploadImageRequest>>,
    ) -> Result<Response<UploadImageResponse>, Status> {
        let ctx = CallContext::from_metadata(request.metadata());
        let reply = self.upload(&ctx, request.into_inner()).await?;
        Ok(Response::new(reply))
    }

    #[instrument(skip(self, request), fields(rpc = "RateLaptop"))]
    async fn rate_laptop(
        &self,
        request: Request<Streaming<RateLaptopRequest>>,
    ) -> Result<Response<Self::RateLaptopStream>, Status> {
        let ctx = CallContext::from_metadata(request.metadata());
        if let Some(claims) = caller(&request) {
            debug!(username = %claims.username, role = %claims.role, "Rating stream opened");
        }
        Ok(Response::new(self.rate(ctx, request.into_inner())))
    }
}
