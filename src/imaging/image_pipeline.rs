use super::image_models::{CapturedFrame, ImageMetadata, UploadRequest, UploadStatus};
use crate::cloud::ChannelError;
use crate::config::EdgeConfig;
use crate::{debug, info, warn};

/// Announces a captured image to the cloud, which then pulls it into object storage.
#[async_trait::async_trait]
pub trait UploadSignal: Send {
    async fn signal_upload(&mut self, request: &UploadRequest) -> Result<(), ChannelError>;
}

/// Capture bookkeeping and the upload queue with bounded retries.
#[derive(Debug)]
pub struct ImagePipeline {
    compression_quality: u8,
    queue: Vec<UploadRequest>,
    completed: Vec<String>,
    failed: Vec<String>,
}

impl ImagePipeline {
    const MAX_RETRY_COUNT: u8 = 3;
    const KEY_TIMESTAMP_FORMAT: &'static str = "%Y%m%d_%H%M%S_%6f";

    pub fn new(compression_quality: u8) -> Self {
        Self { compression_quality, queue: Vec::new(), completed: Vec::new(), failed: Vec::new() }
    }

    pub fn from_config(config: &EdgeConfig) -> Self { Self::new(config.image_compression_quality()) }

    pub fn capture_frame(&self, metadata: ImageMetadata) -> CapturedFrame {
        let frame_id = format!("{:032x}", rand::random::<u128>());
        let image_key = Self::image_key(&metadata);
        info!(
            "Captured frame {frame_id} (key={image_key}, lat={:.7}, lon={:.7})",
            metadata.latitude, metadata.longitude
        );
        CapturedFrame {
            frame_id,
            image_key,
            metadata,
            size_bytes: 0,
            compression_quality: self.compression_quality,
        }
    }

    pub fn queue_upload(&mut self, frame: &CapturedFrame) -> UploadRequest {
        let request = UploadRequest::pending(frame);
        self.queue.push(request.clone());
        info!("Queued upload for frame {} (queue_size={})", frame.frame_id, self.queue.len());
        request
    }

    /// One pass over the queue. Returns the requests that reached a final status in this pass.
    pub async fn process_upload_queue<S: UploadSignal>(&mut self, signal: &mut S) -> Vec<UploadRequest> {
        if self.queue.is_empty() {
            return Vec::new();
        }
        let mut processed = Vec::new();
        for mut request in std::mem::take(&mut self.queue) {
            request.status = UploadStatus::Uploading;
            debug!(
                "Attempting upload for frame {} (key={}, retry={})",
                request.frame_id, request.image_key, request.retry_count
            );
            match signal.signal_upload(&request).await {
                Ok(()) => {
                    request.status = UploadStatus::Uploaded;
                    info!("Upload completed for frame {}", request.frame_id);
                    self.completed.push(request.frame_id.clone());
                    processed.push(request);
                }
                Err(e) if request.retry_count >= Self::MAX_RETRY_COUNT => {
                    request.status = UploadStatus::Failed;
                    warn!(
                        "Upload permanently failed for frame {} after {} retries: {e}",
                        request.frame_id, request.retry_count
                    );
                    self.failed.push(request.frame_id.clone());
                    processed.push(request);
                }
                Err(e) => {
                    request.retry_count += 1;
                    request.status = UploadStatus::Pending;
                    warn!(
                        "Upload failed for frame {}, retry {}/{}: {e}",
                        request.frame_id,
                        request.retry_count,
                        Self::MAX_RETRY_COUNT
                    );
                    self.queue.push(request);
                }
            }
        }
        info!("Processed {} uploads, {} remaining in queue", processed.len(), self.queue.len());
        processed
    }

    pub fn pending_count(&self) -> usize { self.queue.len() }

    pub fn completed_uploads(&self) -> &[String] { &self.completed }

    pub fn failed_uploads(&self) -> &[String] { &self.failed }

    fn image_key(metadata: &ImageMetadata) -> String {
        format!(
            "images/captures/{}/{}/{}.jpg",
            metadata.mission_id,
            metadata.drone_id,
            metadata.capture_time.format(Self::KEY_TIMESTAMP_FORMAT)
        )
    }
}
