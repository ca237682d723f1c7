//! Frame embedding functions

use async_trait::async_trait;
use camera_capture::VideoFrame;
use tracing::trace;

use crate::PostureError;

/// Maps a frame to a fixed-length feature vector.
///
/// Implementations must be deterministic for a given frame and weights.
#[async_trait]
pub trait EmbeddingFunction: Send + Sync {
    /// Compute the embedding for `frame`
    async fn embed(&self, frame: &VideoFrame) -> Result<Vec<f32>, PostureError>;

    /// Length of every vector `embed` returns
    fn dimension(&self) -> usize;
}

/// Luminance thumbnail embedding.
///
/// Downscales the frame and uses the normalised grey levels as the feature
/// vector. Cheap enough to run on every posture tick without a model file.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailEmbedding {
    width: u32,
    height: u32,
}

impl ThumbnailEmbedding {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }
}

impl Default for ThumbnailEmbedding {
    fn default() -> Self {
        Self::new(16, 12)
    }
}

#[async_trait]
impl EmbeddingFunction for ThumbnailEmbedding {
    async fn embed(&self, frame: &VideoFrame) -> Result<Vec<f32>, PostureError> {
        if frame.is_empty() {
            return Err(PostureError::Inference("frame has no pixels".into()));
        }
        let vector = frame.luminance_thumbnail(self.width, self.height);
        trace!("Embedded frame #{} into {} features", frame.sequence, vector.len());
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        (self.width * self.height) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_thumbnail_is_deterministic() {
        let embedding = ThumbnailEmbedding::new(4, 3);
        let frame = VideoFrame::filled(32, 24, [90, 120, 30]);

        let a = embedding.embed(&frame).await.unwrap();
        let b = embedding.embed(&frame).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), embedding.dimension());
    }

    #[tokio::test]
    async fn test_empty_frame_fails() {
        let embedding = ThumbnailEmbedding::default();
        let frame = VideoFrame::filled(0, 0, [0, 0, 0]);
        assert!(matches!(
            embedding.embed(&frame).await,
            Err(PostureError::Inference(_))
        ));
    }
}
