//! Capabilities the image pass depends on but does not implement.
//!
//! Resizing and uploading are injected through [`MediaServices`], so the
//! pipeline itself carries no storage client and only an optional raster
//! backend (the `raster` feature).

use std::fmt;
use std::sync::Arc;

use crate::error::MediaError;

/// Produces fixed-size thumbnails from encoded image bytes.
pub trait ImageResizer: Send + Sync {
    /// Pixel dimensions of an encoded image, if they can be determined
    /// without a full decode.
    fn dimensions(&self, _data: &[u8]) -> Option<(u32, u32)> {
        None
    }

    /// Resize to exactly `width` x `height` pixels (no aspect-fit) and
    /// return the encoded result.
    fn resize(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, MediaError>;
}

/// Hands an asset to external storage and returns where it ended up.
pub trait AssetUploader: Send + Sync {
    fn upload(&self, data: &[u8], key: &str) -> Result<String, MediaError>;
}

/// The capabilities configured for one ingestor.
#[derive(Clone)]
pub struct MediaServices {
    pub resizer: Option<Arc<dyn ImageResizer>>,
    pub uploader: Option<Arc<dyn AssetUploader>>,
}

impl MediaServices {
    /// No resizer and no uploader. Thumbnail and upload requests then fail
    /// per image.
    pub fn none() -> Self {
        Self {
            resizer: None,
            uploader: None,
        }
    }

    pub fn with_resizer(mut self, resizer: impl ImageResizer + 'static) -> Self {
        self.resizer = Some(Arc::new(resizer));
        self
    }

    pub fn with_uploader(mut self, uploader: impl AssetUploader + 'static) -> Self {
        self.uploader = Some(Arc::new(uploader));
        self
    }
}

/// The built-in resizer when the `raster` feature is enabled, no uploader.
impl Default for MediaServices {
    fn default() -> Self {
        #[cfg(feature = "raster")]
        {
            Self::none().with_resizer(RasterResizer)
        }
        #[cfg(not(feature = "raster"))]
        {
            Self::none()
        }
    }
}

impl fmt::Debug for MediaServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaServices")
            .field("resizer", &self.resizer.is_some())
            .field("uploader", &self.uploader.is_some())
            .finish()
    }
}

/// Resizer backed by the `image` crate. Output is always PNG.
#[cfg(feature = "raster")]
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterResizer;

#[cfg(feature = "raster")]
impl ImageResizer for RasterResizer {
    fn dimensions(&self, data: &[u8]) -> Option<(u32, u32)> {
        image::ImageReader::new(std::io::Cursor::new(data))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }

    fn resize(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, MediaError> {
        let img = image::load_from_memory(data).map_err(|e| MediaError::Decode(e.to_string()))?;
        let thumb = img
            .resize_exact(width, height, image::imageops::FilterType::Triangle)
            .to_rgba8();

        let mut out = std::io::Cursor::new(Vec::new());
        thumb
            .write_to(&mut out, image::ImageFormat::Png)
            .map_err(|e| MediaError::Resize(e.to_string()))?;
        Ok(out.into_inner())
    }
}
