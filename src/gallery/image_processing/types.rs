use image::ImageFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Image format not recognised")]
    UnknownFormat,

    #[error("Failed to decode image: {0}")]
    Decode(image::ImageError),

    #[error("Decoded image has no pixels")]
    EmptyImage,

    #[error("Target size {width}x{height} exceeds the image limits")]
    TooLarge { width: u32, height: u32 },

    #[error("No encoder available for {0:?}")]
    UnsupportedFormat(ImageFormat),

    #[error("Failed to encode image: {0}")]
    Encode(image::ImageError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// An uploaded file as received from a multipart form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Upload {
    pub field_name: String,
    pub content_type: Option<String>,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn hint(&self) -> FormatHint<'_> {
        FormatHint {
            content_type: self.content_type.as_deref(),
            file_name: (!self.file_name.is_empty()).then_some(self.file_name.as_str()),
        }
    }
}

/// What the client claimed about a file. Only consulted when the bytes
/// themselves do not identify a format.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatHint<'a> {
    pub content_type: Option<&'a str>,
    pub file_name: Option<&'a str>,
}

/// Re-encoding strategy for each detected format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Ico,
    Tga,
    Pnm,
    Qoi,
    Farbfeld,
    WebP,
    /// Decodable but not writable here (AVIF, HDR, OpenEXR, DDS, ...).
    Unsupported(ImageFormat),
}

impl From<ImageFormat> for SanitizeFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Png => SanitizeFormat::Png,
            ImageFormat::Jpeg => SanitizeFormat::Jpeg,
            ImageFormat::Gif => SanitizeFormat::Gif,
            ImageFormat::Bmp => SanitizeFormat::Bmp,
            ImageFormat::Tiff => SanitizeFormat::Tiff,
            ImageFormat::Ico => SanitizeFormat::Ico,
            ImageFormat::Tga => SanitizeFormat::Tga,
            ImageFormat::Pnm => SanitizeFormat::Pnm,
            ImageFormat::Qoi => SanitizeFormat::Qoi,
            ImageFormat::Farbfeld => SanitizeFormat::Farbfeld,
            ImageFormat::WebP => SanitizeFormat::WebP,
            other => SanitizeFormat::Unsupported(other),
        }
    }
}

/// Outcome of a successful sanitization pass.
#[derive(Debug, Clone)]
pub struct SanitizeReport {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub encoded_len: usize,
    pub metadata: EmbeddedMetadata,
}

/// Metadata blocks found in the original bytes. These are reported, not
/// validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbeddedMetadata {
    pub icc_profile_len: Option<usize>,
    pub has_exif: bool,
}

impl EmbeddedMetadata {
    pub fn is_present(&self) -> bool {
        self.icc_profile_len.is_some() || self.has_exif
    }
}
