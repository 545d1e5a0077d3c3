// Image processing - upload sanitization, width resizing and data-URI rendering
pub mod formats;
mod materialize;
mod resize;
mod sanitize;
mod types;

pub use materialize::{data_uri, image_data_uri};
pub use resize::resize_to_width;
pub use sanitize::{detect_format, sanitize, sanitize_report, sanitize_with_hint};
pub use types::{
    EmbeddedMetadata, FormatHint, ProcessingError, SanitizeFormat, SanitizeReport, Upload,
};
