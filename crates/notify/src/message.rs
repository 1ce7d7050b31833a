//! Message payloads accepted by notification channels.

/// Default file name attached to photo uploads.
pub const DEFAULT_PHOTO_NAME: &str = "img.png";

/// A captioned photo ready to be delivered. Captions are rendered as HTML.
#[derive(Debug, Clone)]
pub struct PhotoMessage {
    /// Caption shown under the photo.
    pub caption: String,
    /// Raw image bytes.
    pub photo: Vec<u8>,
    /// File name presented to the messaging API.
    pub file_name: String,
}

impl PhotoMessage {
    /// Create a photo message with the default attachment name.
    #[must_use]
    pub fn new(caption: impl Into<String>, photo: Vec<u8>) -> Self {
        Self {
            caption: caption.into(),
            photo,
            file_name: DEFAULT_PHOTO_NAME.to_string(),
        }
    }
}
