use serde::{Deserialize, Serialize};

/// Serialized size at which state moves to an attachment: 480 KiB, which
/// lets two copies fit under a 1 MiB persisted-document ceiling.
pub const DEFAULT_ATTACHMENT_THRESHOLD: usize = 480 * 1024;

/// Attachment name used for redirected module state.
pub const DEFAULT_ATTACHMENT_NAME: &str = "file.json";

/// Storage strategy configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Serialized size in bytes at or above which state is stored as an
    /// attachment.
    pub attachment_threshold: usize,
    /// Name of the attachment that holds redirected state.
    pub attachment_name: String,
    /// Store every save as an attachment regardless of size.
    pub force_attachment: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            attachment_threshold: DEFAULT_ATTACHMENT_THRESHOLD,
            attachment_name: DEFAULT_ATTACHMENT_NAME.to_string(),
            force_attachment: false,
        }
    }
}

impl StorageConfig {
    /// Configuration that redirects every save to an attachment.
    pub fn always_attach() -> Self {
        Self {
            force_attachment: true,
            ..Default::default()
        }
    }
}
