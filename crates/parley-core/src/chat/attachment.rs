use serde::{Deserialize, Serialize};

/// A file uploaded ahead of a message and referenced by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    pub name: String,
    pub content_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Pdf,
    Other,
}

impl AttachmentKind {
    /// Classify by substring so `image/svg+xml` or `application/x-pdf` still match.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.contains("image") {
            AttachmentKind::Image
        } else if content_type.contains("pdf") {
            AttachmentKind::Pdf
        } else {
            AttachmentKind::Other
        }
    }
}

impl Attachment {
    pub fn kind(&self) -> AttachmentKind {
        AttachmentKind::from_content_type(&self.content_type)
    }
}
