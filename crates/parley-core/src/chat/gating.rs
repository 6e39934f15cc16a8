use std::fmt;

use crate::config::model::{LanguageModel, LanguageModelCapability};

use super::attachment::{Attachment, AttachmentKind};

pub const NO_MODEL_MESSAGE: &str = "Please select a model";
pub const UNSUPPORTED_ATTACHMENTS_MESSAGE: &str = "This model does not support images or PDFs. Please remove your attachments or select a different model.";
pub const ATTACHMENTS_DISABLED_MESSAGE: &str =
    "This model does not support attachments. Please select a different model.";

const PDF_TYPES: &[&str] = &["application/pdf"];
const IMAGE_TYPES: &[&str] = &["image/png", "image/jpg", "image/jpeg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitBlocker {
    NoModel,
    UnsupportedAttachments,
}

impl SubmitBlocker {
    pub fn message(self) -> &'static str {
        match self {
            SubmitBlocker::NoModel => NO_MODEL_MESSAGE,
            SubmitBlocker::UnsupportedAttachments => UNSUPPORTED_ATTACHMENTS_MESSAGE,
        }
    }
}

impl fmt::Display for SubmitBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// What the selected model can take, checked against what is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityGate {
    pub model_selected: bool,
    pub supports_images: bool,
    pub supports_pdf: bool,
    pub includes_images: bool,
    pub includes_pdf: bool,
}

impl CapabilityGate {
    pub fn new(model: Option<&LanguageModel>, attachments: &[Attachment]) -> Self {
        let has = |capability| model.is_some_and(|m| m.has_capability(capability));

        Self {
            model_selected: model.is_some(),
            supports_images: has(LanguageModelCapability::Vision),
            supports_pdf: has(LanguageModelCapability::Pdf),
            includes_images: attachments
                .iter()
                .any(|a| a.kind() == AttachmentKind::Image),
            includes_pdf: attachments.iter().any(|a| a.kind() == AttachmentKind::Pdf),
        }
    }

    pub fn submit_blocker(&self) -> Option<SubmitBlocker> {
        if !self.model_selected {
            return Some(SubmitBlocker::NoModel);
        }
        if (self.includes_images && !self.supports_images)
            || (self.includes_pdf && !self.supports_pdf)
        {
            return Some(SubmitBlocker::UnsupportedAttachments);
        }
        None
    }

    pub fn accepted_file_types(&self) -> Vec<&'static str> {
        let mut types = Vec::new();
        if self.supports_pdf {
            types.extend_from_slice(PDF_TYPES);
        }
        if self.supports_images {
            types.extend_from_slice(IMAGE_TYPES);
        }
        types
    }

    pub fn attachments_disabled_reason(&self) -> Option<&'static str> {
        self.accepted_file_types()
            .is_empty()
            .then_some(ATTACHMENTS_DISABLED_MESSAGE)
    }

    pub fn is_unsupported(&self, attachment: &Attachment) -> bool {
        match attachment.kind() {
            AttachmentKind::Image => !self.supports_images,
            AttachmentKind::Pdf => !self.supports_pdf,
            AttachmentKind::Other => false,
        }
    }

    pub fn filter_supported(&self, attachments: &[Attachment]) -> Vec<Attachment> {
        attachments
            .iter()
            .filter(|a| !self.is_unsupported(a))
            .cloned()
            .collect()
    }

    /// Whitespace-only input counts as empty.
    pub fn can_send(&self, input: &str, pending_uploads: usize) -> bool {
        !input.trim().is_empty() && pending_uploads == 0 && self.submit_blocker().is_none()
    }
}
