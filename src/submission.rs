//! Drawing submissions: form validation and the reviewer email.
//!
//! A submission is a normalized drawing plus the student's contact details.
//! This module checks the form against the `[submission]` policy, files the
//! image with an [`ObjectStore`], and hands a [`ReviewEmail`] to a
//! [`MailRelay`]. Transports live behind the two traits; nothing here talks
//! to the network.
//!
//! Every rejection maps to an HTTP status via [`SubmissionError::status_code`]:
//!
//! | Failure | Status |
//! |---|---|
//! | missing or malformed email, missing image | 400 |
//! | image larger than `max_upload_bytes` | 413 |
//! | media type outside `allowed_media_types` | 415 |
//! | store or relay failed | 502 |
//!
//! A relay failure after a successful store is reported as
//! [`SubmissionError::Undelivered`] and names the stored location, so the
//! drawing can be re-sent instead of re-uploaded.

use crate::config::{AppConfig, MailConfig, SubmissionConfig};
use crate::types::{NormalizedImage, OUTPUT_MEDIA_TYPE, SourceImage};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use maud::html;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

const FALLBACK_ATTACHMENT_NAME: &str = "drawing.jpg";
const UNCATEGORIZED: &str = "uncategorized";

/// A collaborator (mail relay, object store) reported a failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct UpstreamError(pub String);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Email address {0:?} is not valid")]
    InvalidEmail(String),
    #[error("Image is required")]
    MissingImage,
    #[error("Unsupported image type: {0}")]
    UnsupportedMediaType(String),
    #[error("Image is too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },
    #[error("Upstream service failed: {0}")]
    Upstream(#[from] UpstreamError),
    /// The image was stored but the review email never went out.
    #[error("Drawing stored at {stored_at} but the review email failed: {source}")]
    Undelivered {
        stored_at: String,
        source: UpstreamError,
    },
}

impl SubmissionError {
    /// HTTP status the upload endpoint answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingEmail | Self::InvalidEmail(_) | Self::MissingImage => 400,
            Self::TooLarge { .. } => 413,
            Self::UnsupportedMediaType(_) => 415,
            Self::Upstream(_) | Self::Undelivered { .. } => 502,
        }
    }
}

/// Raw upload fields, as received.
#[derive(Debug, Clone, Default, Validate)]
pub struct SubmissionForm {
    #[validate(email(message = "Email address is not valid"))]
    pub email: String,
    pub name: String,
    pub category: Option<String>,
    pub video_id: Option<String>,
    pub image: Option<SourceImage>,
}

impl SubmissionForm {
    /// Attach a freshly normalized image as the form's image field.
    pub fn with_normalized(mut self, image: NormalizedImage) -> Self {
        self.image = Some(SourceImage::new(
            image.data,
            image.media_type,
            Some(image.file_name),
        ));
        self
    }
}

/// A form that passed validation.
#[derive(Debug, Clone)]
pub struct Submission {
    pub email: String,
    /// Trimmed; may be empty.
    pub name: String,
    pub category: Option<String>,
    pub video_id: Option<String>,
    pub image: Attachment,
}

impl Submission {
    pub fn validate(
        form: SubmissionForm,
        policy: &SubmissionConfig,
    ) -> Result<Self, SubmissionError> {
        let form = SubmissionForm {
            email: form.email.trim().to_string(),
            ..form
        };
        if form.email.is_empty() {
            return Err(SubmissionError::MissingEmail);
        }
        if form.validate().is_err() || !has_top_level_domain(&form.email) {
            return Err(SubmissionError::InvalidEmail(form.email));
        }
        let email = form.email;

        let image = form.image.ok_or(SubmissionError::MissingImage)?;
        if image.data.is_empty() {
            return Err(SubmissionError::MissingImage);
        }

        let media_type = match image.media_type.trim() {
            "" => OUTPUT_MEDIA_TYPE.to_string(),
            declared => declared.to_ascii_lowercase(),
        };
        if !policy.allowed_media_types.iter().any(|t| *t == media_type) {
            return Err(SubmissionError::UnsupportedMediaType(media_type));
        }

        let size = image.data.len() as u64;
        if size > policy.max_upload_bytes {
            return Err(SubmissionError::TooLarge {
                size,
                limit: policy.max_upload_bytes,
            });
        }

        let file_name = image
            .file_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_ATTACHMENT_NAME)
            .to_string();

        Ok(Self {
            email,
            name: form.name.trim().to_string(),
            category: non_empty(form.category),
            video_id: non_empty(form.video_id),
            image: Attachment {
                file_name,
                content_type: media_type,
                data: image.data,
            },
        })
    }

    /// Object storage key: `submissions/<category>/<file name>`.
    pub fn storage_path(&self) -> String {
        let category = self
            .category
            .as_deref()
            .map(path_segment)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        format!(
            "submissions/{category}/{}",
            path_segment(&self.image.file_name)
        )
    }
}

/// The submitted image.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Attachment as the relay receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedAttachment {
    pub filename: String,
    /// Base64 (standard alphabet, padded).
    pub content: String,
    pub content_type: String,
}

/// Message handed to the [`MailRelay`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub reply_to: String,
    pub attachments: Vec<EncodedAttachment>,
}

impl ReviewEmail {
    pub fn compose(submission: &Submission, mail: &MailConfig) -> Self {
        let to = mail
            .review_inbox()
            .unwrap_or(&submission.email)
            .to_string();
        let subject_name = if submission.name.is_empty() {
            "student"
        } else {
            &submission.name
        };

        Self {
            from: mail.from.clone(),
            to,
            subject: format!("New drawing submission from {subject_name}"),
            html: review_body(submission),
            reply_to: submission.email.clone(),
            attachments: vec![EncodedAttachment {
                filename: submission.image.file_name.clone(),
                content: STANDARD.encode(&submission.image.data),
                content_type: submission.image.content_type.clone(),
            }],
        }
    }
}

fn review_body(submission: &Submission) -> String {
    let name = if submission.name.is_empty() {
        "(no name)"
    } else {
        submission.name.as_str()
    };

    html! {
        div style="font-family: Poppins, Arial, sans-serif; color: #333" {
            h2 { "New DrawAlong Submission" }
            p { strong { "From:" } " " (name) " <" (submission.email) ">" }
            @if let Some(category) = &submission.category {
                p { strong { "Category:" } " " (category) }
            }
            @if let Some(video_id) = &submission.video_id {
                p { strong { "Video:" } " " (video_id) }
            }
            p { "Please review the attached drawing and reply with constructive feedback." }
        }
    }
    .into_string()
}

/// Sends review emails.
#[async_trait]
pub trait MailRelay: Send + Sync {
    /// Returns the relay's message id.
    async fn send(&self, email: &ReviewEmail) -> Result<String, UpstreamError>;
}

/// Durable storage for submitted images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` at `path`, returning its location.
    async fn put(&self, path: &str, data: Bytes, content_type: &str)
    -> Result<String, UpstreamError>;
}

/// Outcome of a successful [`submit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub stored_at: Option<String>,
    pub message_id: String,
}

/// File the image (when a store is configured) and email the reviewer.
pub async fn submit(
    relay: &dyn MailRelay,
    store: Option<&dyn ObjectStore>,
    submission: &Submission,
    config: &AppConfig,
) -> Result<Receipt, SubmissionError> {
    let stored_at = match store {
        Some(store) => {
            let path = submission.storage_path();
            let location = store
                .put(
                    &path,
                    submission.image.data.clone(),
                    &submission.image.content_type,
                )
                .await
                .inspect_err(|e| warn!(path = %path, error = %e, "storing submission failed"))?;
            Some(location)
        }
        None => None,
    };

    let email = ReviewEmail::compose(submission, &config.mail);
    let message_id = match relay.send(&email).await {
        Ok(id) => id,
        Err(source) => {
            warn!(
                to = %email.to,
                stored_at = stored_at.as_deref().unwrap_or("-"),
                error = %source,
                "sending review email failed"
            );
            return Err(match stored_at {
                Some(stored_at) => SubmissionError::Undelivered { stored_at, source },
                None => source.into(),
            });
        }
    };

    info!(
        to = %email.to,
        file = %submission.image.file_name,
        bytes = submission.image.data.len(),
        "submission sent for review"
    );
    Ok(Receipt {
        stored_at,
        message_id,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The domain part must carry a dot: `kid@example` is not deliverable.
fn has_top_level_domain(email: &str) -> bool {
    email
        .rsplit_once('@')
        .and_then(|(_, domain)| domain.rsplit_once('.'))
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

fn path_segment(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}
