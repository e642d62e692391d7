//! Portal client implementation.

use crate::compress::{self, Attachment};
use crate::control::{BusyGuard, Progress, ProgressFn, SubmitControl};
use crate::error::{ClientError, Result};
use crate::form::RegistrationForm;
use crate::ClientConfig;
use bytes::Bytes;
use futures::StreamExt;
use futures::future::try_join_all;
use osis_validation::{ValidationReport, ValidationRequest, registration::ticket_lookup_rules};
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Accepted registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Submission {
    /// Ticket for status lookups.
    pub ticket: String,
    /// Initial status (`pending` or `needs_review`).
    pub status: String,
    /// Message from the server.
    pub message: String,
}

/// Registration status as shown to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TicketStatus {
    pub ticket: String,
    pub nama_lengkap: String,
    #[serde(default)]
    pub kelas: Option<String>,
    #[serde(default)]
    pub divisi: Vec<String>,
    pub status: String,
    pub status_label: String,
    #[serde(default)]
    pub assigned_division: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Client for the registration portal.
#[derive(Clone)]
pub struct PortalClient {
    inner: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl PortalClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build client: {}", e)))?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Validate, compress and upload a registration.
    ///
    /// `control` is busy for the whole call and released on every exit
    /// path. The call gives up with [`ClientError::Cancelled`] when `cancel`
    /// fires and with [`ClientError::Timeout`] once the configured timeout
    /// elapses.
    pub async fn submit(
        &self,
        form: RegistrationForm,
        control: &dyn SubmitControl,
        progress: ProgressFn,
        cancel: &CancellationToken,
    ) -> Result<Submission> {
        let _busy = BusyGuard::acquire(control);

        let result = self
            .bounded(cancel, self.submit_stages(form, progress))
            .await;

        match &result {
            Ok(submission) => info!(ticket = %submission.ticket, "Registration submitted"),
            Err(e) => warn!(error = %e, "Registration submission failed"),
        }
        result
    }

    /// Look up the status of a ticket.
    pub async fn ticket_status(&self, ticket: &str) -> Result<TicketStatus> {
        let ticket = ticket.trim();
        let report =
            ticket_lookup_rules().validate(&ValidationRequest::new().with("ticket", ticket));
        if !report.is_valid() {
            return Err(ClientError::Validation(report));
        }

        let url = self.config.url(&format!("/api/ticket/{}", ticket));
        let timeout = self.config.timeout;
        let lookup = async {
            let response = self
                .inner
                .get(url)
                .send()
                .await
                .map_err(|e| ClientError::transport(e, timeout))?;
            let envelope: Envelope<TicketStatus> = read_response(response).await?;
            Ok(envelope.data)
        };

        self.bounded(&CancellationToken::new(), lookup).await
    }

    async fn bounded<T>(
        &self,
        cancel: &CancellationToken,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let timeout = self.config.timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            _ = tokio::time::sleep(timeout) => Err(ClientError::Timeout(timeout)),
            result = work => result,
        }
    }

    async fn submit_stages(
        &self,
        form: RegistrationForm,
        progress: ProgressFn,
    ) -> Result<Submission> {
        progress(Progress::Validating);
        form.validate()?;

        let (fields, attachments) = form.into_parts();
        let attachments = self.compress_stage(attachments, &progress).await?;

        let total: u64 = attachments.iter().map(|a| a.len() as u64).sum();
        debug!(
            fields = fields.len(),
            files = attachments.len(),
            bytes = total,
            "Uploading registration"
        );

        let body = self.multipart(fields, attachments, total, &progress)?;
        let timeout = self.config.timeout;
        let response = self
            .inner
            .post(self.config.url("/api/register"))
            .multipart(body)
            .send()
            .await
            .map_err(|e| ClientError::transport(e, timeout))?;

        let submission = read_response(response).await;
        progress(Progress::Finished);
        submission
    }

    async fn compress_stage(
        &self,
        attachments: Vec<Attachment>,
        progress: &ProgressFn,
    ) -> Result<Vec<Attachment>> {
        let config = &self.config.compression;
        if !config.enabled || attachments.is_empty() {
            return Ok(attachments);
        }

        let total = attachments.len();
        let done = AtomicUsize::new(0);
        progress(Progress::Compressing { done: 0, total });

        try_join_all(attachments.into_iter().map(|attachment| {
            let done = &done;
            async move {
                let out = compress::compress(attachment, config).await?;
                let done = done.fetch_add(1, Ordering::SeqCst) + 1;
                progress(Progress::Compressing { done, total });
                Ok::<_, ClientError>(out)
            }
        }))
        .await
    }

    fn multipart(
        &self,
        fields: Vec<(String, String)>,
        attachments: Vec<Attachment>,
        total: u64,
        progress: &ProgressFn,
    ) -> Result<Form> {
        let mut form = Form::new();
        for (name, value) in fields {
            form = form.text(name, value);
        }

        let sent = Arc::new(AtomicU64::new(0));
        for attachment in attachments {
            let length = attachment.len() as u64;
            let sent = Arc::clone(&sent);
            let progress = Arc::clone(progress);

            let chunks = futures::stream::iter(chunked(attachment.data, self.config.chunk_size))
                .map(move |chunk| {
                    let now = sent.fetch_add(chunk.len() as u64, Ordering::SeqCst)
                        + chunk.len() as u64;
                    progress(Progress::Uploading { sent: now, total });
                    Ok::<Bytes, std::io::Error>(chunk)
                });

            let part = Part::stream_with_length(reqwest::Body::wrap_stream(chunks), length)
                .file_name(attachment.file_name)
                .mime_str(&attachment.content_type)
                .map_err(|e| ClientError::InvalidResponse(format!("bad content type: {}", e)))?;
            form = form.part(attachment.field, part);
        }

        Ok(form)
    }
}

fn chunked(data: Bytes, size: usize) -> Vec<Bytes> {
    let size = size.max(1);
    (0..data.len())
        .step_by(size)
        .map(|start| data.slice(start..(start + size).min(data.len())))
        .collect()
}

async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let body = response
        .bytes()
        .await
        .map_err(|e| ClientError::Network(format!("failed to read response: {}", e)))?;

    if status.is_success() {
        return serde_json::from_slice(&body)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()));
    }

    let json: Option<Value> = serde_json::from_slice(&body).ok();
    let message = json
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ClientError::RateLimited {
            message,
            retry_after,
        });
    }

    if status == StatusCode::BAD_REQUEST
        && let Some(json) = json.as_ref()
        && json.get("errors").is_some()
        && let Ok(report) = serde_json::from_value::<ValidationReport>(json.clone())
    {
        return Err(ClientError::Validation(report));
    }

    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}
