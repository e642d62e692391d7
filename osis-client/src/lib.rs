//! Submission client for the OSIS registration portal
//!
//! A submission runs in stages: the form is checked against the same rule
//! table the server uses, large images are compressed on the blocking pool,
//! and the multipart body is streamed to the server while progress is
//! reported. One [`CancellationToken`] and one timeout bound the whole call.
//!
//! ```no_run
//! use osis_client::{BusyFlag, ClientConfig, PortalClient, RegistrationForm, no_progress};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(photo: Vec<u8>) -> Result<(), osis_client::ClientError> {
//! let client = PortalClient::new(
//!     ClientConfig::builder().base_url("https://osis.example.sch.id").build(),
//! )?;
//!
//! let form = RegistrationForm::new()
//!     .text("nama_lengkap", "Siti Aminah")
//!     .text("divisi", "Seni")
//!     .file("foto", "foto.jpg", photo);
//!
//! let button = BusyFlag::new();
//! match client.submit(form, &button, no_progress(), &CancellationToken::new()).await {
//!     Ok(submission) => println!("Tiket: {}", submission.ticket),
//!     Err(e) => eprintln!("{}", e.user_message()),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod compress;
mod config;
mod control;
mod error;
mod form;

pub use client::{PortalClient, Submission, TicketStatus};
pub use compress::{Attachment, compress_image};
pub use config::{ClientConfig, ClientConfigBuilder, CompressionConfig};
pub use control::{BusyFlag, BusyGuard, Progress, ProgressFn, SubmitControl, no_progress};
pub use error::{ClientError, FALLBACK_MESSAGE, Result, lookup_user_message};
pub use form::RegistrationForm;
pub use tokio_util::sync::CancellationToken;
