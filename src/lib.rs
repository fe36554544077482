//! # Affectiva Emotion as a Service client
//!
//! Rust client for the [Affectiva](https://www.affectiva.com) Emotion as a
//! Service API. Upload media for emotion analysis, query job status, download
//! result representations, and manage annotations -- all with idiomatic async
//! Rust.
//!
//! The job service URL is never hardcoded: at construction the client asks the
//! Affectiva index service where the requested API version lives, then drives
//! every follow-up call off the URLs the service itself returns.
//!
//! ## Quick start
//!
//! ```no_run
//! use affectiva::Client;
//!
//! #[tokio::main]
//! async fn main() -> affectiva::Result<()> {
//!     let client = Client::connect("me@example.com", "s3cret").await?;
//!
//!     // Upload a video for processing
//!     let job = client.create_job("video.mp4").await?;
//!     println!("created {} ({})", job.self_url, job.status);
//!
//!     // Results may not be available immediately
//!     let metrics = client.results(&job.self_url).await?;
//!     println!("{metrics}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Builder pattern
//!
//! Credentials can also come from the `AFFECTIVA_API_USER` and
//! `AFFECTIVA_API_PASSWORD` environment variables:
//!
//! ```no_run
//! use affectiva::ClientBuilder;
//!
//! # async fn example() -> affectiva::Result<()> {
//! let client = ClientBuilder::new()
//!     .version("development")
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod errors;
mod models;

pub use client::{
    Client, ClientBuilder, CSV_CONTENT_TYPE, PASSWORD_ENV_VAR, SESSION_METRICS_CONTENT_TYPE,
    USER_ENV_VAR,
};
pub use errors::{AffectivaError, Result};
pub use models::{
    Annotation, AnnotationSpec, CreateJobOptions, Entry, Representation, DEFAULT_JOB_NAME,
};
