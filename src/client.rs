use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{AffectivaError, Result};
use crate::models::{
    annotation_from_value, entry_from_value, representation_from_value, Annotation,
    AnnotationSpec, CreateJobOptions, Entry, Representation,
};

/// Well-known discovery endpoint mapping API versions to service base URLs.
const INDEX_SERVICE_URL: &str = "https://index.affectiva.com";
/// Key under a version's index entry that holds the job-service base URL.
const JOB_SERVICE_KEY: &str = "jobs";
const DEFAULT_VERSION: &str = "v1";

/// Environment variable consulted for the username when none is set explicitly.
pub const USER_ENV_VAR: &str = "AFFECTIVA_API_USER";
/// Environment variable consulted for the password when none is set explicitly.
pub const PASSWORD_ENV_VAR: &str = "AFFECTIVA_API_PASSWORD";

/// Content type of the session-metrics representation read by [`Client::results`].
pub const SESSION_METRICS_CONTENT_TYPE: &str = "application/vnd.affectiva.session.v0+json";
/// Content type of the CSV metrics representation, the usual argument to
/// [`Client::download_results`].
pub const CSV_CONTENT_TYPE: &str = "application/csv";

/// Builder for constructing a [`Client`] with custom configuration.
///
/// # Example
///
/// ```no_run
/// use affectiva::ClientBuilder;
///
/// # async fn example() -> affectiva::Result<()> {
/// let client = ClientBuilder::new()
///     .username("me@example.com")
///     .password("s3cret")
///     .version("development")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    username: Option<String>,
    password: Option<String>,
    version: String,
    index_url: String,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            username: None,
            password: None,
            version: DEFAULT_VERSION.to_string(),
            index_url: INDEX_SERVICE_URL.to_string(),
            timeout: None,
        }
    }

    /// Set the authentication username.
    pub fn username(mut self, user: impl Into<String>) -> Self {
        self.username = Some(user.into());
        self
    }

    /// Set the authentication password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Select the job-service version to discover, e.g. `"v1"` or
    /// `"development"` (defaults to `"v1"`).
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Override the index-service URL (defaults to `https://index.affectiva.com`).
    pub fn index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = url.into();
        self
    }

    /// Set an HTTP request timeout. Unset by default: requests block for as
    /// long as the server takes.
    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = Some(d);
        self
    }

    /// Resolve credentials, then discover the job service and build the
    /// [`Client`].
    ///
    /// Username and password fall back to the `AFFECTIVA_API_USER` and
    /// `AFFECTIVA_API_PASSWORD` environment variables; a field set on the
    /// builder is used as-is and its variable is never read.
    ///
    /// Discovery is a single unauthenticated GET of the index service; its
    /// JSON body is expected to hold the job-service URL under
    /// `<version>.jobs`. Any failure aborts construction.
    pub async fn build(self) -> Result<Client> {
        let username = resolve_credential(self.username, USER_ENV_VAR, "username")?;
        let password = resolve_credential(self.password, PASSWORD_ENV_VAR, "password")?;

        let mut http = reqwest::Client::builder();
        if let Some(t) = self.timeout {
            http = http.timeout(t);
        }
        let http = http.build().map_err(AffectivaError::Transport)?;

        let index_url = self.index_url.trim_end_matches('/').to_string();
        debug!(index_url = %index_url, version = %self.version, "resolving job service URL");

        let resp = http
            .get(&index_url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(AffectivaError::Transport)?;
        let index = parse_json(check_status(resp).await?).await?;

        let job_url = index
            .get(self.version.as_str())
            .and_then(|v| v.get(JOB_SERVICE_KEY))
            .and_then(Value::as_str)
            .ok_or_else(|| AffectivaError::Configuration {
                message: format!(
                    "index service has no '{}.{}' entry",
                    self.version, JOB_SERVICE_KEY
                ),
            })?
            .to_string();

        debug!(job_url = %job_url, "job service resolved");

        Ok(Client {
            username,
            password,
            job_url,
            http,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_credential(explicit: Option<String>, env_var: &str, what: &str) -> Result<String> {
    match explicit.or_else(|| std::env::var(env_var).ok()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AffectivaError::Configuration {
            message: format!("no {what} provided; pass it to ClientBuilder or set {env_var}"),
        }),
    }
}

/// Client for the Emotion as a Service job API.
///
/// Constructed once per credential set and service version; the resolved
/// job-service URL and credentials are the only state it holds, so a single
/// instance can be shared freely across tasks.
///
/// # Example
///
/// ```no_run
/// use affectiva::Client;
///
/// # async fn example() -> affectiva::Result<()> {
/// let client = Client::connect("me@example.com", "s3cret").await?;
///
/// let job = client.create_job("path/to/video.mp4").await?;
/// // Processing is asynchronous on the server; poll the entry later.
/// let job = client.query_job(&job.self_url).await?;
/// println!("status: {}", job.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Client {
    username: String,
    password: String,
    /// Job-service base URL resolved from the index service.
    job_url: String,
    http: reqwest::Client,
}

impl Client {
    /// Connect with explicit credentials and the default service version.
    ///
    /// Equivalent to `ClientBuilder::new().username(..).password(..).build()`;
    /// use [`ClientBuilder`] for environment credentials or a non-default
    /// version.
    pub async fn connect(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        ClientBuilder::new()
            .username(username)
            .password(password)
            .build()
            .await
    }

    /// The job-service base URL resolved at construction.
    pub fn job_service_url(&self) -> &str {
        &self.job_url
    }

    /// Upload a media file for processing with the default classifier set.
    ///
    /// See [`create_job_with`](Self::create_job_with) to pick a classifier
    /// set or pass extra form fields.
    pub async fn create_job(&self, media_path: impl AsRef<Path>) -> Result<Entry> {
        self.create_job_with(media_path, CreateJobOptions::default())
            .await
    }

    /// Upload a media file (e.g. a video) for processing.
    ///
    /// Posts a multipart form to the job service with `entry_job[name]` set
    /// to the classifier set and `entry_job[input]` carrying the file bytes
    /// under the file's base name, plus any `extra_params` as additional
    /// fields.
    ///
    /// # Errors
    ///
    /// - [`AffectivaError::Io`] if the file cannot be read; nothing is sent.
    /// - [`AffectivaError::Api`] on a non-2xx response.
    pub async fn create_job_with(
        &self,
        media_path: impl AsRef<Path>,
        opts: CreateJobOptions,
    ) -> Result<Entry> {
        let media_path = media_path.as_ref();
        let file_name = media_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "media".to_string());

        // Read up front so an unreadable file aborts before any network I/O.
        let bytes = tokio::fs::read(media_path).await?;

        let mut form = Form::new()
            .text("entry_job[name]", opts.name)
            .part("entry_job[input]", Part::bytes(bytes).file_name(file_name));
        for (field, value) in opts.extra_params {
            form = form.text(field, value);
        }

        debug!(url = %self.job_url, media = %media_path.display(), "creating job");
        let resp = self
            .authed(self.http.post(&self.job_url))
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(AffectivaError::Transport)?;
        Ok(entry_from_value(parse_json(check_status(resp).await?).await?))
    }

    /// Fetch the current state of a job by its `self` URL.
    pub async fn query_job(&self, job_url: &str) -> Result<Entry> {
        Ok(entry_from_value(self.get_json(job_url).await?))
    }

    /// Update a job. The name field is omitted from the request entirely when
    /// `job_name` is `None`, which the service treats as "leave unchanged".
    pub async fn update_job(&self, job_url: &str, job_name: Option<&str>) -> Result<Entry> {
        let mut fields: Vec<(&str, &str)> = Vec::new();
        if let Some(name) = job_name {
            fields.push(("entry_job[name]", name));
        }

        let resp = self
            .authed(self.http.patch(job_url))
            .header(ACCEPT, "application/json")
            .form(&fields)
            .send()
            .await
            .map_err(AffectivaError::Transport)?;
        Ok(entry_from_value(parse_json(check_status(resp).await?).await?))
    }

    /// List all jobs in the account.
    pub async fn jobs(&self) -> Result<Vec<Entry>> {
        match self.get_json(&self.job_url).await? {
            Value::Array(items) => Ok(items.into_iter().map(entry_from_value).collect()),
            other => Err(AffectivaError::Protocol {
                message: format!("expected a JSON array of jobs, got {}", json_kind(&other)),
            }),
        }
    }

    /// Download a representation's media and save it under its `file_name`
    /// in `output_dir`, overwriting any existing file.
    ///
    /// Returns the path of the written file.
    pub async fn download_representation(
        &self,
        representation: &Representation,
        output_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        if representation.media_url.is_empty() {
            return Err(AffectivaError::Protocol {
                message: format!(
                    "representation '{}' has no media URL",
                    representation.file_name
                ),
            });
        }

        let local_path = output_dir.as_ref().join(&representation.file_name);
        debug!(url = %representation.media_url, path = %local_path.display(), "downloading representation");

        let resp = self
            .authed(self.http.get(&representation.media_url))
            .send()
            .await
            .map_err(AffectivaError::Transport)?;
        let bytes = check_status(resp)
            .await?
            .bytes()
            .await
            .map_err(AffectivaError::Transport)?;

        tokio::fs::write(&local_path, &bytes).await?;
        Ok(local_path)
    }

    /// Download the first result representation whose content type matches
    /// `content_type` exactly (see [`CSV_CONTENT_TYPE`]) and save it in
    /// `output_dir`.
    ///
    /// # Errors
    ///
    /// [`AffectivaError::RepresentationNotFound`] when no representation
    /// matches; the error lists the content types the job does have.
    pub async fn download_results(
        &self,
        job_url: &str,
        content_type: &str,
        output_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let job = self.query_job(job_url).await?;
        let representations = job.result_representations();

        if let Some(rep) = representations
            .iter()
            .find(|r| r.content_type == content_type)
        {
            return self.download_representation(rep, output_dir).await;
        }

        Err(AffectivaError::RepresentationNotFound {
            content_type: content_type.to_string(),
            available: representations
                .into_iter()
                .map(|r| r.content_type)
                .collect(),
        })
    }

    /// Fetch the metric results for a processed job: the parsed body of the
    /// representation with content type [`SESSION_METRICS_CONTENT_TYPE`].
    ///
    /// Returns an empty JSON array when the job has no such representation
    /// yet -- results simply are not available, which is not an error.
    pub async fn results(&self, job_url: &str) -> Result<Value> {
        let job = self.query_job(job_url).await?;

        let mut metrics = Value::Array(Vec::new());
        for rep in job.result_representations() {
            if rep.content_type == SESSION_METRICS_CONTENT_TYPE {
                metrics = self.get_json(&rep.media_url).await?;
            }
        }
        Ok(metrics)
    }

    /// Attach a (source, key, value) annotation to an entry.
    pub async fn add_annotation(
        &self,
        entry: &Entry,
        source: &str,
        key: &str,
        value: &str,
    ) -> Result<Annotation> {
        let url = annotations_url(entry)?;
        let fields = [
            ("annotation[source]", source),
            ("annotation[key]", key),
            ("annotation[value]", value),
        ];

        let resp = self
            .authed(self.http.post(url))
            .header(ACCEPT, "application/json")
            .form(&fields)
            .send()
            .await
            .map_err(AffectivaError::Transport)?;
        Ok(annotation_from_value(
            parse_json(check_status(resp).await?).await?,
        ))
    }

    /// Attach a list of annotations to an entry, one POST per item in order.
    ///
    /// The first failure aborts the remainder and propagates; annotations
    /// already created stay on the server.
    pub async fn add_annotations(
        &self,
        entry: &Entry,
        annotations: &[AnnotationSpec],
    ) -> Result<Vec<Annotation>> {
        let mut created = Vec::with_capacity(annotations.len());
        for spec in annotations {
            created.push(
                self.add_annotation(entry, &spec.source, &spec.key, &spec.value)
                    .await?,
            );
        }
        Ok(created)
    }

    /// Delete every annotation on an entry whose `source` and `key` both
    /// match. Returns how many were deleted; zero matches is not an error.
    pub async fn delete_annotation(
        &self,
        entry: &Entry,
        source: &str,
        key: &str,
    ) -> Result<usize> {
        let url = annotations_url(entry)?;
        let listing = match self.get_json(url).await? {
            Value::Array(items) => items,
            other => {
                return Err(AffectivaError::Protocol {
                    message: format!(
                        "expected a JSON array of annotations, got {}",
                        json_kind(&other)
                    ),
                })
            }
        };

        let mut deleted = 0;
        for annotation in listing.into_iter().map(annotation_from_value) {
            if annotation.source != source || annotation.key != key {
                continue;
            }
            if annotation.self_url.is_empty() {
                return Err(AffectivaError::Protocol {
                    message: "annotation listing entry has no self URL".to_string(),
                });
            }

            let resp = self
                .authed(self.http.delete(&annotation.self_url))
                .header(ACCEPT, "application/json")
                .send()
                .await
                .map_err(AffectivaError::Transport)?;
            check_status(resp).await?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Upload an additional representation to an entry.
    ///
    /// The entry must not already have a representation with this filename;
    /// the server enforces that and the violation surfaces as
    /// [`AffectivaError::Precondition`].
    pub async fn add_representation(
        &self,
        entry: &Entry,
        media_path: impl AsRef<Path>,
        mimetype: &str,
    ) -> Result<Representation> {
        let url = entry
            .representation_self_url()
            .ok_or_else(|| AffectivaError::Protocol {
                message: "entry has no representation_self URL".to_string(),
            })?
            .to_string();
        let form = media_form(media_path.as_ref(), mimetype).await?;

        let resp = self
            .authed(self.http.post(&url))
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(AffectivaError::Transport)?;
        Ok(representation_from_value(
            parse_json(check_status(resp).await?).await?,
        ))
    }

    /// Replace the media attached to a representation.
    pub async fn update_representation(
        &self,
        representation: &Representation,
        media_path: impl AsRef<Path>,
        mimetype: &str,
    ) -> Result<()> {
        let form = media_form(media_path.as_ref(), mimetype).await?;

        let resp = self
            .authed(self.http.put(&representation.self_url))
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(AffectivaError::Transport)?;
        check_status(resp).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.basic_auth(&self.username, Some(&self.password))
    }

    /// Authenticated GET of a URL the service handed us, parsed as JSON.
    async fn get_json(&self, url: &str) -> Result<Value> {
        let resp = self
            .authed(self.http.get(url))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(AffectivaError::Transport)?;
        parse_json(check_status(resp).await?).await
    }
}

fn annotations_url(entry: &Entry) -> Result<&str> {
    entry
        .annotations_url()
        .ok_or_else(|| AffectivaError::Protocol {
            message: "entry has no annotations URL".to_string(),
        })
}

/// Single-part `media` form for representation uploads. The part filename is
/// the path exactly as given; the server keys representation uniqueness off
/// the filename.
async fn media_form(media_path: &Path, mimetype: &str) -> Result<Form> {
    let bytes = tokio::fs::read(media_path).await?;
    let part = Part::bytes(bytes)
        .file_name(media_path.to_string_lossy().into_owned())
        .mime_str(mimetype)
        .map_err(|_| AffectivaError::Configuration {
            message: format!("invalid media type '{mimetype}'"),
        })?;
    Ok(Form::new().part("media", part))
}

/// Map a non-2xx response to a typed error, draining the body for diagnosis.
async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let status_code = status.as_u16();
    let body = resp.text().await.unwrap_or_default();
    warn!(status = status_code, "request rejected");

    if status == StatusCode::CONFLICT || status == StatusCode::PRECONDITION_FAILED {
        Err(AffectivaError::Precondition { status_code, body })
    } else {
        Err(AffectivaError::Api { status_code, body })
    }
}

/// Parse a response body as JSON, mapping parse failures to protocol errors.
async fn parse_json(resp: Response) -> Result<Value> {
    let text = resp.text().await.map_err(AffectivaError::Transport)?;
    serde_json::from_str(&text).map_err(|e| AffectivaError::Protocol {
        message: format!("response was not valid JSON: {e}"),
    })
}

fn json_kind(val: &Value) -> &'static str {
    match val {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
