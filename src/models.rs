use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classifier set used when [`crate::Client::create_job`] is not given one.
pub const DEFAULT_JOB_NAME: &str = "multiface";

/// One job entry as the job service returns it.
///
/// The service addresses everything by URL: the `self_url` is the handle for
/// all follow-up calls on this entry, and the annotation/representation URLs
/// come out of the same document. The full server response is kept in `raw`
/// so fields this client does not model stay available.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The entry's own URL.
    pub self_url: String,
    /// e.g. "queued", "in_progress", "done".
    pub status: String,
    /// Classifier set the job was created with.
    pub name: String,
    /// Full API response JSON.
    pub raw: Value,
}

impl Entry {
    /// URL of this entry's annotation collection, if the server sent one.
    pub fn annotations_url(&self) -> Option<&str> {
        self.raw.get("annotations").and_then(Value::as_str)
    }

    /// URL for attaching additional representations, if the server sent one.
    pub fn representation_self_url(&self) -> Option<&str> {
        self.raw.get("representation_self").and_then(Value::as_str)
    }

    /// The uploaded media, as a nested entry.
    pub fn input(&self) -> Option<Entry> {
        self.raw.get("input").cloned().map(entry_from_value)
    }

    /// Representations attached to the job's result, in server order.
    /// Empty until processing has produced output.
    pub fn result_representations(&self) -> Vec<Representation> {
        self.raw
            .get("result")
            .and_then(|r| r.get("representations"))
            .and_then(Value::as_array)
            .map(|reps| reps.iter().cloned().map(representation_from_value).collect())
            .unwrap_or_default()
    }

    /// Representations attached directly to this entry (e.g. the copies of
    /// an input entry's media), in server order.
    pub fn representations(&self) -> Vec<Representation> {
        self.raw
            .get("representations")
            .and_then(Value::as_array)
            .map(|reps| reps.iter().cloned().map(representation_from_value).collect())
            .unwrap_or_default()
    }
}

/// One media artifact attached to a job, identified by content type.
#[derive(Debug, Clone)]
pub struct Representation {
    /// e.g. "application/csv".
    pub content_type: String,
    /// Name the file is stored under; also the local name on download.
    pub file_name: String,
    /// Download URL for the raw media bytes.
    pub media_url: String,
    /// The representation's own URL, used for updates.
    pub self_url: String,
    /// Full API response JSON.
    pub raw: Value,
}

/// A (source, key, value) tag attached to an entry.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub source: String,
    pub key: String,
    pub value: String,
    /// The annotation's own URL, used for deletion.
    pub self_url: String,
    /// Full API response JSON.
    pub raw: Value,
}

/// Input triple for [`crate::Client::add_annotations`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationSpec {
    pub source: String,
    pub key: String,
    pub value: String,
}

impl AnnotationSpec {
    pub fn new(
        source: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Options for [`crate::Client::create_job_with`].
///
/// A fresh value is constructed per call; options never leak between jobs.
pub struct CreateJobOptions {
    /// Classifier set to run. Default: "multiface".
    pub name: String,
    /// Additional form fields passed through to the job service verbatim.
    pub extra_params: Vec<(String, String)>,
}

impl Default for CreateJobOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_JOB_NAME.to_string(),
            extra_params: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal deserialization helpers (not part of the public API surface)
// ---------------------------------------------------------------------------

/// Pull a string out of a JSON value, or `""` if missing.
pub(crate) fn json_str(val: &Value, key: &str) -> String {
    val.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

/// Parse a raw job/entry JSON value into an [`Entry`].
pub(crate) fn entry_from_value(val: Value) -> Entry {
    Entry {
        self_url: json_str(&val, "self"),
        status: json_str(&val, "status"),
        name: json_str(&val, "name"),
        raw: val,
    }
}

/// Parse a raw representation JSON value into a [`Representation`].
pub(crate) fn representation_from_value(val: Value) -> Representation {
    Representation {
        content_type: json_str(&val, "content_type"),
        file_name: json_str(&val, "file_name"),
        media_url: json_str(&val, "media"),
        self_url: json_str(&val, "self"),
        raw: val,
    }
}

/// Parse a raw annotation JSON value into an [`Annotation`].
pub(crate) fn annotation_from_value(val: Value) -> Annotation {
    Annotation {
        source: json_str(&val, "source"),
        key: json_str(&val, "key"),
        value: json_str(&val, "value"),
        self_url: json_str(&val, "self"),
        raw: val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_job() -> Value {
        json!({
            "self": "https://jobs.example.com/entry_jobs/42",
            "status": "done",
            "name": "multiface",
            "author": "dev@example.com",
            "published": "2016-03-18T20:52:25Z",
            "updated": "2016-03-18T21:00:01Z",
            "annotations": "https://jobs.example.com/entry_jobs/42/annotations",
            "input": {
                "self": "https://jobs.example.com/entries/7",
                "representation_self": "https://jobs.example.com/entries/7/representations",
                "representations": [
                    {
                        "content_type": "video/mp4",
                        "file_name": "clip.mp4",
                        "media": "https://media.example.com/entries/7/clip.mp4",
                        "self": "https://jobs.example.com/representations/1"
                    }
                ]
            },
            "result": {
                "representations": [
                    {
                        "content_type": "application/vnd.affectiva.session.v0+json",
                        "file_name": "metrics.json",
                        "media": "https://media.example.com/results/42/metrics.json",
                        "self": "https://jobs.example.com/representations/2"
                    },
                    {
                        "content_type": "application/csv",
                        "file_name": "metrics.csv",
                        "media": "https://media.example.com/results/42/metrics.csv",
                        "self": "https://jobs.example.com/representations/3"
                    }
                ]
            }
        })
    }

    #[test]
    fn entry_extracts_urls_and_keeps_raw() {
        let entry = entry_from_value(sample_job());

        assert_eq!(entry.self_url, "https://jobs.example.com/entry_jobs/42");
        assert_eq!(entry.status, "done");
        assert_eq!(entry.name, "multiface");
        assert_eq!(
            entry.annotations_url(),
            Some("https://jobs.example.com/entry_jobs/42/annotations")
        );
        // Fields this client does not model stay reachable via raw.
        assert_eq!(entry.raw["author"], "dev@example.com");
    }

    #[test]
    fn nested_input_entry_carries_representation_urls() {
        let entry = entry_from_value(sample_job());
        let input = entry.input().expect("job should have an input entry");

        assert_eq!(
            input.representation_self_url(),
            Some("https://jobs.example.com/entries/7/representations")
        );
        let reps = input.representations();
        assert_eq!(reps.len(), 1);
        assert_eq!(reps[0].file_name, "clip.mp4");
        assert_eq!(reps[0].content_type, "video/mp4");
    }

    #[test]
    fn result_representations_preserve_server_order() {
        let entry = entry_from_value(sample_job());
        let reps = entry.result_representations();

        let types: Vec<&str> = reps.iter().map(|r| r.content_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["application/vnd.affectiva.session.v0+json", "application/csv"]
        );
        assert_eq!(
            reps[1].media_url,
            "https://media.example.com/results/42/metrics.csv"
        );
    }

    #[test]
    fn missing_keys_extract_as_empty() {
        let entry = entry_from_value(json!({ "status": "queued" }));

        assert_eq!(entry.self_url, "");
        assert_eq!(entry.name, "");
        assert!(entry.annotations_url().is_none());
        assert!(entry.input().is_none());
        assert!(entry.result_representations().is_empty());
    }

    #[test]
    fn annotation_from_value_reads_triple_and_self() {
        let annotation = annotation_from_value(json!({
            "source": "qa",
            "key": "reviewed",
            "value": "true",
            "self": "https://jobs.example.com/annotations/9"
        }));

        assert_eq!(annotation.source, "qa");
        assert_eq!(annotation.key, "reviewed");
        assert_eq!(annotation.value, "true");
        assert_eq!(annotation.self_url, "https://jobs.example.com/annotations/9");
    }
}
