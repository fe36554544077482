//! Quick-start examples for the Affectiva Rust client.
//!
//! Run with:
//!   AFFECTIVA_API_USER=... AFFECTIVA_API_PASSWORD=... cargo run --example quickstart
//!
//! Or pass credentials directly in code (not recommended for production).

use affectiva::{AnnotationSpec, Client, ClientBuilder, CSV_CONTENT_TYPE};

#[tokio::main]
async fn main() -> affectiva::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Create a client (reads AFFECTIVA_API_USER / AFFECTIVA_API_PASSWORD)
    // -----------------------------------------------------------------------
    let client = ClientBuilder::new().build().await?;

    // Or provide credentials directly:
    // let client = Client::connect("me@example.com", "s3cret").await?;
    println!("Job service: {}", client.job_service_url());
    println!();

    // -----------------------------------------------------------------------
    // 2. Upload a video for processing
    // -----------------------------------------------------------------------
    let job = client.create_job("demo.mp4").await?;
    println!("Created job {} (status: {})", job.self_url, job.status);
    println!();

    // -----------------------------------------------------------------------
    // 3. Check on it later
    // -----------------------------------------------------------------------
    let job = client.query_job(&job.self_url).await?;
    println!("Current status: {}", job.status);

    // Rename the classifier set without touching anything else:
    let job = client.update_job(&job.self_url, Some("smile_only")).await?;
    println!("Now running: {}", job.name);
    println!();

    // -----------------------------------------------------------------------
    // 4. Fetch results once processing is done
    // -----------------------------------------------------------------------
    // Parsed session metrics (empty array until they exist):
    let metrics = client.results(&job.self_url).await?;
    println!("Metrics: {metrics}");

    // Or save the CSV rendering next to us:
    let saved = client
        .download_results(&job.self_url, CSV_CONTENT_TYPE, ".")
        .await?;
    println!("Saved results to {}", saved.display());
    println!();

    // -----------------------------------------------------------------------
    // 5. Annotate the entry
    // -----------------------------------------------------------------------
    client
        .add_annotation(&job, "qa", "reviewed", "yes")
        .await?;
    client
        .add_annotations(
            &job,
            &[
                AnnotationSpec::new("tagger", "scene", "interview"),
                AnnotationSpec::new("tagger", "lighting", "indoor"),
            ],
        )
        .await?;

    // Remove every annotation a source wrote under a key:
    let deleted = client.delete_annotation(&job, "qa", "reviewed").await?;
    println!("Deleted {deleted} annotation(s)");
    println!();

    // -----------------------------------------------------------------------
    // 6. Attach another representation to the uploaded media
    // -----------------------------------------------------------------------
    if let Some(input) = job.input() {
        let rep = client
            .add_representation(&input, "demo_angle2.mp4", "video/mp4")
            .await?;
        println!("Attached {} ({})", rep.file_name, rep.content_type);

        // Replace its media later:
        client
            .update_representation(&rep, "demo_angle2_fixed.mp4", "video/mp4")
            .await?;
    }

    // -----------------------------------------------------------------------
    // 7. List every job in the account
    // -----------------------------------------------------------------------
    for job in client.jobs().await? {
        println!("  {} | {}", job.status, job.self_url);
    }

    Ok(())
}
