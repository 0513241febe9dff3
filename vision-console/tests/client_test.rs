mod common;

use common::{init_tracing, json_body, png_bytes, sample_result, serve_chunked_once, serve_once};
use serde_json::json;
use tracing::info;
use vision_console::{types::*, AnnotationBackend, AnnotationClient, ImageSize};

fn client_for(base: &str) -> AnnotationClient {
    AnnotationClient::new(ClientConfig::default().with_api_server(base)).unwrap()
}

#[test]
fn test_endpoint_keeps_path_prefix_and_encodes_segments() {
    let client = client_for("http://vision.local/api");

    assert_eq!(
        client.endpoint(&["annotate"]).unwrap().as_str(),
        "http://vision.local/api/annotate"
    );
    assert_eq!(
        client.endpoint(&["bucket", "annotation", "dir/cat.json"]).unwrap().as_str(),
        "http://vision.local/api/bucket/annotation/dir%2Fcat.json"
    );

    let info = CloudImageInfo::new("cat 1.jpg", Some("cat.json".to_string()));
    assert_eq!(
        client.image_data_url(&info),
        "http://vision.local/api/bucket/imagedata/cat%201.jpg"
    );
}

#[test]
fn test_invalid_api_server_is_rejected() {
    let result = AnnotationClient::new(ClientConfig::default().with_api_server("not a url"));
    assert!(matches!(result, Err(ConsoleError::InvalidUrl(_))));
}

#[tokio::test]
async fn test_annotate_uri_posts_multipart_form() -> Result<()> {
    init_tracing();
    info!("Testing URI annotation request shape");

    let (base, server) = serve_once("200 OK", "application/json", serde_json::to_vec(&sample_result())?).await;
    let client = client_for(&base);

    let features: FeatureSet = [Feature::LabelDetection, Feature::ObjectLocalization].into_iter().collect();
    let result = client.annotate_uri("https://example.com/street.jpg", &features).await?;
    assert_eq!(result, sample_result());

    let request = server.await.unwrap();
    assert_eq!(request.request_line(), "POST /annotate HTTP/1.1");
    assert!(request.head.to_ascii_lowercase().contains("content-type: multipart/form-data"));
    assert!(request.body.contains("name=\"image_uri\""));
    assert!(request.body.contains("https://example.com/street.jpg"));
    assert!(request.body.contains("name=\"features\""));
    assert!(request.body.contains("OBJECT_LOCALIZATION,LABEL_DETECTION"));
    Ok(())
}

#[tokio::test]
async fn test_annotate_file_sends_image_part() -> Result<()> {
    init_tracing();

    let (base, server) = serve_once("200 OK", "application/json", json_body(json!({}))).await;
    let client = client_for(&base);

    let upload = ImageUpload::new("street.png", png_bytes(2, 2));
    assert_eq!(upload.mime_type, "image/png");
    let result = client.annotate_file(&upload, &FeatureSet::all()).await?;
    assert_eq!(result, AnnotationResult::default());

    let request = server.await.unwrap();
    assert_eq!(request.request_line(), "POST /annotate HTTP/1.1");
    assert!(request.body.contains("name=\"image\"; filename=\"street.png\""));
    assert!(request.body.contains("Content-Type: image/png"));
    assert!(request.body.contains(&FeatureSet::all().to_wire()));
    Ok(())
}

#[tokio::test]
async fn test_embedded_error_becomes_backend_error() -> Result<()> {
    init_tracing();

    let body = json_body(json!({ "error": { "code": 3, "message": "Bad image data." } }));
    let (base, _server) = serve_once("200 OK", "application/json", body).await;
    let client = client_for(&base);

    match client.annotate_uri("https://example.com/broken.jpg", &FeatureSet::all()).await {
        Err(ConsoleError::Backend { status, message }) => {
            assert_eq!(status, 200);
            assert_eq!(message, "Bad image data.");
        }
        other => panic!("expected a backend error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_failed_status_passes_backend_message_through() -> Result<()> {
    init_tracing();

    let body = json_body(json!({ "error": { "code": 13, "message": "Annotator crashed" } }));
    let (base, _server) = serve_once("500 Internal Server Error", "application/json", body).await;
    let client = client_for(&base);

    let error = client
        .annotate_uri("https://example.com/cat.jpg", &FeatureSet::all())
        .await
        .unwrap_err();
    assert!(matches!(error, ConsoleError::Backend { status: 500, .. }));
    assert_eq!(error.to_string(), "Annotator crashed");

    let (base, _server) = serve_once("404 Not Found", "text/plain", b"no such annotation".to_vec()).await;
    let error = client_for(&base).fetch_annotation("missing.json").await.unwrap_err();
    assert_eq!(error.to_string(), "no such annotation");

    let (base, _server) = serve_once("502 Bad Gateway", "text/plain", Vec::new()).await;
    let error = client_for(&base).list_bucket(None).await.unwrap_err();
    assert_eq!(error.to_string(), "HTTP 502: Bad Gateway");
    Ok(())
}

#[tokio::test]
async fn test_fetch_annotation_by_reference() -> Result<()> {
    init_tracing();

    let (base, server) = serve_once("200 OK", "application/json", serde_json::to_vec(&sample_result())?).await;
    let client = client_for(&base);

    let result = client.fetch_annotation("street.json").await?;
    assert_eq!(result, sample_result());

    let request = server.await.unwrap();
    assert_eq!(
        request.request_line(),
        "GET /bucket/annotation/street.json?image_uri=street.json HTTP/1.1"
    );
    Ok(())
}

#[tokio::test]
async fn test_stored_annotation_with_embedded_error_fails() -> Result<()> {
    init_tracing();

    let body = json_body(json!({ "error": { "code": 3, "message": "Bad image data." } }));
    let (base, server) = serve_once("200 OK", "application/json", body).await;
    let client = client_for(&base);

    let info = CloudImageInfo::new("bad.jpg", Some("bad.json".to_string()));
    match client.annotate_cloud_image(&info).await {
        Err(ConsoleError::Backend { status, message }) => {
            assert_eq!(status, 200);
            assert_eq!(message, "Bad image data.");
        }
        other => panic!("expected a backend error, got {:?}", other),
    }

    let request = server.await.unwrap();
    assert_eq!(
        request.request_line(),
        "GET /bucket/annotation/bad.json?image_uri=bad.json HTTP/1.1"
    );
    Ok(())
}

#[tokio::test]
async fn test_list_bucket_reshapes_listing() -> Result<()> {
    init_tracing();

    // Images without a stored annotation come back as null, in bucket order.
    let body = br#"{"street.jpg": {"annotation": "street.json", "content": null}, "beach.jpg": null}"#.to_vec();
    let (base, server) = serve_once("200 OK", "application/json", body).await;
    let client = client_for(&base);

    let listing = client.list_bucket(Some((0, 10))).await?;
    assert_eq!(
        listing,
        vec![
            CloudImageInfo::new("street.jpg", Some("street.json".to_string())),
            CloudImageInfo::new("beach.jpg", None),
        ]
    );

    let request = server.await.unwrap();
    assert_eq!(request.request_line(), "GET /bucket/list?start=0&end=10 HTTP/1.1");
    Ok(())
}

#[tokio::test]
async fn test_cloud_image_without_annotation_makes_no_request() -> Result<()> {
    init_tracing();

    // Nothing listens on this port; any request would fail with an HTTP error.
    let client = client_for("http://127.0.0.1:9");
    let error = client
        .annotate_cloud_image(&CloudImageInfo::new("beach.jpg", None))
        .await
        .unwrap_err();

    assert!(matches!(error, ConsoleError::NoAnnotation { ref image_id } if image_id == "beach.jpg"));
    assert_eq!(error.to_string(), NO_ANNOTATION_MESSAGE);
    Ok(())
}

#[tokio::test]
async fn test_image_data_dimensions() -> Result<()> {
    init_tracing();

    let (base, server) = serve_once("200 OK", "image/png", png_bytes(64, 48)).await;
    let client = client_for(&base);

    let bytes = client.image_data("street.jpg").await?;
    let size = ImageSize::from_bytes(&bytes)?;
    assert_eq!(size, ImageSize::new(64, 48));

    let request = server.await.unwrap();
    assert_eq!(request.request_line(), "GET /bucket/imagedata/street.jpg HTTP/1.1");
    Ok(())
}

fn small_client(base: &str) -> AnnotationClient {
    let config = ClientConfig {
        max_response_size_mb: 1,
        ..ClientConfig::default().with_api_server(base)
    };
    AnnotationClient::new(config).unwrap()
}

#[tokio::test]
async fn test_announced_length_over_cap_is_rejected() -> Result<()> {
    init_tracing();

    let (base, _server) = serve_once("200 OK", "image/png", vec![0u8; 2 * 1024 * 1024]).await;
    let error = small_client(&base).image_data("huge.jpg").await.unwrap_err();
    assert!(matches!(error, ConsoleError::ResponseTooLarge { size_mb: 2 }));
    Ok(())
}

#[tokio::test]
async fn test_unannounced_body_over_cap_is_rejected() -> Result<()> {
    init_tracing();
    info!("Streaming a body past the size cap without a Content-Length");

    let (base, _server) = serve_chunked_once("200 OK", "image/png", vec![0u8; 3 * 1024 * 1024]).await;
    let error = small_client(&base).fetch_image(&format!("{}/huge.png", base)).await.unwrap_err();
    assert!(matches!(error, ConsoleError::ResponseTooLarge { .. }));

    // Bodies under the cap still stream through.
    let (base, _server) = serve_chunked_once("200 OK", "image/png", png_bytes(8, 8)).await;
    let bytes = small_client(&base).fetch_image(&format!("{}/small.png", base)).await?;
    assert_eq!(ImageSize::from_bytes(&bytes)?, ImageSize::new(8, 8));
    Ok(())
}
