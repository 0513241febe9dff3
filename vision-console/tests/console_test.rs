mod common;

use common::{init_tracing, png_bytes, sample_result};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use vision_console::console::{Flow, HELP};
use vision_console::{types::*, Command, ImageSize, MockAnnotationBackend, RequestState, Session, Tab};

#[test]
fn test_command_parsing() {
    assert_eq!("source cloud".parse::<Command>().unwrap(), Command::Source(ImageSource::CloudStorage));
    assert_eq!(
        "  uri   https://example.com/a.png ".parse::<Command>().unwrap(),
        Command::Uri("https://example.com/a.png".to_string())
    );
    assert_eq!(
        "features label_detection,face_detection".parse::<Command>().unwrap(),
        Command::Features([Feature::LabelDetection, Feature::FaceDetection].into_iter().collect())
    );
    assert_eq!("features none".parse::<Command>().unwrap(), Command::Features(FeatureSet::empty()));
    assert_eq!("features".parse::<Command>().unwrap(), Command::Show);
    assert_eq!("toggle FACE_DETECTION".parse::<Command>().unwrap(), Command::Toggle(Feature::FaceDetection));
    assert_eq!("tab safe-search".parse::<Command>().unwrap(), Command::Tab(Tab::SafeSearch));
    assert_eq!("page 3".parse::<Command>().unwrap(), Command::Page(3));
    assert_eq!("prev".parse::<Command>().unwrap(), Command::Previous);
    assert_eq!("QUIT".parse::<Command>().unwrap(), Command::Quit);
    assert_eq!("".parse::<Command>().unwrap(), Command::Show);

    assert!("pick".parse::<Command>().is_err());
    assert!("pick two".parse::<Command>().is_err());
    assert!("toggle TEXT_DETECTION".parse::<Command>().is_err());
    assert!("source ftp".parse::<Command>().is_err());
    assert!("dance".parse::<Command>().is_err());
}

fn bucket_listing() -> Vec<CloudImageInfo> {
    vec![
        CloudImageInfo::new("beach.jpg", None),
        CloudImageInfo::new("street.jpg", Some("street.json".to_string())),
        CloudImageInfo::new("zoo.jpg", Some("zoo.json".to_string())),
    ]
}

#[tokio::test]
async fn test_url_session_flow() -> Result<()> {
    init_tracing();
    info!("Testing URL session flow");

    let backend = Arc::new(
        MockAnnotationBackend::new("session")
            .with_result(sample_result())
            .with_image("https://example.com/street.jpg", png_bytes(640, 480)),
    );
    let mut session = Session::new(backend.clone());

    session.handle(Command::Source(ImageSource::Url)).await?;
    let Flow::Continue(screen) = session.handle(Command::Uri("https://example.com/street.jpg".to_string())).await?
    else {
        panic!("session ended early");
    };
    assert!(screen.contains("Getting annotations..."));
    assert_eq!(session.in_flight(), 2);

    let screens = session.drain().await;
    assert!(!screens.is_empty());
    assert_eq!(session.in_flight(), 0);
    assert_eq!(session.image_size(), Some(ImageSize::new(640, 480)));
    assert_eq!(session.orchestrator().projection().result, Some(&sample_result()));
    assert_eq!(session.view().active_tab(), Tab::Objects);

    let screen = session.screen();
    assert!(screen.contains("[Image URL]"));
    assert!(screen.contains("Image is classified as 'Person' with 90% confidence."));
    assert!(screen.contains("Bounding boxes:"));

    // Toggling a feature re-annotates the same URL with the new selection.
    session.handle(Command::Toggle(Feature::FaceDetection)).await?;
    session.drain().await;
    assert_eq!(backend.calls.annotate_uri.load(Ordering::SeqCst), 2);
    let features = backend.last_features().unwrap();
    assert!(!features.contains(Feature::FaceDetection));
    assert_eq!(features.len(), 4);

    session.handle(Command::Tab(Tab::Labels)).await?;
    assert_eq!(session.view().active_tab(), Tab::Labels);
    assert!(session.handle(Command::Tab(Tab::Faces)).await.is_err());
    assert!(session.handle(Command::Hover(0)).await.is_err());

    assert_eq!(session.handle(Command::Quit).await?, Flow::Quit);
    Ok(())
}

#[tokio::test]
async fn test_superseded_request_never_shows() -> Result<()> {
    init_tracing();

    let backend = Arc::new(MockAnnotationBackend::new("slow").with_delay(20).with_result(sample_result()));
    let mut session = Session::new(backend.clone());
    session.handle(Command::Source(ImageSource::Url)).await?;

    session.handle(Command::Uri("https://example.com/a.png".to_string())).await?;
    session.handle(Command::Source(ImageSource::Upload)).await?;
    session.drain().await;

    assert!(matches!(session.orchestrator().state(), RequestState::Idle));
    assert!(session.orchestrator().projection().is_empty());
    assert_eq!(backend.calls.annotate_uri.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_cloud_session_flow() -> Result<()> {
    init_tracing();

    let backend = Arc::new(
        MockAnnotationBackend::new("cloud")
            .with_listing(bucket_listing())
            .with_stored_annotation("zoo.json", sample_result())
            .with_image("zoo.jpg", png_bytes(100, 100)),
    );
    let mut session = Session::new(backend.clone());

    assert!(session.handle(Command::Pick(0)).await.is_err());

    session.handle(Command::Source(ImageSource::CloudStorage)).await?;
    assert!(session.browser().is_loading());
    session.drain().await;
    assert_eq!(session.browser().images().len(), 2);

    // Listing again uses the cached copy.
    session.handle(Command::List).await?;
    assert_eq!(session.in_flight(), 0);
    assert_eq!(backend.calls.list_bucket.load(Ordering::SeqCst), 1);

    assert!(session.handle(Command::Pick(5)).await.is_err());
    session.handle(Command::Pick(1)).await?;
    session.drain().await;

    assert_eq!(session.orchestrator().projection().result, Some(&sample_result()));
    assert_eq!(session.image_size(), Some(ImageSize::new(100, 100)));
    assert_eq!(backend.calls.fetch_annotation.load(Ordering::SeqCst), 1);
    assert!(session.screen().contains("* 1. zoo.jpg"));

    // Feature changes do not re-annotate cloud images.
    session.handle(Command::Toggle(Feature::LabelDetection)).await?;
    assert_eq!(session.in_flight(), 0);

    session.handle(Command::Refresh).await?;
    session.drain().await;
    assert_eq!(backend.calls.list_bucket.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_file_requires_upload_source() -> Result<()> {
    init_tracing();

    let backend = Arc::new(MockAnnotationBackend::new("upload").with_result(sample_result()));
    let mut session = Session::new(backend.clone());
    session.handle(Command::Source(ImageSource::Url)).await?;

    let error = session
        .handle(Command::File("/definitely/missing.png".into()))
        .await
        .unwrap_err();
    assert!(matches!(error, ConsoleError::InvalidCommand(_)));
    assert_eq!(backend.calls.total(), 0);

    session.handle(Command::Source(ImageSource::Upload)).await?;
    let error = session
        .handle(Command::File("/definitely/missing.png".into()))
        .await
        .unwrap_err();
    assert!(matches!(error, ConsoleError::Io(_)));
    Ok(())
}

#[tokio::test]
async fn test_run_reads_commands_until_quit() -> Result<()> {
    init_tracing();

    let backend = Arc::new(MockAnnotationBackend::new("repl"));
    let session = Session::new(backend);

    let input: &[u8] = b"help\nsource sideways\nquit\nshow\n";
    let mut output = Vec::new();
    session.run(input, &mut output).await?;

    let output = String::from_utf8(output).unwrap();
    assert!(output.contains(HELP));
    assert!(output.contains("Error: Unknown image source"));
    assert!(output.contains("[File upload]"));
    Ok(())
}
