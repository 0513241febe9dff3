use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vision_console::console::measure_image;
use vision_console::orchestrator::AnnotationRequest;
use vision_console::render::{render_bucket, render_result};
use vision_console::{
    AnnotationBackend, AnnotationClient, ClientConfig, CloudBucketBrowser, DisplayedImage, FeatureSet, ImageSize,
    ImageUpload, ResultView, Session,
};

#[derive(Parser)]
#[command(name = "vision-console", version, about = "Explore image annotations from a vision backend")]
struct Cli {
    /// Base URL of the annotation backend
    #[arg(long, env = "VISION_API_SERVER")]
    api_server: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout_seconds: u64,

    #[arg(long)]
    user_agent: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Annotate a local file or an image URL
    Annotate(AnnotateArgs),
    /// Load the stored annotation of a bucket image
    Cloud {
        image_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Print one page of the annotated bucket images
    Bucket {
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Interactive session
    Console,
}

#[derive(Args)]
struct AnnotateArgs {
    #[arg(long, conflicts_with = "uri", required_unless_present = "uri")]
    file: Option<PathBuf>,

    #[arg(long)]
    uri: Option<String>,

    /// Comma-separated features, e.g. OBJECT_LOCALIZATION,LABEL_DETECTION
    #[arg(long, default_value_t = FeatureSet::all())]
    features: FeatureSet,

    /// Print the raw annotation as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::default().with_api_server(cli.api_server);
    config.timeout_seconds = cli.timeout_seconds;
    if let Some(user_agent) = cli.user_agent {
        config.user_agent = user_agent;
    }

    info!("Using annotation backend at {}", config.api_server);
    let client = AnnotationClient::new(config).context("Failed to build the HTTP client")?;

    let outcome = match cli.command {
        CliCommand::Annotate(args) => annotate(&client, args).await,
        CliCommand::Cloud { image_id, json } => cloud(&client, &image_id, json).await,
        CliCommand::Bucket { page } => bucket(&client, page).await,
        CliCommand::Console => {
            let session = Session::new(Arc::new(client));
            session
                .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await
                .map_err(anyhow::Error::from)
        }
    };

    if outcome.is_err() {
        error!("vision-console failed");
    }
    outcome
}

async fn annotate(client: &AnnotationClient, args: AnnotateArgs) -> anyhow::Result<()> {
    let (request, image) = match (args.file, args.uri) {
        (Some(path), _) => {
            let upload = ImageUpload::from_path(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let image = DisplayedImage::Upload {
                file_name: upload.file_name.clone(),
                bytes: upload.bytes.clone(),
            };
            let request = AnnotationRequest::File {
                upload,
                features: args.features,
            };
            (request, image)
        }
        (None, Some(uri)) => {
            let image = DisplayedImage::Remote { url: uri.clone() };
            (AnnotationRequest::Uri { uri, features: args.features }, image)
        }
        (None, None) => return Err(anyhow!("either --file or --uri is required")),
    };

    info!("Requesting annotations for {}", image.describe());
    let result = request.execute(client).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let image_size = measure_image(client, &image).await;
    let view = ResultView::for_result(&result);
    print!("{}", render_result(&result, &view, Some(&image), image_size));
    Ok(())
}

async fn cloud(client: &AnnotationClient, image_id: &str, json: bool) -> anyhow::Result<()> {
    let listing = client.list_bucket(None).await?;
    let info = listing
        .into_iter()
        .find(|info| info.image_id == image_id)
        .ok_or_else(|| anyhow!("Image {} is not in the bucket", image_id))?;

    let result = client.annotate_cloud_image(&info).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let image = DisplayedImage::Remote {
        url: client.image_data_url(&info),
    };
    let image_size = client
        .image_data(&info.image_id)
        .await
        .and_then(|bytes| ImageSize::from_bytes(&bytes))
        .map_err(|e| warn!("Could not read image dimensions: {}", e))
        .ok();
    let view = ResultView::for_result(&result);
    print!("{}", render_result(&result, &view, Some(&image), image_size));
    Ok(())
}

async fn bucket(client: &AnnotationClient, page: usize) -> anyhow::Result<()> {
    let mut browser = CloudBucketBrowser::new();
    browser.load(client).await?;
    if !browser.select_page(page) {
        return Err(anyhow!(
            "Page {} does not exist ({} pages)",
            page,
            browser.pagination().page_count()
        ));
    }
    print!("{}", render_bucket(&browser));
    Ok(())
}
