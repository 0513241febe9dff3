use crate::bucket::{CloudBucketBrowser, ListingTicket};
use crate::orchestrator::{AcquiredInput, Orchestrator, RequestTicket, RequestToken, Settlement};
use crate::presentation::{ImageSize, ResultView, Tab};
use crate::render;
use crate::traits::AnnotationBackend;
use crate::types::{
    AnnotationResult, CloudImageInfo, ConsoleError, DisplayedImage, Feature, FeatureSet, ImageSource, ImageUpload,
    Result,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const HELP: &str = "\
Commands:
  source upload|url|cloud   choose where the image comes from
  file <path>               annotate a local image (upload source)
  uri <url>                 annotate an image URL (url source)
  features [A,B,..|all|none] show or set requested features
  toggle <FEATURE>          add or remove one feature
  list                      show the cloud bucket page (cloud source)
  next | prev | page <n>    move through the bucket listing
  refresh                   re-fetch the bucket listing
  pick <row>                annotate a listed cloud image by reference
  tab <name>                objects, labels, properties, safe-search, faces
  hover <row> | unhover     highlight the box of an object or face row
  show                      redraw the screen
  help                      this text
  quit                      leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Source(ImageSource),
    File(PathBuf),
    Uri(String),
    Features(FeatureSet),
    Toggle(Feature),
    List,
    Next,
    Previous,
    Page(usize),
    Refresh,
    Pick(usize),
    Tab(Tab),
    Hover(usize),
    Unhover,
    Show,
    Help,
    Quit,
}

fn required<'a>(argument: &'a str, command: &str) -> Result<&'a str> {
    if argument.is_empty() {
        Err(ConsoleError::InvalidCommand(format!("'{}' needs an argument", command)))
    } else {
        Ok(argument)
    }
}

fn index(argument: &str, command: &str) -> Result<usize> {
    required(argument, command)?
        .parse()
        .map_err(|_| ConsoleError::InvalidCommand(format!("'{}' expects a number, got '{}'", command, argument)))
}

impl FromStr for Command {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (name, argument) = match line.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (line, ""),
        };

        match name.to_ascii_lowercase().as_str() {
            "source" => Ok(Command::Source(required(argument, name)?.parse()?)),
            "file" | "upload" => Ok(Command::File(PathBuf::from(required(argument, name)?))),
            "uri" | "url" => Ok(Command::Uri(required(argument, name)?.to_string())),
            "features" => match argument.to_ascii_lowercase().as_str() {
                "" => Ok(Command::Show),
                "all" => Ok(Command::Features(FeatureSet::all())),
                "none" => Ok(Command::Features(FeatureSet::empty())),
                _ => Ok(Command::Features(argument.parse()?)),
            },
            "toggle" => Ok(Command::Toggle(required(argument, name)?.parse()?)),
            "list" | "ls" => Ok(Command::List),
            "next" => Ok(Command::Next),
            "prev" | "previous" => Ok(Command::Previous),
            "page" => Ok(Command::Page(index(argument, name)?)),
            "refresh" => Ok(Command::Refresh),
            "pick" | "select" => Ok(Command::Pick(index(argument, name)?)),
            "tab" => Ok(Command::Tab(required(argument, name)?.parse()?)),
            "hover" => Ok(Command::Hover(index(argument, name)?)),
            "unhover" => Ok(Command::Unhover),
            "show" | "" => Ok(Command::Show),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(ConsoleError::InvalidCommand(format!("unknown command '{}'", other))),
        }
    }
}

/// Completion of work spawned by the session.
#[derive(Debug)]
pub enum SessionEvent {
    Annotated {
        token: RequestToken,
        outcome: Result<AnnotationResult>,
    },
    Listed {
        ticket: ListingTicket,
        listing: Result<Vec<CloudImageInfo>>,
    },
    Measured {
        generation: u64,
        size: Result<ImageSize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue(String),
    Quit,
}

/// Interactive annotation session. All state changes happen on the task
/// that drives the session; network calls run as spawned tasks and report
/// back through a channel.
pub struct Session {
    backend: Arc<dyn AnnotationBackend>,
    orchestrator: Orchestrator,
    browser: CloudBucketBrowser,
    view: ResultView,
    image_size: Option<ImageSize>,
    measure_generation: u64,
    in_flight: usize,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Session {
    pub fn new(backend: Arc<dyn AnnotationBackend>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            orchestrator: Orchestrator::new(),
            browser: CloudBucketBrowser::new(),
            view: ResultView::default(),
            image_size: None,
            measure_generation: 0,
            in_flight: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn browser(&self) -> &CloudBucketBrowser {
        &self.browser
    }

    pub fn view(&self) -> &ResultView {
        &self.view
    }

    pub fn image_size(&self) -> Option<ImageSize> {
        self.image_size
    }

    /// Number of spawned tasks that have not reported back yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub async fn handle(&mut self, command: Command) -> Result<Flow> {
        debug!("Handling {:?}", command);
        let output = match command {
            Command::Source(source) => {
                self.orchestrator.set_source(source);
                self.clear_image();
                if source == ImageSource::CloudStorage {
                    self.load_listing();
                }
                self.screen()
            }
            Command::File(path) => {
                self.require_source(ImageSource::Upload, "file")?;
                let upload = ImageUpload::from_path(&path).await?;
                self.acquire(AcquiredInput::File(upload));
                self.screen()
            }
            Command::Uri(uri) => {
                self.require_source(ImageSource::Url, "uri")?;
                self.acquire(AcquiredInput::Uri(uri));
                self.screen()
            }
            Command::Features(features) => {
                if let Some(ticket) = self.orchestrator.set_features(features) {
                    self.spawn_request(ticket);
                }
                self.screen()
            }
            Command::Toggle(feature) => {
                if let Some(ticket) = self.orchestrator.toggle_feature(feature) {
                    self.spawn_request(ticket);
                }
                self.screen()
            }
            Command::List => {
                self.require_source(ImageSource::CloudStorage, "list")?;
                self.load_listing();
                render::render_bucket(&self.browser)
            }
            Command::Next => {
                self.browser.next_page();
                render::render_bucket(&self.browser)
            }
            Command::Previous => {
                self.browser.previous_page();
                render::render_bucket(&self.browser)
            }
            Command::Page(page) => {
                if !self.browser.select_page(page) {
                    return Err(ConsoleError::InvalidCommand(format!("page {} does not exist", page)));
                }
                render::render_bucket(&self.browser)
            }
            Command::Refresh => {
                let ticket = self.browser.refresh();
                self.spawn_listing(ticket);
                render::render_bucket(&self.browser)
            }
            Command::Pick(row) => {
                self.require_source(ImageSource::CloudStorage, "pick")?;
                let info = self
                    .browser
                    .select_image(row)
                    .ok_or_else(|| ConsoleError::InvalidCommand(format!("no image at row {}", row)))?;
                let image_url = self.backend.image_data_url(&info);
                self.acquire(AcquiredInput::CloudImage { info, image_url });
                self.screen()
            }
            Command::Tab(tab) => {
                let selected = match self.orchestrator.projection().result {
                    Some(result) => self.view.select_tab(tab, result),
                    None => false,
                };
                if !selected {
                    return Err(ConsoleError::InvalidCommand(format!("tab '{}' is not available", tab)));
                }
                self.screen()
            }
            Command::Hover(row) => {
                let hovered = match self.orchestrator.projection().result {
                    Some(result) => self.view.hover(row, result),
                    None => false,
                };
                if !hovered {
                    return Err(ConsoleError::InvalidCommand(format!("row {} has no bounding box", row)));
                }
                self.screen()
            }
            Command::Unhover => {
                self.view.unhover();
                self.screen()
            }
            Command::Show => self.screen(),
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Flow::Quit),
        };
        Ok(Flow::Continue(output))
    }

    /// Applies a completion. Returns the screen to redraw, or `None` when
    /// the event was stale and changed nothing.
    pub fn apply(&mut self, event: SessionEvent) -> Option<String> {
        self.in_flight = self.in_flight.saturating_sub(1);
        match event {
            SessionEvent::Annotated { token, outcome } => {
                if self.orchestrator.settle(token, outcome) == Settlement::Stale {
                    return None;
                }
                if let Some(result) = self.orchestrator.projection().result {
                    self.view = ResultView::for_result(result);
                }
                Some(self.screen())
            }
            SessionEvent::Listed { ticket, listing } => {
                if !self.browser.finish_load(ticket, listing) {
                    return None;
                }
                Some(render::render_bucket(&self.browser))
            }
            SessionEvent::Measured { generation, size } => {
                if generation != self.measure_generation {
                    return None;
                }
                match size {
                    Ok(size) => {
                        self.image_size = Some(size);
                        self.orchestrator.projection().result.map(|_| self.screen())
                    }
                    Err(e) => {
                        warn!("Could not read image dimensions: {}", e);
                        None
                    }
                }
            }
        }
    }

    /// Waits for every spawned task and applies the results, returning the
    /// screens they produced.
    pub async fn drain(&mut self) -> Vec<String> {
        let mut screens = Vec::new();
        while self.in_flight > 0 {
            match self.events_rx.recv().await {
                Some(event) => screens.extend(self.apply(event)),
                None => break,
            }
        }
        screens
    }

    /// Runs the read-eval-print loop until `quit` or end of input.
    pub async fn run<R, W>(mut self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Console session started with {}", self.backend.backend_name());
        let mut lines = input.lines();
        output.write_all(format!("{}\n\n{}\n", HELP, self.screen()).as_bytes()).await?;
        output.flush().await?;

        loop {
            let text = tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    match line.parse::<Command>() {
                        Ok(command) => match self.handle(command).await {
                            Ok(Flow::Continue(text)) => text,
                            Ok(Flow::Quit) => break,
                            Err(e) => format!("Error: {}\n", e),
                        },
                        Err(e) => format!("Error: {}\n", e),
                    }
                }
                Some(event) = self.events_rx.recv() => match self.apply(event) {
                    Some(text) => text,
                    None => continue,
                },
            };
            output.write_all(text.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }

        info!("Console session finished");
        Ok(())
    }

    pub fn screen(&self) -> String {
        let source = self.orchestrator.source();
        let mut out = format!("Image source: {}\n", render::render_sources(source));
        if source.uses_features() {
            out.push_str(&format!("Features: {}\n", render::render_features(self.orchestrator.features())));
        } else {
            out.push_str(&render::render_bucket(&self.browser));
        }

        let projection = self.orchestrator.projection();
        if projection.is_empty() {
            return out;
        }
        out.push_str("\nResults\n");
        out.push_str(&render::render_status(&projection));
        if let Some(result) = projection.result {
            out.push_str(&render::render_result(
                result,
                &self.view,
                self.orchestrator.displayed_image(),
                self.image_size,
            ));
        }
        out
    }

    fn require_source(&self, source: ImageSource, command: &str) -> Result<()> {
        if self.orchestrator.source() == source {
            Ok(())
        } else {
            Err(ConsoleError::InvalidCommand(format!(
                "'{}' needs the {} source (current: {})",
                command,
                source,
                self.orchestrator.source()
            )))
        }
    }

    fn acquire(&mut self, input: AcquiredInput) {
        if let Some(ticket) = self.orchestrator.acquire(input) {
            self.measure_displayed_image();
            self.spawn_request(ticket);
        }
    }

    fn load_listing(&mut self) {
        if let Some(ticket) = self.browser.begin_load() {
            self.spawn_listing(ticket);
        }
    }

    fn clear_image(&mut self) {
        self.measure_generation += 1;
        self.image_size = None;
    }

    fn measure_displayed_image(&mut self) {
        self.clear_image();
        let generation = self.measure_generation;
        match self.orchestrator.acquired_input().cloned() {
            Some(AcquiredInput::File(upload)) => {
                match ImageSize::from_bytes(&upload.bytes) {
                    Ok(size) => self.image_size = Some(size),
                    Err(e) => warn!("Could not read dimensions of {}: {}", upload.file_name, e),
                }
            }
            Some(AcquiredInput::Uri(uri)) => {
                self.spawn_measure(generation, MeasureSource::Url(uri));
            }
            Some(AcquiredInput::CloudImage { info, .. }) => {
                self.spawn_measure(generation, MeasureSource::Bucket(info.image_id));
            }
            None => {}
        }
    }

    fn spawn_request(&mut self, ticket: RequestTicket) {
        let backend = Arc::clone(&self.backend);
        let events = self.events_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let outcome = ticket.request.execute(backend.as_ref()).await;
            let _ = events.send(SessionEvent::Annotated {
                token: ticket.token,
                outcome,
            });
        });
    }

    fn spawn_listing(&mut self, ticket: ListingTicket) {
        let backend = Arc::clone(&self.backend);
        let events = self.events_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let listing = backend.list_bucket(None).await;
            let _ = events.send(SessionEvent::Listed { ticket, listing });
        });
    }

    fn spawn_measure(&mut self, generation: u64, source: MeasureSource) {
        let backend = Arc::clone(&self.backend);
        let events = self.events_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let bytes = match &source {
                MeasureSource::Url(uri) => backend.fetch_image(uri).await,
                MeasureSource::Bucket(image_id) => backend.image_data(image_id).await,
            };
            let size = bytes.and_then(|bytes| ImageSize::from_bytes(&bytes));
            let _ = events.send(SessionEvent::Measured { generation, size });
        });
    }
}

enum MeasureSource {
    Url(String),
    Bucket(String),
}

/// Image the one-shot commands draw boxes on.
pub async fn measure_image(backend: &dyn AnnotationBackend, image: &DisplayedImage) -> Option<ImageSize> {
    let bytes = match image {
        DisplayedImage::Upload { bytes, .. } => Ok(bytes.clone()),
        DisplayedImage::Remote { url } => backend.fetch_image(url).await,
    };
    match bytes.and_then(|bytes| ImageSize::from_bytes(&bytes)) {
        Ok(size) => Some(size),
        Err(e) => {
            warn!("Could not read image dimensions: {}", e);
            None
        }
    }
}
