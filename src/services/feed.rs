//! Feed pipeline: ingestion, frame scheduling and windowing wired together.
//!
//! Everything runs on one task. Ingestion callbacks and input commands only
//! submit patches; the frame batcher applies them once per frame, and each
//! applied frame recomputes the visible window and publishes it to the panel.

use crate::config::FeedSettings;
use crate::panels::feed::events::{self, FeedFrame};
use crate::services::input::Command;
use log::{debug, info, warn};
use pulse_sched::{Debounce, FrameBatcher, FrameState, Patch, Throttle};
use pulse_stream::{
    BufferConfigError, ConnectionState, EventId, IngestSignal, IngestionBuffer, LiveChannel,
};
use pulse_window::{Viewport, WindowedRenderer};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tokio::sync::mpsc::UnboundedReceiver;

/// What the panel header shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusIndicator {
    Live,
    #[default]
    Connecting,
    Paused,
    Error,
}

impl StatusIndicator {
    pub fn from_state(state: ConnectionState, paused: bool) -> Self {
        if paused {
            return StatusIndicator::Paused;
        }
        match state {
            ConnectionState::Live => StatusIndicator::Live,
            ConnectionState::Connecting => StatusIndicator::Connecting,
            ConnectionState::Errored | ConnectionState::Disconnected => StatusIndicator::Error,
        }
    }
}

impl fmt::Display for StatusIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusIndicator::Live => "live",
            StatusIndicator::Connecting => "connecting",
            StatusIndicator::Paused => "paused",
            StatusIndicator::Error => "error",
        };
        f.write_str(s)
    }
}

/// State committed once per frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    pub viewport: Viewport,
    pub buffer_len: usize,
    /// Id of the newest accepted event. Ids are sequential, so the distance
    /// between two of them is the number of rows prepended.
    pub newest_id: EventId,
    pub status: ConnectionState,
    pub paused: bool,
}

impl ViewState {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            buffer_len: 0,
            newest_id: 0,
            status: ConnectionState::Disconnected,
            paused: false,
        }
    }

    pub fn indicator(&self) -> StatusIndicator {
        StatusIndicator::from_state(self.status, self.paused)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewPatch {
    pub scroll_offset: Option<f64>,
    pub viewport_height: Option<f64>,
    pub buffer_len: Option<usize>,
    pub newest_id: Option<EventId>,
    pub status: Option<ConnectionState>,
    pub paused: Option<bool>,
}

impl ViewPatch {
    pub fn scroll(offset: f64) -> Self {
        Self {
            scroll_offset: Some(offset),
            ..Self::default()
        }
    }

    pub fn resize(height: f64) -> Self {
        Self {
            viewport_height: Some(height),
            ..Self::default()
        }
    }

    pub fn accepted(newest_id: EventId, buffer_len: usize) -> Self {
        Self {
            buffer_len: Some(buffer_len),
            newest_id: Some(newest_id),
            ..Self::default()
        }
    }

    pub fn status(status: ConnectionState) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn paused(paused: bool) -> Self {
        Self {
            paused: Some(paused),
            ..Self::default()
        }
    }
}

impl Patch for ViewPatch {
    fn merge(&mut self, newer: Self) {
        if newer.scroll_offset.is_some() {
            self.scroll_offset = newer.scroll_offset;
        }
        if newer.viewport_height.is_some() {
            self.viewport_height = newer.viewport_height;
        }
        if newer.buffer_len.is_some() {
            self.buffer_len = newer.buffer_len;
        }
        if newer.newest_id.is_some() {
            self.newest_id = newer.newest_id;
        }
        if newer.status.is_some() {
            self.status = newer.status;
        }
        if newer.paused.is_some() {
            self.paused = newer.paused;
        }
    }
}

impl FrameState for ViewState {
    type Patch = ViewPatch;

    fn apply(&mut self, patch: ViewPatch) {
        if let Some(height) = patch.viewport_height
            && let Err(e) = self.viewport.set_viewport_height(height)
        {
            warn!("Ignoring resize: {}", e);
        }
        // Scroll targets refer to the list as it was before this frame's
        // prepends, so anchoring runs after them.
        if let Some(offset) = patch.scroll_offset {
            self.viewport.set_scroll_offset(offset);
        }
        if let Some(len) = patch.buffer_len {
            self.buffer_len = len;
        }
        if let Some(id) = patch.newest_id {
            let prepended = id.saturating_sub(self.newest_id) as usize;
            self.newest_id = id;
            self.viewport.anchor_prepended(prepended);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(paused) = patch.paused {
            self.paused = paused;
        }
        // Pull back onto the last page.
        self.viewport.scroll_by(0.0, self.buffer_len);
    }
}

type WarnCallback = Box<dyn FnMut(String)>;

/// Mounted ingestion + render pipeline.
pub struct FeedPipeline {
    settings: FeedSettings,
    channel: Rc<dyn LiveChannel>,
    ingest: IngestionBuffer,
    batcher: FrameBatcher<ViewState>,
    renderer: WindowedRenderer,
    resize: Debounce<f64>,
    warnings: Rc<RefCell<Throttle<WarnCallback>>>,
    warnings_emitted: Rc<Cell<u64>>,
    /// Scroll offset submitted but not yet committed by a frame.
    scroll_target: Option<f64>,
    paused: bool,
    indicator: StatusIndicator,
    last_frame: Option<FeedFrame>,
    mounted: bool,
}

impl FeedPipeline {
    /// Build the pipeline and, when `auto_start` is set, open the channel.
    /// A failed connect is not an error here; it shows up as the status.
    pub fn mount(
        settings: FeedSettings,
        channel: Rc<dyn LiveChannel>,
    ) -> Result<Self, BufferConfigError> {
        let ingest = IngestionBuffer::new(settings.max_items)?;
        let batcher = FrameBatcher::new(ViewState::new(settings.viewport), settings.frame_interval);

        let warnings_emitted = Rc::new(Cell::new(0));
        let counter = warnings_emitted.clone();
        let report: WarnCallback = Box::new(move |reason: String| {
            counter.set(counter.get() + 1);
            warn!("Dropped malformed event payload: {}", reason);
            events::send_notice(format!("dropped malformed event: {}", reason));
        });

        let mut pipeline = Self {
            renderer: WindowedRenderer::new(settings.viewport),
            resize: Debounce::new(settings.resize_debounce),
            warnings: Rc::new(RefCell::new(Throttle::new(settings.warn_throttle, report))),
            warnings_emitted,
            scroll_target: None,
            paused: !settings.auto_start,
            indicator: StatusIndicator::default(),
            last_frame: None,
            mounted: true,
            settings,
            channel,
            ingest,
            batcher,
        };

        info!(
            "Mounting feed pipeline (max_items={}, auto_start={})",
            pipeline.settings.max_items, pipeline.settings.auto_start
        );
        pipeline.batcher.submit(ViewPatch::paused(pipeline.paused));
        if pipeline.settings.auto_start {
            pipeline.connect();
        }
        Ok(pipeline)
    }

    /// Drive the pipeline until `quit`, EOF on the command channel, or unmount.
    pub async fn run(&mut self, mut commands: UnboundedReceiver<Command>) {
        while self.mounted {
            tokio::select! {
                msg = self.ingest.next_message() => self.ingest.handle_message(msg),
                frame = self.batcher.next_frame() => self.present(frame),
                height = self.resize.settled() => self.apply_resize(height),
                cmd = commands.recv() => match cmd {
                    Some(Command::Quit) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
            }
        }
        self.unmount();
    }

    pub fn handle_command(&mut self, cmd: Command) {
        let len = self.ingest.buffer().len();
        let committed = self.batcher.state().viewport;
        let mut viewport =
            committed.with_scroll_offset(self.scroll_target.unwrap_or(committed.scroll_offset()));

        match cmd {
            Command::ScrollRows(rows) => viewport.scroll_rows(rows, len),
            Command::PageDown => viewport.page_down(len),
            Command::PageUp => viewport.page_up(len),
            Command::Top => viewport.scroll_to_top(),
            Command::Bottom => viewport.scroll_to_bottom(len),
            Command::ScrollTo(offset) => viewport.set_scroll_offset(offset),
            Command::Resize(height) => {
                if !height.is_finite() || height < 0.0 {
                    warn!("Ignoring resize to {}", height);
                } else {
                    self.resize.input(height);
                }
                return;
            }
            Command::Pause => return self.pause(),
            Command::Resume => return self.resume(),
            Command::Quit => return self.unmount(),
        }

        self.scroll_target = Some(viewport.scroll_offset());
        self.batcher.submit(ViewPatch::scroll(viewport.scroll_offset()));
    }

    /// Close the channel and keep the rows. Idempotent.
    pub fn pause(&mut self) {
        if self.paused || !self.mounted {
            return;
        }
        info!("Pausing feed");
        self.paused = true;
        self.batcher.submit(ViewPatch::paused(true));
        self.ingest.close();
    }

    /// Reconnect unless a connection is already open.
    pub fn resume(&mut self) {
        if !self.mounted || (!self.paused && self.ingest.is_open()) {
            return;
        }
        info!("Resuming feed");
        self.paused = false;
        self.batcher.submit(ViewPatch::paused(false));
        self.connect();
    }

    /// Drain queued channel messages without waiting.
    pub fn pump(&mut self) -> usize {
        self.ingest.poll_messages()
    }

    /// Apply any pending patch now instead of at the next frame tick.
    pub fn flush(&mut self) -> Option<u64> {
        let frame = self.batcher.flush()?;
        self.present(frame);
        Some(frame)
    }

    /// Release everything: close the channel, drop the pending frame merge
    /// and resize. Safe to call more than once.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.ingest.close();
        self.batcher.close();
        self.resize.cancel();
        self.scroll_target = None;
        info!("Unmounted feed pipeline");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn indicator(&self) -> StatusIndicator {
        self.indicator
    }

    pub fn last_frame(&self) -> Option<&FeedFrame> {
        self.last_frame.as_ref()
    }

    pub fn ingest(&self) -> &IngestionBuffer {
        &self.ingest
    }

    /// Malformed-payload warnings actually emitted (after throttling).
    pub fn warnings_emitted(&self) -> u64 {
        self.warnings_emitted.get()
    }

    fn connect(&mut self) {
        let submitter = self.batcher.submitter();
        let warnings = self.warnings.clone();

        let result = self.ingest.open(
            &*self.channel,
            self.settings.endpoint.clone(),
            move |signal: IngestSignal<'_>| match signal {
                IngestSignal::Accepted { event, buffer_len } => {
                    submitter.submit(ViewPatch::accepted(event.id, buffer_len));
                }
                IngestSignal::Rejected(err) => {
                    warnings.borrow_mut().call(err.to_string());
                }
                IngestSignal::Status(state) => {
                    submitter.submit(ViewPatch::status(state));
                }
            },
        );

        if let Err(e) = result {
            events::send_notice(format!("connect failed: {}", e));
        }
    }

    fn apply_resize(&mut self, height: f64) {
        debug!("Viewport resize settled at {}", height);
        self.batcher.submit(ViewPatch::resize(height));
    }

    fn present(&mut self, frame: u64) {
        self.scroll_target = None;
        let view = self.batcher.state();
        let window = self.renderer.update(view.viewport, self.ingest.buffer().len());

        let indicator = view.indicator();
        if indicator != self.indicator {
            info!("Feed status: {}", indicator);
            self.indicator = indicator;
            events::send_status(indicator);
        }

        let snapshot = FeedFrame {
            frame,
            status: indicator,
            window,
            total: self.ingest.buffer().len(),
            rows: self.ingest.buffer().range(window.range()).cloned().collect(),
            stats: self.ingest.stats(),
        };
        events::send_frame(snapshot.clone());
        self.last_frame = Some(snapshot);
    }
}

impl Drop for FeedPipeline {
    fn drop(&mut self) {
        self.unmount();
    }
}
