//! Frame-by-frame compositing for animations.
//!
//! [`FrameCompositor`] is a small state machine driven by display ticks:
//!
//! ```text
//! Stopped ──start──▶ Running ──on_tick (end of source) / stop──▶ Stopped
//!                      │  ▲
//!                      └──┘ on_tick: composite, advance, re-arm
//! ```
//!
//! Ticks come from a [`TickScheduler`]; each armed tick has a handle and a
//! tick whose handle is not the pending one is ignored, so a `stop` always
//! wins over a callback already in flight. [`ManualScheduler`] hands ticks
//! out on demand and is what export uses to step through every frame.

use crate::compositor::{CompositeError, Compositor, Layers};
use crate::types::{FaceRegion, MaskConfiguration};
use image::RgbaImage;
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;

/// Delay used for frames that declare none (browsers do the same for GIF).
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("animation has no frames")]
    NoFrames,
    #[error("frame {index} is {actual:?}, expected {expected:?}")]
    FrameSize {
        index: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error(transparent)]
    Composite(#[from] CompositeError),
}

/// Identity of one armed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

impl TickHandle {
    /// For schedulers implemented outside this crate.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Source of display-refresh callbacks.
pub trait TickScheduler {
    /// Arm one callback.
    fn schedule(&mut self) -> TickHandle;

    /// Disarm a callback. Unknown handles are ignored.
    fn cancel(&mut self, handle: TickHandle);
}

/// Time-addressable frames of equal size.
pub trait FrameSource {
    fn dimensions(&self) -> (u32, u32);

    fn duration(&self) -> Duration;

    /// Frame visible at `time`; the last frame at or past the end.
    fn frame_at(&self, time: Duration) -> &RgbaImage;
}

/// One decoded or rendered animation frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFrame {
    pub image: RgbaImage,
    pub delay: Duration,
}

impl AnimationFrame {
    pub fn new(image: RgbaImage, delay: Duration) -> Self {
        Self { image, delay }
    }
}

/// In-memory animation.
#[derive(Debug, Clone)]
pub struct AnimationSource {
    frames: Vec<AnimationFrame>,
    /// Start time of each frame.
    starts: Vec<Duration>,
    duration: Duration,
}

impl AnimationSource {
    /// Build from frames of identical size. Zero delays become [`DEFAULT_FRAME_DELAY`].
    pub fn new(frames: Vec<AnimationFrame>) -> Result<Self, PlaybackError> {
        let expected = frames
            .first()
            .ok_or(PlaybackError::NoFrames)?
            .image
            .dimensions();

        let mut starts = Vec::with_capacity(frames.len());
        let mut clock = Duration::ZERO;
        let mut normalized = Vec::with_capacity(frames.len());
        for (index, mut frame) in frames.into_iter().enumerate() {
            let actual = frame.image.dimensions();
            if actual != expected {
                return Err(PlaybackError::FrameSize {
                    index,
                    expected,
                    actual,
                });
            }
            if frame.delay.is_zero() {
                frame.delay = DEFAULT_FRAME_DELAY;
            }
            starts.push(clock);
            clock += frame.delay;
            normalized.push(frame);
        }

        Ok(Self {
            frames: normalized,
            starts,
            duration: clock,
        })
    }

    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    /// Index of the frame visible at `time`.
    pub fn index_at(&self, time: Duration) -> usize {
        self.starts
            .partition_point(|start| *start <= time)
            .saturating_sub(1)
    }

    /// How long the frame visible at `time` stays on screen.
    pub fn delay_at(&self, time: Duration) -> Duration {
        self.frames[self.index_at(time)].delay
    }
}

impl FrameSource for AnimationSource {
    fn dimensions(&self) -> (u32, u32) {
        self.frames[0].image.dimensions()
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn frame_at(&self, time: Duration) -> &RgbaImage {
        &self.frames[self.index_at(time)].image
    }
}

/// Scheduler whose ticks fire only when the caller takes them.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    pending: VecDeque<TickHandle>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next armed tick, oldest first.
    pub fn take_next(&mut self) -> Option<TickHandle> {
        self.pending.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule(&mut self) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.pending.push_back(handle);
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        self.pending.retain(|h| *h != handle);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Running,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stale or unexpected handle; nothing happened.
    Ignored,
    /// Composited the frame at `at` and re-armed.
    Rendered { at: Duration },
    /// Composited the frame at `at` and reached the end of the source.
    Finished { at: Duration },
}

/// Re-composites the current animation frame on every tick.
pub struct FrameCompositor {
    compositor: Compositor,
    layers: Layers,
    display: RgbaImage,
    position: Duration,
    state: PlaybackState,
    pending: Option<TickHandle>,
}

impl FrameCompositor {
    pub fn new(compositor: Compositor, layers: Layers, dimensions: (u32, u32)) -> Self {
        Self {
            compositor,
            layers,
            display: RgbaImage::new(dimensions.0, dimensions.1),
            position: Duration::ZERO,
            state: PlaybackState::Stopped,
            pending: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PlaybackState::Running
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    /// The most recently composited frame.
    pub fn display(&self) -> &RgbaImage {
        &self.display
    }

    /// Arm the first tick. No-op when already running.
    pub fn start(&mut self, scheduler: &mut dyn TickScheduler) {
        if self.is_running() {
            return;
        }
        self.state = PlaybackState::Running;
        self.pending = Some(scheduler.schedule());
    }

    /// Cancel the pending tick, if any.
    pub fn stop(&mut self, scheduler: &mut dyn TickScheduler) {
        if let Some(handle) = self.pending.take() {
            scheduler.cancel(handle);
        }
        self.state = PlaybackState::Stopped;
    }

    /// Handle one tick: composite the current frame, advance by `elapsed`.
    pub fn on_tick(
        &mut self,
        handle: TickHandle,
        elapsed: Duration,
        scheduler: &mut dyn TickScheduler,
        source: &dyn FrameSource,
        faces: &[FaceRegion],
        mask: &MaskConfiguration,
    ) -> Result<TickOutcome, PlaybackError> {
        if !self.is_running() || self.pending != Some(handle) {
            return Ok(TickOutcome::Ignored);
        }
        self.pending = None;

        let at = self.position;
        if let Err(e) = self.compositor.composite(
            source.frame_at(at),
            &mut self.display,
            faces,
            mask,
            self.layers,
        ) {
            self.state = PlaybackState::Stopped;
            return Err(e.into());
        }

        self.position = at + elapsed;
        if self.position >= source.duration() {
            self.position = source.duration();
            self.state = PlaybackState::Stopped;
            return Ok(TickOutcome::Finished { at });
        }
        self.pending = Some(scheduler.schedule());
        Ok(TickOutcome::Rendered { at })
    }

    /// Jump to `time` (clamped to the source) and composite synchronously.
    pub fn seek(
        &mut self,
        time: Duration,
        source: &dyn FrameSource,
        faces: &[FaceRegion],
        mask: &MaskConfiguration,
    ) -> Result<(), PlaybackError> {
        self.position = time.min(source.duration());
        self.compositor.composite(
            source.frame_at(self.position),
            &mut self.display,
            faces,
            mask,
            self.layers,
        )?;
        Ok(())
    }
}

/// Step through every frame of `source` and collect the composited frames.
pub fn record(
    compositor: Compositor,
    source: &AnimationSource,
    faces: &[FaceRegion],
    mask: &MaskConfiguration,
    layers: Layers,
) -> Result<Vec<AnimationFrame>, PlaybackError> {
    let mut scheduler = ManualScheduler::new();
    let mut playback = FrameCompositor::new(compositor, layers, source.dimensions());
    let mut frames = Vec::with_capacity(source.frames().len());

    playback.start(&mut scheduler);
    while let Some(handle) = scheduler.take_next() {
        let delay = source.delay_at(playback.position());
        match playback.on_tick(handle, delay, &mut scheduler, source, faces, mask)? {
            TickOutcome::Ignored => {}
            TickOutcome::Rendered { .. } | TickOutcome::Finished { .. } => {
                frames.push(AnimationFrame::new(playback.display().clone(), delay));
            }
        }
    }
    Ok(frames)
}
