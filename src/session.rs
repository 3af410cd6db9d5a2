// src/session.rs - Interactive edit session: parameters, recompute scheduling and brush edits

use image::RgbaImage;
use std::path::Path;
use std::sync::Arc;

use crate::brush::{apply_stroke, BrushMode, BrushStroke, DisplayMapping};
use crate::config::Config;
use crate::errors::{RefineError, Result};
use crate::image_io::{encode_png, save_image};
use crate::params::{clamp_brush_size, clamp_feather, clamp_shift, max_shift_for, EdgeParameters};
use crate::pipeline::refine;
use crate::segmentation::{SegmentationProgress, Segmenter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No segmentation result to show yet
    Idle,
    /// A composite exists and accepts brush strokes
    Ready,
    /// A full pipeline pass is in flight
    Recomputing,
}

/// Snapshot of everything one pipeline pass needs. It owns its inputs, so a
/// host can run it on a worker thread while the session shows progress.
pub struct RecomputeJob {
    source: Arc<RgbaImage>,
    segmentation: Arc<RgbaImage>,
    params: EdgeParameters,
    working_cap: u32,
    generation: u64,
}

/// Output of a finished job, handed back through `finish_recompute`
pub struct RecomputeResult {
    composite: RgbaImage,
    params: EdgeParameters,
    effective_shift: i32,
    generation: u64,
}

impl RecomputeJob {
    pub fn params(&self) -> EdgeParameters {
        self.params
    }

    pub fn run(self) -> RecomputeResult {
        let outcome = refine(&self.source, &self.segmentation, self.params, self.working_cap);
        RecomputeResult {
            composite: outcome.composite,
            params: self.params,
            effective_shift: outcome.effective_shift,
            generation: self.generation,
        }
    }
}

impl RecomputeResult {
    pub fn effective_shift(&self) -> i32 {
        self.effective_shift
    }
}

pub struct EditSession {
    state: SessionState,
    working_cap: u32,
    model_name: String,

    source: Option<Arc<RgbaImage>>,
    segmentation: Option<Arc<RgbaImage>>,
    composite: Option<RgbaImage>,

    committed: EdgeParameters,
    preview: EdgeParameters,
    dirty: bool,
    max_shift: i32,
    brush_size: u32,

    model_ready: bool,
    progress_percent: u8,
    status: String,
    // bumped whenever the source changes so late job results can be dropped
    generation: u64,
}

impl EditSession {
    pub fn new(config: &Config) -> Self {
        // The shift range depends on the image, so the configured shift is
        // only clamped once a source is loaded
        let initial = EdgeParameters::new(config.shift, clamp_feather(config.feather));
        Self {
            state: SessionState::Idle,
            working_cap: config.working_max_dimension.max(1),
            model_name: config.model_name.clone(),
            source: None,
            segmentation: None,
            composite: None,
            committed: initial,
            preview: initial,
            dirty: false,
            max_shift: max_shift_for(0, 0),
            brush_size: clamp_brush_size(config.brush_size),
            model_ready: false,
            progress_percent: 0,
            status: String::from("Waiting..."),
            generation: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn model_ready(&self) -> bool {
        self.model_ready
    }

    pub fn max_shift(&self) -> i32 {
        self.max_shift
    }

    pub fn committed(&self) -> EdgeParameters {
        self.committed
    }

    pub fn preview(&self) -> EdgeParameters {
        self.preview
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    pub fn source(&self) -> Option<&RgbaImage> {
        self.source.as_deref()
    }

    pub fn composite(&self) -> Option<&RgbaImage> {
        self.composite.as_ref()
    }

    /// Drop the current image and everything derived from it
    pub fn reset(&mut self) {
        self.source = None;
        self.segmentation = None;
        self.composite = None;
        self.dirty = false;
        self.state = SessionState::Idle;
        self.progress_percent = 0;
        self.generation += 1;
    }

    /// Accept a new source image. Prior results and brush edits are
    /// discarded and the shift range is recomputed for the new size.
    pub fn load_source(&mut self, image: RgbaImage) {
        self.reset();

        let (width, height) = image.dimensions();
        self.max_shift = max_shift_for(width, height);
        self.committed = self.committed.clamped(self.max_shift);
        self.preview = self.committed;
        self.source = Some(Arc::new(image));

        self.status = if self.model_ready {
            String::from("Analyzing pixels...")
        } else {
            String::from("Downloading AI engine...")
        };
        log::info!("Loaded source {}x{} (max shift ±{})", width, height, self.max_shift);
    }

    /// Warm up the segmentation producer before any source is chosen.
    ///
    /// Runs one segmentation on a blank image so model data gets fetched,
    /// forwarding progress to the status line. The model counts as ready
    /// afterwards whether or not the warm-up itself succeeded.
    pub fn preload(&mut self, segmenter: &dyn Segmenter) {
        let blank = RgbaImage::new(1, 1);
        let model_name = self.model_name.clone();
        self.status = String::from("Preparing AI...");

        let result = segmenter.segment(&blank, &model_name, &mut |p: SegmentationProgress| {
            self.progress_percent = self.progress_percent.max(p.percent());
            self.status = format!("Preparing AI... {}%", self.progress_percent);
        });

        self.model_ready = true;
        self.progress_percent = 100;
        match result {
            Ok(_) => self.status = String::from("AI ready!"),
            Err(e) => log::debug!("Preload finished: {}", e),
        }
    }

    /// Run `segmenter` on the current source and accept its output
    pub fn run_segmentation(&mut self, segmenter: &dyn Segmenter) -> Result<()> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| RefineError::Session("no source image loaded".to_string()))?;
        let model_name = self.model_name.clone();

        let result = segmenter.segment(&source, &model_name, &mut |p: SegmentationProgress| {
            self.progress_percent = self.progress_percent.max(p.percent());
            self.status = format!("Downloading data... {}%", self.progress_percent);
        });

        self.accept_segmentation(result)
    }

    /// Install the segmentation producer's output and build the first
    /// composite.
    ///
    /// A failed segmentation is not an error for the session: the model is
    /// marked ready, no composite is produced and the status says so.
    pub fn accept_segmentation(&mut self, result: Result<RgbaImage>) -> Result<()> {
        if self.source.is_none() {
            return Err(RefineError::Session(
                "segmentation arrived without a source image".to_string(),
            ));
        }

        if self.state == SessionState::Recomputing {
            // The in-flight pass was built from the old mask; orphan it
            log::debug!("New segmentation supersedes the running recompute");
            self.generation += 1;
            self.state = SessionState::Idle;
        }

        self.model_ready = true;
        match result {
            Ok(mask) => {
                self.segmentation = Some(Arc::new(mask));
                self.progress_percent = 100;
                self.dirty = true;
                self.recompute();
            }
            Err(e) => {
                log::warn!("Segmentation failed: {}", e);
                self.segmentation = None;
                self.composite = None;
                self.state = SessionState::Idle;
                self.status = String::from("Failed. Try again.");
            }
        }
        Ok(())
    }

    /// Update the live shift value without touching the pipeline
    pub fn preview_shift(&mut self, shift: i32) {
        self.preview.shift = clamp_shift(shift, self.max_shift);
    }

    /// Update the live feather value without touching the pipeline
    pub fn preview_feather(&mut self, feather: u32) {
        self.preview.feather = clamp_feather(feather);
    }

    /// Commit a shift value. Returns true when a recompute is now pending.
    pub fn commit_shift(&mut self, shift: i32) -> bool {
        self.preview_shift(shift);
        self.commit(EdgeParameters {
            shift: self.preview.shift,
            ..self.committed
        })
    }

    /// Commit a feather value. Returns true when a recompute is now pending.
    pub fn commit_feather(&mut self, feather: u32) -> bool {
        self.preview_feather(feather);
        self.commit(EdgeParameters {
            feather: self.preview.feather,
            ..self.committed
        })
    }

    fn commit(&mut self, params: EdgeParameters) -> bool {
        if params != self.committed {
            self.committed = params;
            self.dirty = true;
        }
        self.dirty
    }

    /// Start a pipeline pass for the latest committed parameters.
    ///
    /// Returns `None` when nothing is pending, a pass is already running or
    /// no segmentation is available.
    pub fn begin_recompute(&mut self) -> Option<RecomputeJob> {
        if !self.dirty || self.state == SessionState::Recomputing {
            return None;
        }
        let (source, segmentation) = match (&self.source, &self.segmentation) {
            (Some(s), Some(m)) => (Arc::clone(s), Arc::clone(m)),
            _ => return None,
        };

        self.dirty = false;
        self.state = SessionState::Recomputing;
        self.status = String::from("Processing...");

        Some(RecomputeJob {
            source,
            segmentation,
            params: self.committed,
            working_cap: self.working_cap,
            generation: self.generation,
        })
    }

    /// Install a finished pass. Results for a replaced source are dropped.
    /// Returns true if the composite was replaced.
    pub fn finish_recompute(&mut self, result: RecomputeResult) -> bool {
        if result.generation != self.generation {
            log::debug!("Dropping stale recompute result");
            return false;
        }

        // Brush edits on the previous composite are gone from here on
        self.composite = Some(result.composite);
        self.state = SessionState::Ready;
        self.status = String::from("Done!");
        log::debug!(
            "Composite rebuilt with shift {} (effective {}), feather {}",
            result.params.shift,
            result.effective_shift,
            result.params.feather
        );
        true
    }

    /// Run pending passes to completion on the calling thread. Commits made
    /// in between are coalesced into a single pass.
    pub fn recompute(&mut self) -> bool {
        let mut ran = false;
        while let Some(job) = self.begin_recompute() {
            let result = job.run();
            ran |= self.finish_recompute(result);
        }
        ran
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = clamp_brush_size(size);
    }

    /// Apply a brush dab from a pointer position inside a displayed rectangle
    /// of `display_size`. Returns false if the stroke was ignored.
    pub fn brush_at(&mut self, pointer: (f32, f32), display_size: (f32, f32), mode: BrushMode) -> bool {
        let buffer_size = match &self.composite {
            Some(c) => c.dimensions(),
            None => return false,
        };
        let stroke = DisplayMapping::new(display_size, buffer_size).to_stroke(pointer, self.brush_size, mode);
        self.apply_stroke(&stroke)
    }

    /// Apply a stroke in native buffer coordinates. Ignored unless the
    /// session is Ready.
    pub fn apply_stroke(&mut self, stroke: &BrushStroke) -> bool {
        if self.state != SessionState::Ready {
            log::debug!("Ignoring brush stroke while {:?}", self.state);
            return false;
        }
        let soften = self.committed.feather > 0;
        match (&mut self.composite, &self.source) {
            (Some(composite), Some(source)) => {
                apply_stroke(composite, source, stroke, soften);
                true
            }
            _ => false,
        }
    }

    /// Encode the current result as PNG
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let composite = self.require_composite()?;
        encode_png(composite)
    }

    /// Write the current result as a PNG file
    pub fn export_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let composite = self.require_composite()?;
        save_image(composite, path)
    }

    fn require_composite(&self) -> Result<&RgbaImage> {
        self.composite
            .as_ref()
            .ok_or_else(|| RefineError::Session("no result to export".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn photo(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 77, 255]))
    }

    fn centred_mask(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let inside = x >= width / 4 && x < 3 * width / 4 && y >= height / 4 && y < 3 * height / 4;
            Rgba([0, 0, 0, if inside { 230 } else { 10 }])
        })
    }

    fn ready_session(width: u32, height: u32) -> EditSession {
        let mut session = EditSession::new(&Config::default());
        session.load_source(photo(width, height));
        session.accept_segmentation(Ok(centred_mask(width, height))).unwrap();
        session
    }

    #[test]
    fn new_session_is_idle() {
        let session = EditSession::new(&Config::default());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.composite().is_none());
        assert!(!session.model_ready());
    }

    #[test]
    fn segmentation_moves_to_ready_with_composite() {
        let session = ready_session(80, 60);
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.composite().unwrap().dimensions(), (80, 60));
        assert_eq!(session.progress_percent(), 100);
        assert!(session.model_ready());
    }

    #[test]
    fn failed_segmentation_marks_ready_without_result() {
        let mut session = EditSession::new(&Config::default());
        session.load_source(photo(10, 10));
        session
            .accept_segmentation(Err(RefineError::Segmentation("bad format".to_string())))
            .unwrap();
        assert!(session.model_ready());
        assert!(session.composite().is_none());
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.status(), "Failed. Try again.");
        assert!(session.encode_png().is_err());

        // still usable
        session.load_source(photo(12, 12));
        session.accept_segmentation(Ok(centred_mask(12, 12))).unwrap();
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn previews_do_not_trigger_work() {
        let mut session = ready_session(40, 40);
        let before = session.composite().unwrap().clone();
        session.preview_shift(4);
        session.preview_feather(9);
        assert!(!session.is_dirty());
        assert!(session.begin_recompute().is_none());
        assert_eq!(session.preview(), EdgeParameters::new(4, 9));
        assert_eq!(session.committed(), EdgeParameters::default());
        assert_eq!(session.composite().unwrap(), &before);
    }

    #[test]
    fn commits_are_clamped() {
        let mut session = ready_session(40, 40);
        assert_eq!(session.max_shift(), 10);
        assert!(session.commit_shift(-99));
        assert!(session.commit_feather(500));
        assert_eq!(session.committed(), EdgeParameters::new(-10, 20));
    }

    #[test]
    fn recommitting_same_value_is_a_no_op() {
        let mut session = ready_session(40, 40);
        assert!(!session.commit_shift(0));
        assert!(!session.recompute());
    }

    #[test]
    fn commits_during_a_pass_are_coalesced() {
        let mut session = ready_session(60, 60);
        session.commit_shift(2);
        let job = session.begin_recompute().unwrap();
        assert_eq!(session.state(), SessionState::Recomputing);
        assert!(session.begin_recompute().is_none());

        // strokes are refused while the pass is in flight
        let stroke = BrushStroke {
            center: (30.0, 30.0),
            radius: 5.0,
            mode: BrushMode::Erase,
        };
        assert!(!session.apply_stroke(&stroke));

        session.commit_shift(3);
        session.commit_shift(5);
        session.commit_feather(2);

        assert!(session.finish_recompute(job.run()));
        assert!(session.is_dirty());

        let next = session.begin_recompute().unwrap();
        assert_eq!(next.params(), EdgeParameters::new(5, 2));
        session.finish_recompute(next.run());
        assert!(!session.is_dirty());
        assert!(session.begin_recompute().is_none());
    }

    #[test]
    fn stale_results_are_dropped_after_new_source() {
        let mut session = ready_session(30, 30);
        session.commit_feather(3);
        let job = session.begin_recompute().unwrap();
        session.load_source(photo(50, 20));
        assert!(!session.finish_recompute(job.run()));
        assert!(session.composite().is_none());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn pointer_brush_uses_display_scale() {
        let mut session = ready_session(200, 100);
        session.set_brush_size(20);
        // displayed at half size: pointer (50, 25) is buffer (100, 50), radius 20
        assert!(session.brush_at((50.0, 25.0), (100.0, 50.0), BrushMode::Erase));
        let composite = session.composite().unwrap();
        assert_eq!(composite.get_pixel(100, 50)[3], 0);
        assert_eq!(composite.get_pixel(119, 50)[3], 0);
        assert_eq!(composite.get_pixel(100, 72)[3], 255);
    }

    #[test]
    fn brush_size_is_clamped() {
        let mut session = EditSession::new(&Config::default());
        session.set_brush_size(3);
        assert_eq!(session.brush_size(), 10);
        session.set_brush_size(900);
        assert_eq!(session.brush_size(), 200);
    }

    #[test]
    fn configured_shift_is_clamped_per_image() {
        let config = Config {
            shift: 30,
            ..Config::default()
        };
        let mut session = EditSession::new(&config);
        session.load_source(photo(3000, 3000));
        assert_eq!(session.max_shift(), 45);
        assert_eq!(session.committed(), EdgeParameters::new(30, 0));

        let mut small = EditSession::new(&config);
        small.load_source(photo(100, 100));
        assert_eq!(small.committed().shift, 10);
    }

    #[test]
    fn new_segmentation_replaces_a_running_pass() {
        let mut session = ready_session(60, 60);
        session.commit_shift(2);
        let job = session.begin_recompute().unwrap();

        let empty = RgbaImage::from_pixel(60, 60, Rgba([0, 0, 0, 0]));
        session.accept_segmentation(Ok(empty)).unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert!(!session.is_dirty());
        assert!(session.composite().unwrap().pixels().all(|p| p[3] == 0));

        // the pass built from the old mask must not land
        assert!(!session.finish_recompute(job.run()));
        assert!(session.composite().unwrap().pixels().all(|p| p[3] == 0));
    }

    struct Warmup {
        fail: bool,
    }

    impl Segmenter for Warmup {
        fn segment(
            &self,
            source: &RgbaImage,
            _model_name: &str,
            progress: &mut dyn FnMut(SegmentationProgress),
        ) -> Result<RgbaImage> {
            for current in [1, 3, 2, 4] {
                progress(SegmentationProgress {
                    stage: "fetch".to_string(),
                    current,
                    total: 4,
                });
            }
            if self.fail {
                return Err(RefineError::Segmentation("not an image".to_string()));
            }
            Ok(source.clone())
        }
    }

    #[test]
    fn preload_marks_model_ready() {
        let mut session = EditSession::new(&Config::default());
        session.preload(&Warmup { fail: false });
        assert!(session.model_ready());
        assert_eq!(session.progress_percent(), 100);
        assert_eq!(session.status(), "AI ready!");
        assert_eq!(session.state(), SessionState::Idle);

        session.load_source(photo(8, 8));
        assert_eq!(session.status(), "Analyzing pixels...");
    }

    #[test]
    fn failed_preload_still_counts_as_ready() {
        let mut session = EditSession::new(&Config::default());
        session.preload(&Warmup { fail: true });
        assert!(session.model_ready());
        assert_eq!(session.progress_percent(), 100);
        assert!(session.composite().is_none());
    }
}
