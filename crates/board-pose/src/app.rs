//! The interactive frame loop.

use crate::config::{ConfigError, PipelineConfig};
use crate::display::{Display, DisplayError, Key};
use crate::pipeline::{FramePipeline, FrameReport};
use crate::source::{FrameSource, SourceError};
use log::{debug, info};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// What a finished run looked like.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub frames: usize,
    pub posed: usize,
    /// `true` when Esc ended the run before the source ran dry.
    pub stopped_by_user: bool,
    pub reports: Vec<FrameReport>,
}

/// Pipeline plus the presentation settings of the loop.
#[derive(Clone, Debug)]
pub struct PoseApp {
    pub pipeline: FramePipeline,
    pub window_title: String,
    pub frame_delay_ms: u64,
}

impl PoseApp {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            pipeline: FramePipeline::new(config)?,
            window_title: config.window_title.clone(),
            frame_delay_ms: config.frame_delay_ms,
        })
    }

    /// Read, process, show and poll keys until the stream ends or Esc.
    ///
    /// Space pauses until the next key press; Esc pressed during the pause
    /// also exits. Frames without a pose are shown unannotated.
    pub fn run<S, D>(&self, source: &mut S, display: &mut D) -> Result<RunSummary, AppError>
    where
        S: FrameSource + ?Sized,
        D: Display + ?Sized,
    {
        let mut summary = RunSummary::default();

        loop {
            let Some(mut frame) = source.next_frame()? else {
                info!("end of stream after {} frames", summary.frames);
                break;
            };
            let index = summary.frames;
            summary.frames += 1;

            let result = self.pipeline.process(&frame);
            match &result {
                Ok(estimate) => {
                    self.pipeline.annotate(&mut frame, estimate);
                    summary.posed += 1;
                    debug!(
                        "frame {index}: rmse {:.3}px, camera at {:?}",
                        estimate.solution.rmse, estimate.camera_position
                    );
                }
                Err(err) => debug!("frame {index}: {err}"),
            }
            summary.reports.push(FrameReport::new(index, &result));

            display.show(&self.window_title, &frame)?;

            let mut key = display.wait_key(Some(self.frame_delay_ms))?;
            if key == Some(Key::Space) {
                key = display.wait_key(None)?;
            }
            if key == Some(Key::Esc) {
                info!("stopped by user at frame {index}");
                summary.stopped_by_user = true;
                break;
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::ScriptedDisplay;
    use crate::source::InMemoryFrames;
    use image::{Rgb, RgbImage};

    fn gray_frames(n: u8) -> InMemoryFrames {
        InMemoryFrames::new((0..n).map(|v| RgbImage::from_pixel(64, 48, Rgb([v, v, v]))))
    }

    #[test]
    fn other_keys_do_not_stop_the_loop() {
        let app = PoseApp::from_config(&PipelineConfig::default()).expect("app");
        let mut display = ScriptedDisplay::new([Some(Key::Other(b'q' as u32)), None]);
        let summary = app.run(&mut gray_frames(3), &mut display).expect("run");
        assert_eq!(summary.frames, 3);
        assert!(!summary.stopped_by_user);
        assert_eq!(display.waits, vec![Some(10); 3]);
        assert!(display
            .shown
            .iter()
            .all(|(t, _)| t == "Pose Estimation (Chessboard)"));
    }

    #[test]
    fn empty_source_shows_nothing() {
        let app = PoseApp::from_config(&PipelineConfig::default()).expect("app");
        let mut display = ScriptedDisplay::default();
        let summary = app.run(&mut gray_frames(0), &mut display).expect("run");
        assert_eq!(summary.frames, 0);
        assert!(display.shown.is_empty() && display.waits.is_empty());
    }
}
