//! Video file frames decoded by GStreamer.

use crate::source::{FrameSource, SourceError};
use gstreamer::prelude::*;
use image::RgbImage;
use log::debug;
use std::path::{Path, PathBuf};

/// Frames of a video container, decoded to RGB in presentation order.
///
/// The pipeline is `filesrc ! decodebin ! videoconvert ! appsink` with the
/// sink pinned to packed RGB, pulled synchronously one sample at a time.
pub struct VideoFile {
    path: PathBuf,
    pipeline: gstreamer::Pipeline,
    sink: gstreamer_app::AppSink,
}

impl VideoFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(SourceError::NotFound(path));
        }
        let fail = |message: String| SourceError::Video {
            path: path.clone(),
            message,
        };

        if !gstreamer::INITIALIZED.load(std::sync::atomic::Ordering::Relaxed) {
            gstreamer::init().map_err(|e| fail(e.to_string()))?;
        }

        let description = format!(
            "filesrc location=\"{}\" ! decodebin ! videoconvert ! \
             video/x-raw,format=RGB ! appsink name=sink sync=false",
            path.to_string_lossy()
        );
        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| fail(e.to_string()))?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| fail("not a pipeline".to_string()))?;
        let sink = pipeline
            .by_name("sink")
            .ok_or_else(|| fail("appsink missing".to_string()))?
            .dynamic_cast::<gstreamer_app::AppSink>()
            .map_err(|_| fail("sink is not an appsink".to_string()))?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| fail(e.to_string()))?;
        debug!("video pipeline playing for {}", path.display());

        Ok(Self {
            path,
            pipeline,
            sink,
        })
    }

    fn error(&self, message: impl Into<String>) -> SourceError {
        SourceError::Video {
            path: self.path.clone(),
            message: message.into(),
        }
    }

    fn to_rgb(&self, sample: &gstreamer::Sample) -> Result<RgbImage, SourceError> {
        let caps = sample.caps().ok_or_else(|| self.error("sample without caps"))?;
        let s = caps
            .structure(0)
            .ok_or_else(|| self.error("caps without structure"))?;
        let width = s
            .get::<i32>("width")
            .map_err(|e| self.error(e.to_string()))? as usize;
        let height = s
            .get::<i32>("height")
            .map_err(|e| self.error(e.to_string()))? as usize;

        let buffer = sample
            .buffer()
            .ok_or_else(|| self.error("sample without buffer"))?;
        let map = buffer
            .map_readable()
            .map_err(|e| self.error(e.to_string()))?;
        let data = map.as_slice();

        // RGB rows are padded to four bytes
        let stride = if height == 0 { 0 } else { data.len() / height };
        let row = 3 * width;
        if width == 0 || stride < row {
            return Err(self.error(format!("{width}x{height} frame in {} bytes", data.len())));
        }
        let mut packed = Vec::with_capacity(row * height);
        for r in 0..height {
            packed.extend_from_slice(&data[r * stride..r * stride + row]);
        }
        RgbImage::from_raw(width as u32, height as u32, packed)
            .ok_or_else(|| self.error("frame buffer size mismatch"))
    }
}

impl FrameSource for VideoFile {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        match self.sink.pull_sample() {
            Ok(sample) => self.to_rgb(&sample).map(Some),
            Err(_) if self.sink.is_eos() => Ok(None),
            Err(e) => Err(self.error(e.to_string())),
        }
    }
}

impl Drop for VideoFile {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gstreamer::State::Null);
    }
}
