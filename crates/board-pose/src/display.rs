//! Frame sinks and key input for the interactive loop.

use image::RgbImage;
use log::debug;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum DisplayError {
    #[error("failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// A key press as seen by the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Esc,
    Space,
    Other(u32),
}

/// Where annotated frames go and where key presses come from.
pub trait Display {
    fn show(&mut self, title: &str, frame: &RgbImage) -> Result<(), DisplayError>;

    /// Wait up to `delay_ms` for a key; `None` waits indefinitely.
    /// Returns `None` when no key was pressed.
    fn wait_key(&mut self, delay_ms: Option<u64>) -> Result<Option<Key>, DisplayError>;
}

/// Writes every shown frame as `frame_NNNNNN.png` into a directory.
///
/// Never produces key presses, so the loop runs until the source ends.
#[derive(Debug)]
pub struct FrameDumpDisplay {
    dir: PathBuf,
    written: usize,
}

impl FrameDumpDisplay {
    /// Create the output directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, DisplayError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| DisplayError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir, written: 0 })
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }
}

impl Display for FrameDumpDisplay {
    fn show(&mut self, title: &str, frame: &RgbImage) -> Result<(), DisplayError> {
        let path = self.frame_path(self.written);
        frame.save(&path).map_err(|source| DisplayError::Encode {
            path: path.clone(),
            source,
        })?;
        debug!("{title}: wrote {}", path.display());
        self.written += 1;
        Ok(())
    }

    fn wait_key(&mut self, _delay_ms: Option<u64>) -> Result<Option<Key>, DisplayError> {
        Ok(None)
    }
}

/// Replays a fixed key script and records what the loop did.
///
/// Each `wait_key` consumes one script entry; an exhausted script answers
/// "no key".
#[derive(Debug, Default)]
pub struct ScriptedDisplay {
    script: VecDeque<Option<Key>>,
    /// Titles and frames in the order they were shown.
    pub shown: Vec<(String, RgbImage)>,
    /// Delay argument of every `wait_key` call.
    pub waits: Vec<Option<u64>>,
}

impl ScriptedDisplay {
    pub fn new(script: impl IntoIterator<Item = Option<Key>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Display for ScriptedDisplay {
    fn show(&mut self, title: &str, frame: &RgbImage) -> Result<(), DisplayError> {
        self.shown.push((title.to_string(), frame.clone()));
        Ok(())
    }

    fn wait_key(&mut self, delay_ms: Option<u64>) -> Result<Option<Key>, DisplayError> {
        self.waits.push(delay_ms);
        Ok(self.script.pop_front().flatten())
    }
}
