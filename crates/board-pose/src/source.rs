//! Ordered frame sources.

use image::RgbImage;
use log::debug;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("input {0} does not exist")]
    NotFound(PathBuf),
    #[error("input {0} contains no frames")]
    Empty(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("unsupported input {0}: expected an image, a frame directory, a .txt list or a video")]
    Unsupported(PathBuf),
    #[error("{0} is a video but this build has no `video` feature; split it into frames")]
    VideoDisabled(PathBuf),
    #[error("video {path}: {message}")]
    Video { path: PathBuf, message: String },
}

/// Something that yields frames in order until it runs dry.
pub trait FrameSource {
    /// `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError>;
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "pgm", "ppm"];

const VIDEO_EXTENSIONS: &[&str] = &["avi", "mp4", "mov", "mkv", "webm", "m4v", "mpg", "mpeg"];

fn has_extension(path: &Path, set: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| set.contains(&e.to_ascii_lowercase().as_str()))
}

fn is_image_file(path: &Path) -> bool {
    path.is_file() && has_extension(path, IMAGE_EXTENSIONS)
}

/// `true` for paths whose extension names a video container.
pub fn is_video_path(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Open whatever `path` names: a video file (with the `video` feature) or
/// anything [`ImageSequence::open`] accepts.
pub fn open_source(path: impl AsRef<Path>) -> Result<Box<dyn FrameSource>, SourceError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }
    if path.is_file() && is_video_path(path) {
        #[cfg(feature = "video")]
        {
            return Ok(Box::new(crate::video::VideoFile::open(path)?));
        }
        #[cfg(not(feature = "video"))]
        {
            return Err(SourceError::VideoDisabled(path.to_path_buf()));
        }
    }
    Ok(Box::new(ImageSequence::open(path)?))
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SourceError + '_ {
    move |source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Frames decoded lazily from image files.
///
/// Accepts a directory (image files sorted by name), a single image, or a
/// `.txt` list with one path per line. Relative paths in a list resolve
/// against the list's directory; blank lines and `#` comments are ignored.
#[derive(Debug)]
pub struct ImageSequence {
    paths: VecDeque<PathBuf>,
}

impl ImageSequence {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }

        let paths = if path.is_dir() {
            Self::scan_dir(path)?
        } else if path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
        {
            Self::read_list(path)?
        } else if is_image_file(path) {
            vec![path.to_path_buf()]
        } else {
            return Err(SourceError::Unsupported(path.to_path_buf()));
        };

        if paths.is_empty() {
            return Err(SourceError::Empty(path.to_path_buf()));
        }
        debug!("{} frames queued from {}", paths.len(), path.display());
        Ok(Self {
            paths: paths.into(),
        })
    }

    fn scan_dir(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err(dir))? {
            let entry = entry.map_err(io_err(dir))?;
            let p = entry.path();
            if is_image_file(&p) {
                paths.push(p);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }

    fn read_list(list: &Path) -> Result<Vec<PathBuf>, SourceError> {
        let raw = fs::read_to_string(list).map_err(io_err(list))?;
        let base = list.parent().unwrap_or(Path::new(""));
        Ok(raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|l| {
                let p = Path::new(l);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    base.join(p)
                }
            })
            .collect())
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        let img = image::open(&path).map_err(|source| SourceError::Decode {
            path: path.clone(),
            source,
        })?;
        Ok(Some(img.to_rgb8()))
    }
}

/// Frames already held in memory.
#[derive(Debug, Default)]
pub struct InMemoryFrames {
    frames: VecDeque<RgbImage>,
}

impl InMemoryFrames {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for InMemoryFrames {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_frame(dir: &Path, name: &str, value: u8) -> PathBuf {
        let p = dir.join(name);
        RgbImage::from_pixel(8, 6, Rgb([value, value, value]))
            .save(&p)
            .expect("save");
        p
    }

    fn drain(mut src: impl FrameSource) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(f) = src.next_frame().expect("frame") {
            out.push(f.get_pixel(0, 0)[0]);
        }
        out
    }

    #[test]
    fn directory_is_sorted_by_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_frame(dir.path(), "frame_002.png", 20);
        write_frame(dir.path(), "frame_000.png", 0);
        write_frame(dir.path(), "frame_001.png", 10);
        fs::write(dir.path().join("notes.md"), "not a frame").expect("write");

        let seq = ImageSequence::open(dir.path()).expect("open");
        assert_eq!(drain(seq), vec![0, 10, 20]);
    }

    #[test]
    fn single_image_and_list_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = write_frame(dir.path(), "a.png", 40);
        write_frame(dir.path(), "b.png", 80);

        assert_eq!(drain(ImageSequence::open(&a).expect("open")), vec![40]);

        let list = dir.path().join("frames.txt");
        fs::write(&list, "# order matters\nb.png\n\na.png\n").expect("write");
        assert_eq!(drain(ImageSequence::open(&list).expect("open")), vec![80, 40]);
    }

    #[test]
    fn missing_and_empty_inputs_fail_at_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            ImageSequence::open(dir.path().join("nope")),
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(
            ImageSequence::open(dir.path()),
            Err(SourceError::Empty(_))
        ));
    }

    #[test]
    fn unknown_files_fail_at_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let clip = dir.path().join("clip.avi");
        fs::write(&clip, b"RIFF").expect("write");
        let notes = dir.path().join("notes.md");
        fs::write(&notes, "not a frame").expect("write");

        assert!(matches!(
            ImageSequence::open(&clip),
            Err(SourceError::Unsupported(_))
        ));
        assert!(matches!(
            ImageSequence::open(&notes),
            Err(SourceError::Unsupported(_))
        ));
        assert!(matches!(open_source(&notes), Err(SourceError::Unsupported(_))));
    }

    #[cfg(not(feature = "video"))]
    #[test]
    fn video_needs_the_video_feature() {
        let dir = tempfile::tempdir().expect("tempdir");
        let clip = dir.path().join("myvideo.AVI");
        fs::write(&clip, b"RIFF").expect("write");
        assert!(is_video_path(&clip));
        assert!(matches!(open_source(&clip), Err(SourceError::VideoDisabled(_))));
    }

    #[test]
    fn open_source_reads_frame_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_frame(dir.path(), "0.png", 7);
        let mut src = open_source(dir.path()).expect("open");
        assert_eq!(src.next_frame().expect("frame").map(|f| f.get_pixel(0, 0)[0]), Some(7));
        assert!(src.next_frame().expect("end").is_none());
    }

    #[test]
    fn undecodable_frame_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bad = dir.path().join("broken.png");
        fs::write(&bad, b"definitely not a png").expect("write");
        let mut seq = ImageSequence::open(&bad).expect("open");
        assert!(matches!(seq.next_frame(), Err(SourceError::Decode { .. })));
    }
}
