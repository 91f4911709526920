//! Frame sources
//!
//! A worker owns exactly one capture source, opened at worker start from a
//! shared backend. Real captures come from the screen (feature `capture`);
//! frame sequences and scripted sources exist for offline runs and tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use image::GrayImage;

use crate::config::Region;

/// Produces one grayscale frame per call.
///
/// Capture failures are per-tick events for the caller to log and skip;
/// they must never be treated as fatal by a source.
pub trait CaptureSource: Send {
    fn capture(&mut self) -> anyhow::Result<GrayImage>;
}

/// Opens capture sources for workers; shared across the coordinator.
pub trait CaptureBackend: Send + Sync {
    fn open_region(&self, region: Region) -> anyhow::Result<Box<dyn CaptureSource>>;
}

/// Replays a fixed list of capture outcomes, then fails.
///
/// Used as a deterministic source in tests; as a backend it hands every
/// worker its own fresh copy of the script.
#[derive(Clone, Default)]
pub struct ScriptedCapture {
    frames: VecDeque<Result<GrayImage, String>>,
}

impl ScriptedCapture {
    pub fn new(frames: Vec<Result<GrayImage, String>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl CaptureSource for ScriptedCapture {
    fn capture(&mut self) -> anyhow::Result<GrayImage> {
        match self.frames.pop_front() {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(message)) => anyhow::bail!(message),
            None => anyhow::bail!("frame script exhausted"),
        }
    }
}

impl CaptureBackend for ScriptedCapture {
    fn open_region(&self, _region: Region) -> anyhow::Result<Box<dyn CaptureSource>> {
        Ok(Box::new(self.clone()))
    }
}

/// Always returns the same frame
#[derive(Clone)]
pub struct StaticCapture {
    frame: GrayImage,
}

impl StaticCapture {
    pub fn new(frame: GrayImage) -> Self {
        Self { frame }
    }
}

impl CaptureSource for StaticCapture {
    fn capture(&mut self) -> anyhow::Result<GrayImage> {
        Ok(self.frame.clone())
    }
}

impl CaptureBackend for StaticCapture {
    fn open_region(&self, _region: Region) -> anyhow::Result<Box<dyn CaptureSource>> {
        Ok(Box::new(self.clone()))
    }
}

/// Plays back a directory of image files in filename order.
///
/// Lets a detection setup be exercised against recorded frames instead of a
/// live screen.
pub struct FrameSequenceCapture {
    frames: Vec<PathBuf>,
    index: usize,
    loop_playback: bool,
}

impl FrameSequenceCapture {
    pub fn from_directory(dir: &Path, loop_playback: bool) -> anyhow::Result<Self> {
        let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("png") | Some("jpg") | Some("jpeg") | Some("bmp")
                )
            })
            .collect();
        frames.sort();

        if frames.is_empty() {
            anyhow::bail!("no image files in {}", dir.display());
        }

        log::info!(
            "frame sequence loaded: {} frames from {}",
            frames.len(),
            dir.display()
        );

        Ok(Self {
            frames,
            index: 0,
            loop_playback,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl CaptureSource for FrameSequenceCapture {
    fn capture(&mut self) -> anyhow::Result<GrayImage> {
        if self.index >= self.frames.len() {
            if self.loop_playback {
                self.index = 0;
            } else {
                anyhow::bail!("frame sequence ended");
            }
        }

        let path = &self.frames[self.index];
        self.index += 1;

        let image = image::open(path)
            .map_err(|e| anyhow::anyhow!("failed to decode {}: {e}", path.display()))?;
        Ok(image.to_luma8())
    }
}

#[cfg(feature = "capture")]
mod screen {
    use super::*;
    use xcap::Monitor;

    /// Captures a fixed screen rectangle from the monitor that contains it
    pub struct ScreenRegionCapture {
        region: Region,
    }

    impl ScreenRegionCapture {
        pub fn open(region: Region) -> anyhow::Result<Self> {
            // Fail fast if no monitor covers the region origin
            find_monitor(&region)?;
            Ok(Self { region })
        }
    }

    fn find_monitor(region: &Region) -> anyhow::Result<Monitor> {
        let monitors =
            Monitor::all().map_err(|e| anyhow::anyhow!("monitor enumeration failed: {e}"))?;
        monitors
            .into_iter()
            .find(|m| {
                region.left >= m.x()
                    && region.left < m.x() + m.width() as i32
                    && region.top >= m.y()
                    && region.top < m.y() + m.height() as i32
            })
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no monitor contains region origin ({}, {})",
                    region.left,
                    region.top
                )
            })
    }

    impl CaptureSource for ScreenRegionCapture {
        fn capture(&mut self) -> anyhow::Result<GrayImage> {
            let monitor = find_monitor(&self.region)?;
            let shot = monitor
                .capture_image()
                .map_err(|e| anyhow::anyhow!("screen capture failed: {e}"))?;

            let rel_x = (self.region.left - monitor.x()) as u32;
            let rel_y = (self.region.top - monitor.y()) as u32;
            if rel_x >= shot.width() || rel_y >= shot.height() {
                anyhow::bail!("capture region lies outside the monitor image");
            }

            let width = self.region.width().min(shot.width() - rel_x);
            let height = self.region.height().min(shot.height() - rel_y);
            let cropped = image::imageops::crop_imm(&shot, rel_x, rel_y, width, height).to_image();
            Ok(image::DynamicImage::ImageRgba8(cropped).to_luma8())
        }
    }

    /// Backend that opens one screen region source per worker
    pub struct ScreenCaptureBackend;

    impl CaptureBackend for ScreenCaptureBackend {
        fn open_region(&self, region: Region) -> anyhow::Result<Box<dyn CaptureSource>> {
            Ok(Box::new(ScreenRegionCapture::open(region)?))
        }
    }
}

#[cfg(feature = "capture")]
pub use screen::{ScreenCaptureBackend, ScreenRegionCapture};
