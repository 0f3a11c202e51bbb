//! In-process backends and fixtures for tests

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use ndarray::{Array4, Axis};
use parking_lot::Mutex;

use super::classifier::InferenceBackend;
use super::registry::{ArchitectureKind, ModelConfig};

pub fn model_config(id: &str, labels: &[&str], size: u32) -> ModelConfig {
    ModelConfig {
        id: None,
        display_name: id.to_string(),
        class_labels: labels.iter().map(|s| s.to_string()).collect(),
        input_image_size: size,
        architecture: ArchitectureKind::Resnet34,
        weight_file: format!("{id}-stage-2"),
        apply_softmax: true,
    }
}

/// Returns the same output for every input
pub struct FixedBackend {
    output: Vec<f32>,
    seen: Arc<Mutex<Vec<Vec<usize>>>>,
}

impl FixedBackend {
    pub fn new(output: Vec<f32>) -> Self {
        Self {
            output,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shapes of every tensor passed to `infer`
    pub fn seen_shapes(&self) -> Arc<Mutex<Vec<Vec<usize>>>> {
        self.seen.clone()
    }
}

impl InferenceBackend for FixedBackend {
    fn infer(&self, input: &Array4<f32>) -> anyhow::Result<Vec<f32>> {
        self.seen.lock().push(input.shape().to_vec());
        Ok(self.output.clone())
    }
}

/// Always fails
pub struct FailingBackend;

impl InferenceBackend for FailingBackend {
    fn infer(&self, _input: &Array4<f32>) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("device lost")
    }
}

/// Scores class `i` by the mean of channel `i % 3`, so the output depends
/// only on the image content
pub struct ChannelMeanBackend {
    classes: usize,
}

impl ChannelMeanBackend {
    pub fn new(classes: usize) -> Self {
        Self { classes }
    }
}

impl InferenceBackend for ChannelMeanBackend {
    fn infer(&self, input: &Array4<f32>) -> anyhow::Result<Vec<f32>> {
        let means: Vec<f32> = input
            .index_axis(Axis(0), 0)
            .axis_iter(Axis(0))
            .map(|channel| channel.mean().unwrap_or(0.0))
            .collect();
        Ok((0..self.classes).map(|i| means[i % means.len()]).collect())
    }
}

/// Blocks for `delay` on every call and records how many calls overlapped
pub struct SleepingBackend {
    delay: Duration,
    output: Vec<f32>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl SleepingBackend {
    pub fn new(delay: Duration, output: Vec<f32>) -> Self {
        Self {
            delay,
            output,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Highest number of calls in flight at once
    pub fn peak(&self) -> Arc<AtomicUsize> {
        self.peak.clone()
    }
}

impl InferenceBackend for SleepingBackend {
    fn infer(&self, _input: &Array4<f32>) -> anyhow::Result<Vec<f32>> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

pub fn solid_image(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb(color)))
}

pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    solid_image(width, height, color)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}
