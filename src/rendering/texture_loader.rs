//! Decodes image files on a worker thread so the first frames never wait on disk.
//!
//! Results are drained with [`TextureLoader::poll`] once per frame; uploading them to the
//! GPU is left to the caller.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::Context;

pub type TextureRequestId = usize;

/// Tightly packed RGBA8 pixels, rows top to bottom.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub struct LoadedTexture {
    pub id: TextureRequestId,
    pub path: PathBuf,
    pub result: anyhow::Result<DecodedImage>,
}

/// Largest size with the same aspect ratio whose sides are at most `max_dimension`.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }

    let scale = max_dimension as f64 / longest as f64;
    let fit = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_dimension);
    (fit(width), fit(height))
}

/// Decodes to RGBA8, downscaling images the GPU can't hold.
pub fn decode_image(path: &Path, max_dimension: u32) -> anyhow::Result<DecodedImage> {
    let mut image = image::open(path)
        .with_context(|| format!("Failed to load texture {}", path.display()))?
        .to_rgba8();

    let (width, height) = fit_within(image.width(), image.height(), max_dimension);
    if (width, height) != image.dimensions() {
        log::warn!(
            "Texture {} is {}x{}, downscaling to {}x{}",
            path.display(),
            image.width(),
            image.height(),
            width,
            height
        );
        image = image::imageops::resize(&image, width, height, image::imageops::FilterType::Triangle);
    }

    Ok(DecodedImage {
        width: image.width(),
        height: image.height(),
        pixels: image.into_raw(),
    })
}

pub struct TextureLoader {
    requests: Sender<(TextureRequestId, PathBuf)>,
    results: Receiver<LoadedTexture>,
    next_id: TextureRequestId,
    in_flight: usize,
}

impl TextureLoader {
    pub fn new(max_dimension: u32) -> anyhow::Result<Self> {
        let (requests, pending) = mpsc::channel::<(TextureRequestId, PathBuf)>();
        let (send_results, results) = mpsc::channel();

        // Exits once the loader (and with it the request sender) is dropped
        thread::Builder::new()
            .name("texture-loader".to_string())
            .spawn(move || {
                for (id, path) in pending {
                    let result = decode_image(&path, max_dimension);
                    if send_results.send(LoadedTexture { id, path, result }).is_err() {
                        break;
                    }
                }
            })
            .context("Failed to spawn texture loader thread")?;

        Ok(Self {
            requests,
            results,
            next_id: 0,
            in_flight: 0,
        })
    }

    pub fn request(&mut self, path: impl Into<PathBuf>) -> TextureRequestId {
        let id = self.next_id;
        self.next_id += 1;

        let path = path.into();
        log::debug!("Requesting texture {}", path.display());

        match self.requests.send((id, path)) {
            Ok(()) => self.in_flight += 1,
            Err(mpsc::SendError((_, path))) => {
                log::warn!("Texture loader is gone, {} will not load", path.display())
            }
        }

        id
    }

    /// Returns every texture finished since the last call, without blocking.
    pub fn poll(&mut self) -> Vec<LoadedTexture> {
        let loaded: Vec<_> = self.results.try_iter().collect();
        self.in_flight -= loaded.len();
        loaded
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("orrery-{}-{}", std::process::id(), name))
    }

    fn wait_for_all(loader: &mut TextureLoader) -> Vec<LoadedTexture> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut loaded = Vec::new();

        while loader.in_flight() > 0 && Instant::now() < deadline {
            loaded.extend(loader.poll());
            thread::sleep(Duration::from_millis(5));
        }

        loaded
    }

    #[test]
    fn decodes_to_rgba() {
        let path = temp_path("decode.png");
        image::RgbImage::from_pixel(2, 3, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let decoded = decode_image(&path, 8192).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!((decoded.width, decoded.height), (2, 3));
        assert_eq!(decoded.pixels.len(), 2 * 3 * 4);
        assert_eq!(&decoded.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let error = decode_image(&temp_path("does-not-exist.jpg"), 8192).unwrap_err();

        assert!(error.to_string().contains("does-not-exist.jpg"));
    }

    #[test]
    fn worker_reports_successes_and_failures() {
        let good = temp_path("worker.png");
        image::RgbaImage::new(4, 4).save(&good).unwrap();

        let mut loader = TextureLoader::new(8192).unwrap();
        let good_id = loader.request(&good);
        let bad_id = loader.request(temp_path("worker-missing.png"));
        assert_ne!(good_id, bad_id);

        let mut loaded = wait_for_all(&mut loader);
        std::fs::remove_file(&good).ok();
        loaded.sort_by_key(|texture| texture.id);

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, good_id);
        assert_eq!(loaded[0].result.as_ref().unwrap().width, 4);
        assert_eq!(loaded[1].id, bad_id);
        assert!(loaded[1].result.is_err());
        assert_eq!(loader.in_flight(), 0);
    }

    #[test]
    fn small_images_keep_their_size() {
        assert_eq!(fit_within(4096, 2048, 8192), (4096, 2048));
        assert_eq!(fit_within(8192, 8192, 8192), (8192, 8192));
    }

    #[test]
    fn oversized_images_fit_the_limit() {
        assert_eq!(fit_within(10800, 5400, 8192), (8192, 4096));
        assert_eq!(fit_within(100, 20000, 8192), (41, 8192));
        assert_eq!(fit_within(20000, 1, 8192), (8192, 1));
    }

    #[test]
    fn decoding_downscales_past_the_limit() {
        let path = temp_path("oversized.png");
        image::RgbaImage::new(64, 32).save(&path).unwrap();

        let decoded = decode_image(&path, 16).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!((decoded.width, decoded.height), (16, 8));
        assert_eq!(decoded.pixels.len(), 16 * 8 * 4);
    }
}
