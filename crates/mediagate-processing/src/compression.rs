use anyhow::{Context, Result};
use mediagate_core::constants::COMPRESSIBLE_IMAGE_EXTENSIONS;
use std::path::{Path, PathBuf};

/// Pick a JPEG quality from the source size in megabytes.
///
/// Step function: bigger sources get squeezed harder so the stored object
/// stays within a predictable band.
pub fn quality_for_size(size_mb: f64) -> u8 {
    if size_mb <= 5.0 {
        75
    } else if size_mb <= 7.0 {
        60
    } else if size_mb <= 10.0 {
        45
    } else {
        25
    }
}

/// Whether a file extension goes through the compression pipeline.
pub fn is_compressible_extension(ext: &str) -> bool {
    let ext = ext.to_lowercase();
    COMPRESSIBLE_IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// Re-encode an image to JPEG at the given quality.
///
/// The source is decoded regardless of its original format; lossless inputs
/// (PNG) are re-encoded lossily. Output is progressive with optimized coding
/// and 4:4:4 chroma; mozjpeg's encoder defaults keep trellis quantization and
/// overshoot deringing enabled.
pub fn compress_jpeg(data: &[u8], quality: u8) -> Result<Vec<u8>> {
    let img = image::load_from_memory(data).context("Failed to decode source image")?;
    let rgb_img = img.to_rgb8();
    let (width, height) = rgb_img.dimensions();

    let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
    comp.set_size(width as usize, height as usize);
    comp.set_quality(quality as f32);
    comp.set_progressive_mode();
    comp.set_optimize_coding(true);
    // Full-fidelity chroma: no subsampling.
    comp.set_chroma_sampling_pixel_sizes((1, 1), (1, 1));

    let mut comp = comp.start_compress(Vec::new())?;
    comp.write_scanlines(&rgb_img)?;
    let jpeg_data = comp.finish()?;

    Ok(jpeg_data)
}

/// Re-encode `data` at the quality chosen for `size_mb` and write the result
/// to `destination`. Returns the destination path.
///
/// Encoding is CPU-bound and runs on the blocking pool; the caller awaits
/// completion before storing.
pub async fn compress_to_file(data: Vec<u8>, size_mb: f64, destination: &Path) -> Result<PathBuf> {
    let quality = quality_for_size(size_mb);
    let source_len = data.len();

    let encoded = tokio::task::spawn_blocking(move || compress_jpeg(&data, quality))
        .await
        .context("Compression task panicked")??;

    tracing::debug!(
        quality = quality,
        source_bytes = source_len,
        encoded_bytes = encoded.len(),
        destination = %destination.display(),
        "Image re-encoded"
    );

    tokio::fs::write(destination, encoded)
        .await
        .context("Failed to write compressed image")?;

    Ok(destination.to_path_buf())
}
