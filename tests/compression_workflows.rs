//! Integration tests for JPEG recompression workflows
//!
//! Everything here goes through the public API with in-memory images; no
//! fixtures on disk other than temporary files.

mod common;

use common::{encode_rgba, noisy_jpeg, pad_png_to, product_shot, solid_png};
use image::ImageFormat as CodecFormat;
use imgutil::{
    compress_bytes, error::Result, transcode, CompressionRequest, CompressionSession,
    DownloadName, EncodedImage, ImageFormat, ImageIOService, ImageProcessor, Quality,
    TransformConfig,
};
use tempfile::TempDir;

fn compress(bytes: Vec<u8>, quality: i64) -> Result<imgutil::CompressionResult> {
    transcode(&CompressionRequest::new(EncodedImage::sniff(bytes)?, quality)?)
}

#[test]
fn test_thousand_byte_source_reports_exact_original_size() -> Result<()> {
    let source = pad_png_to(solid_png(4, 4, [30, 60, 90, 255]), 1000);
    assert_eq!(source.len(), 1000);

    let result = compress(source, 10)?;
    assert_eq!(result.original_bytes, 1000);
    assert_eq!(result.compressed_bytes, result.encoded.byte_len() as u64);
    assert!(result.compressed_bytes > 0);
    Ok(())
}

#[test]
fn test_output_is_jpeg_with_source_dimensions() -> Result<()> {
    for (width, height) in [(1, 1), (17, 3), (64, 48)] {
        let source = encode_rgba(product_shot(width, height), CodecFormat::Png);
        let result = compress(source, 75)?;

        assert_eq!(result.encoded.format(), ImageFormat::Jpeg);
        assert_eq!(result.encoded.mime_type(), "image/jpeg");
        assert_eq!(result.dimensions, (width, height));

        let decoded = ImageIOService::decode(&result.encoded)?;
        assert_eq!(decoded.dimensions(), result.dimensions);
    }
    Ok(())
}

#[test]
fn test_lower_quality_gives_smaller_output_for_detailed_images() -> Result<()> {
    let source = noisy_jpeg(96, 96);
    let low = compress(source.clone(), 10)?;
    let high = compress(source, 95)?;

    assert!(low.compressed_bytes < high.compressed_bytes);
    assert_eq!(low.original_bytes, high.original_bytes);
    Ok(())
}

#[test]
fn test_compression_is_deterministic() -> Result<()> {
    let source = encode_rgba(product_shot(40, 30), CodecFormat::Png);
    let first = compress(source.clone(), 55)?;
    let second = compress(source, 55)?;
    assert_eq!(first.encoded, second.encoded);
    Ok(())
}

#[test]
fn test_session_ignores_previous_qualities() -> Result<()> {
    let source = EncodedImage::sniff(noisy_jpeg(48, 48))?;
    let session = CompressionSession::new(&source)?;

    for quality in [10, 90, 30, 1] {
        session.compress(Quality::new(quality)?)?;
    }
    let after_history = session.compress(Quality::new(70)?)?;
    let fresh = transcode(&CompressionRequest::new(source, 70)?)?;

    assert_eq!(after_history.encoded, fresh.encoded);
    assert_eq!(after_history.original_bytes, fresh.original_bytes);
    Ok(())
}

#[test]
fn test_transparent_pixels_flatten_to_black() -> Result<()> {
    let source = solid_png(16, 16, [255, 255, 255, 0]);
    let result = compress(source, 100)?;

    let decoded = ImageIOService::decode(&result.encoded)?;
    assert!(decoded
        .pixels()
        .all(|px| px[0] < 8 && px[1] < 8 && px[2] < 8 && px[3] == 255));
    Ok(())
}

#[test]
fn test_ratio_and_summary() -> Result<()> {
    let source = noisy_jpeg(64, 64);
    let result = compress(source, 5)?;

    let ratio = result.compression_ratio().unwrap_or_default();
    assert!(ratio > 0, "quality 5 should shrink a quality-75 noise image");
    assert!(result.size_summary().contains(&format!("{}%", ratio)));
    Ok(())
}

#[tokio::test]
async fn test_async_facade_matches_sync_core() -> Result<()> {
    let source = encode_rgba(product_shot(32, 32), CodecFormat::Png);
    let via_facade = compress_bytes(&source, 42).await?;
    let via_core = compress(source, 42)?;

    assert_eq!(via_facade.encoded, via_core.encoded);
    assert_eq!(via_facade.original_bytes, via_core.original_bytes);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() -> Result<()> {
    let processor = ImageProcessor::new(TransformConfig::default())?;
    let sources: Vec<Vec<u8>> = (1..=4)
        .map(|i| solid_png(8 * i, 8, [40 * i as u8, 0, 0, 255]))
        .collect();

    let handles: Vec<_> = sources
        .iter()
        .cloned()
        .map(|bytes| {
            let processor = processor.clone();
            tokio::spawn(async move { processor.compress_async(bytes).await })
        })
        .collect();

    for (handle, source) in handles.into_iter().zip(&sources) {
        let result = handle
            .await
            .map_err(|e| imgutil::ImageToolError::internal(e.to_string()))??;
        assert_eq!(result.original_bytes, source.len() as u64);
        assert_eq!(result.encoded, processor.compress(source)?.encoded);
    }
    Ok(())
}

#[test]
fn test_file_round_trip_with_download_name() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("upload.png");
    std::fs::write(&input, encode_rgba(product_shot(20, 20), CodecFormat::Png))?;

    let source = ImageIOService::load_encoded(&input)?;
    assert_eq!(source.format(), ImageFormat::Png);

    let result = transcode(&CompressionRequest::new(source, 80)?)?;
    let output = temp_dir.path().join("out").join(DownloadName::COMPRESSED);
    ImageIOService::save_encoded(&result.encoded, &output)?;

    let reloaded = ImageIOService::load_encoded(&output)?;
    assert_eq!(reloaded.format(), ImageFormat::Jpeg);
    assert_eq!(reloaded.byte_len() as u64, result.compressed_bytes);
    Ok(())
}
