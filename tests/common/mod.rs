//! Shared image builders for integration tests
#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;

/// Encode an RGBA buffer with the `image` crate directly, independent of imgutil's encoders
pub fn encode_rgba(image: RgbaImage, format: ImageFormat) -> Vec<u8> {
    let dynamic = match format {
        // JPEG has no alpha channel
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image).to_rgb8()),
        _ => DynamicImage::ImageRgba8(image),
    };
    let mut buffer = Vec::new();
    dynamic
        .write_to(&mut Cursor::new(&mut buffer), format)
        .expect("test image should encode");
    buffer
}

/// Solid-color PNG
pub fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    encode_rgba(
        RgbaImage::from_pixel(width, height, image::Rgba(rgba)),
        ImageFormat::Png,
    )
}

/// 2×2 PNG from four RGBA pixels in row-major order
pub fn quad_png(pixels: [[u8; 4]; 4]) -> Vec<u8> {
    let mut image = RgbaImage::new(2, 2);
    for (index, rgba) in pixels.iter().enumerate() {
        image.put_pixel((index % 2) as u32, (index / 2) as u32, image::Rgba(*rgba));
    }
    encode_rgba(image, ImageFormat::Png)
}

/// White backdrop with a centered red square and a gray gradient ramp in the bottom row
pub fn product_shot(width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
    let (x0, x1) = (width / 3, width * 2 / 3);
    let (y0, y1) = (height / 3, height * 2 / 3);
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x, y, image::Rgba([220, 30, 30, 255]));
        }
    }
    for x in 0..width {
        let level = (255 - (x * 255 / width.max(1))) as u8;
        image.put_pixel(x, height - 1, image::Rgba([level, level, level, 255]));
    }
    image
}

/// Noisy RGB photo-like image, so that JPEG quality visibly changes output size
pub fn noisy_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut image = RgbImage::new(width, height);
    let mut state: u32 = 0x1234_5678;
    for pixel in image.pixels_mut() {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let [a, b, c, _] = state.to_le_bytes();
        *pixel = image::Rgb([a, b, c]);
    }
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
        .expect("test image should encode");
    buffer
}

/// Pad a PNG to exactly `target_len` bytes with a valid `tEXt` chunk before `IEND`
pub fn pad_png_to(png: Vec<u8>, target_len: usize) -> Vec<u8> {
    const CHUNK_OVERHEAD: usize = 12;
    const KEYWORD: &[u8] = b"Comment\0";
    let iend_start = png.len() - CHUNK_OVERHEAD;
    let fill = target_len
        .checked_sub(png.len() + CHUNK_OVERHEAD + KEYWORD.len())
        .expect("target length leaves room for a text chunk");

    let mut body = b"tEXt".to_vec();
    body.extend_from_slice(KEYWORD);
    body.extend(std::iter::repeat(b'x').take(fill));

    let mut out = png[..iend_start].to_vec();
    out.extend_from_slice(&((body.len() - 4) as u32).to_be_bytes());
    out.extend_from_slice(&body);
    out.extend_from_slice(&crc32fast::hash(&body).to_be_bytes());
    out.extend_from_slice(&png[iend_start..]);
    assert_eq!(out.len(), target_len);
    out
}
