//! Background keyer: make every pixel close to the top-left color transparent
//!
//! The reference color is always the RGB of pixel 0. Distance is the
//! Manhattan sum `|ΔR| + |ΔG| + |ΔB|`; alpha takes no part in it. A pixel is
//! keyed when the distance is strictly below the tolerance, wherever it sits
//! in the image: there is no flood fill and no connectivity test, so
//! foreground pixels that share the background color go transparent too.

use crate::{
    config::Tolerance,
    encoders::{PngEncoder, RasterEncoder},
    error::{ImageToolError, Result},
    services::ImageIOService,
    types::{KeyingRequest, KeyingResult, RasterImage, Rgb, CHANNELS},
};
use tracing::{debug, instrument};

/// Decode the source, key it against its top-left color, and re-encode as PNG
///
/// # Errors
/// - `Decode` when the source is not a decodable image
/// - `Encode` when the PNG backend fails or yields no data
#[instrument(skip(request), fields(tolerance = %request.tolerance, source_bytes = request.source.byte_len()))]
pub fn remove_background(request: &KeyingRequest) -> Result<KeyingResult> {
    let raster = ImageIOService::decode(&request.source)?;
    key_raster(raster, request.tolerance)
}

/// Key an already-decoded raster and encode the result as PNG
///
/// Takes ownership: the alpha edits happen on this call's own buffer.
///
/// # Errors
/// - `Encode` when the PNG backend fails or yields no data
pub fn key_raster(mut raster: RasterImage, tolerance: Tolerance) -> Result<KeyingResult> {
    let (reference_color, keyed_pixels) = key_in_place(&mut raster, tolerance)?;
    let encoded = PngEncoder.encode(&raster)?;
    Ok(KeyingResult {
        image: raster,
        reference_color,
        encoded,
        keyed_pixels,
    })
}

/// Sample the reference color from pixel 0
///
/// # Errors
/// - `Internal` if the raster is empty, which `RasterImage` construction forbids
pub fn reference_color(raster: &RasterImage) -> Result<Rgb> {
    let [r, g, b, _] = raster
        .pixel(0)
        .ok_or_else(|| ImageToolError::internal("Raster has no pixels to sample"))?;
    Ok(Rgb::new(r, g, b))
}

/// Whether a pixel with color `color` is keyed against `reference`
#[must_use]
pub fn is_keyed(color: Rgb, reference: Rgb, tolerance: Tolerance) -> bool {
    color.manhattan_distance(reference) < tolerance.get()
}

/// Zero alpha for every pixel within `tolerance` of pixel 0's color
///
/// Returns the reference color and the number of pixels whose alpha changed
/// from non-zero to zero.
fn key_in_place(raster: &mut RasterImage, tolerance: Tolerance) -> Result<(Rgb, usize)> {
    let reference = reference_color(raster)?;
    let mut keyed = 0usize;

    for px in raster.pixels_mut().chunks_exact_mut(CHANNELS) {
        if let [r, g, b, a] = px {
            if is_keyed(Rgb::new(*r, *g, *b), reference, tolerance) {
                if *a != 0 {
                    keyed += 1;
                }
                *a = 0;
            }
        }
    }

    debug!(
        reference = %reference,
        keyed,
        total = raster.pixel_count(),
        "Keying pass complete"
    );
    Ok((reference, keyed))
}

/// Raster indices that keying `raster` at `tolerance` would make transparent
///
/// Pure query; nothing is modified. Includes pixels that are already
/// transparent but match the reference.
#[must_use]
pub fn keyed_indices(raster: &RasterImage, tolerance: Tolerance) -> Vec<usize> {
    let Ok(reference) = reference_color(raster) else {
        return Vec::new();
    };
    raster
        .pixels()
        .enumerate()
        .filter_map(|(i, px)| match *px {
            [r, g, b, _] if is_keyed(Rgb::new(r, g, b), reference, tolerance) => Some(i),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Alpha channel offset within an RGBA quadruple
    const ALPHA: usize = 3;
    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn raster_from(pixels: &[[u8; 4]], width: u32, height: u32) -> RasterImage {
        RasterImage::new(width, height, pixels.concat()).unwrap()
    }

    fn tol(value: i64) -> Tolerance {
        Tolerance::new(value).unwrap()
    }

    #[test]
    fn test_all_red_is_fully_keyed() {
        let raster = raster_from(&[RED; 4], 2, 2);
        let result = key_raster(raster, tol(10)).unwrap();

        assert_eq!(result.reference_color, Rgb::new(255, 0, 0));
        assert!(result.image.pixels().all(|px| px.get(ALPHA) == Some(&0)));
        assert_eq!(result.keyed_pixel_count(), 4);
        assert!((result.transparent_fraction() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_red_corner_with_blue_pixels() {
        let raster = raster_from(&[RED, BLUE, BLUE, BLUE], 2, 2);
        let result = key_raster(raster, tol(50)).unwrap();

        assert_eq!(result.image.pixel(0), Some([255, 0, 0, 0]));
        for i in 1..4 {
            assert_eq!(result.image.pixel(i), Some(BLUE));
        }
        assert_eq!(result.image.transparent_indices(), vec![0]);
    }

    #[test]
    fn test_threshold_is_strict() {
        // distance exactly 30
        let near = [245, 10, 10, 255];
        let raster = raster_from(&[RED, near], 2, 1);

        let at_threshold = key_raster(raster.clone(), tol(30)).unwrap();
        assert_eq!(at_threshold.image.pixel(1), Some(near));

        let above_threshold = key_raster(raster, tol(31)).unwrap();
        assert_eq!(above_threshold.image.pixel(1), Some([245, 10, 10, 0]));
    }

    #[test]
    fn test_zero_tolerance_keys_nothing() {
        let raster = raster_from(&[RED; 4], 2, 2);
        let result = key_raster(raster.clone(), tol(0)).unwrap();
        assert_eq!(result.image, raster);
        assert_eq!(result.keyed_pixel_count(), 0);
    }

    #[test]
    fn test_interior_pixels_matching_background_are_keyed() {
        // 3x3 white frame around a black center, with a white pixel inside
        // the subject's row: no connectivity check, so it is keyed too.
        let w = [255, 255, 255, 255];
        let k = [0, 0, 0, 255];
        let raster = raster_from(&[w, w, w, w, k, w, w, w, w], 3, 3);
        let result = key_raster(raster, tol(50)).unwrap();
        assert_eq!(result.image.pixel(4), Some(k));
        assert_eq!(result.image.transparent_indices().len(), 8);
    }

    #[test]
    fn test_alpha_is_ignored_for_distance_and_rgb_untouched() {
        let translucent_red = [255, 0, 0, 40];
        let raster = raster_from(&[RED, translucent_red], 2, 1);
        let result = key_raster(raster, tol(1)).unwrap();
        assert_eq!(result.image.pixel(1), Some([255, 0, 0, 0]));
    }

    #[test]
    fn test_keyed_indices_matches_keying() {
        let raster = raster_from(&[RED, BLUE, [250, 5, 0, 255], BLUE], 2, 2);
        let indices = keyed_indices(&raster, tol(50));
        assert_eq!(indices, vec![0, 2]);

        let result = key_raster(raster, tol(50)).unwrap();
        assert_eq!(result.image.transparent_indices(), indices);
    }

    #[test]
    fn test_output_is_png() {
        let raster = raster_from(&[RED, BLUE], 2, 1);
        let result = key_raster(raster, tol(50)).unwrap();
        assert_eq!(result.encoded.mime_type(), "image/png");
        let decoded = ImageIOService::decode(&result.encoded).unwrap();
        assert_eq!(decoded, result.image);
    }
}
