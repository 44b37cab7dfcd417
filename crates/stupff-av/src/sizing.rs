//! Output size selection that preserves the source aspect ratio.

/// Width and height chosen by [`fit_dimensions`], unrounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedSize {
    pub width: f64,
    pub height: f64,
}

impl FittedSize {
    /// Round both dimensions to `digits` decimal places.
    pub fn rounded(self, digits: u32) -> Self {
        let scale = 10f64.powi(digits as i32);
        Self {
            width: (self.width * scale).round() / scale,
            height: (self.height * scale).round() / scale,
        }
    }

    /// Whole-pixel size, never below 1x1.
    pub fn to_pixels(self) -> (u32, u32) {
        (
            self.width.round().max(1.0) as u32,
            self.height.round().max(1.0) as u32,
        )
    }

    /// The `WxH` string ffmpeg expects for `-s`.
    pub fn to_size_arg(self) -> String {
        let (w, h) = self.to_pixels();
        format!("{}x{}", w, h)
    }
}

/// Ratio by which `source` must shrink to fit `bound`, or `None` when the
/// bound is unset (absent or zero) or not exceeded.
fn binding_ratio(source: u32, bound: Option<u32>) -> Option<f64> {
    match bound {
        Some(max) if max > 0 && source >= max => Some(source as f64 / max as f64),
        _ => None,
    }
}

/// Fit `width` x `height` inside the optional bounds, keeping the aspect ratio.
///
/// A bound only participates when the source reaches it. When both bind, the
/// larger shrink ratio wins; equal ratios resolve to the width bound. The
/// winning bound becomes its own output dimension verbatim.
///
/// ```
/// use stupff_av::fit_dimensions;
///
/// let size = fit_dimensions(800, 200, Some(400), Some(300));
/// assert_eq!((size.width, size.height), (400.0, 100.0));
/// ```
pub fn fit_dimensions(
    width: u32,
    height: u32,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> FittedSize {
    let width_ratio = binding_ratio(width, max_width);
    let height_ratio = binding_ratio(height, max_height);

    match (width_ratio, height_ratio) {
        (None, None) => FittedSize {
            width: width as f64,
            height: height as f64,
        },
        (Some(wr), Some(hr)) if hr > wr => FittedSize {
            width: width as f64 / hr,
            height: max_height.unwrap_or(height) as f64,
        },
        (None, Some(hr)) => FittedSize {
            width: width as f64 / hr,
            height: max_height.unwrap_or(height) as f64,
        },
        (Some(wr), _) => FittedSize {
            width: max_width.unwrap_or(width) as f64,
            height: height as f64 / wr,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(size: (u32, u32), max: (u32, u32), digits: u32) -> (f64, f64) {
        let fitted = fit_dimensions(size.0, size.1, Some(max.0), Some(max.1)).rounded(digits);
        (fitted.width, fitted.height)
    }

    fn round(v: f64, digits: u32) -> f64 {
        let scale = 10f64.powi(digits as i32);
        (v * scale).round() / scale
    }

    #[test]
    fn test_autosize_table() {
        let cases = [
            ((400, 300), (400, 300), (400.0, 300.0)),
            ((360, 150), (40, 999), (40.0, 16.666_666)),
            ((800, 200), (400, 300), (400.0, 100.0)),
            ((10, 1000), (1000, 10), (0.1, 10.0)),
            ((100, 100), (20, 5000), (20.0, 20.0)),
        ];
        for digits in 1..=3 {
            for (size, max, expected) in cases {
                assert_eq!(
                    fit(size, max, digits),
                    (round(expected.0, digits), round(expected.1, digits)),
                    "size {:?} max {:?} digits {}",
                    size,
                    max,
                    digits
                );
            }
        }
    }

    #[test]
    fn test_no_bounds_is_noop() {
        let size = fit_dimensions(1920, 1080, None, None);
        assert_eq!((size.width, size.height), (1920.0, 1080.0));

        let size = fit_dimensions(1920, 1080, Some(0), Some(0));
        assert_eq!((size.width, size.height), (1920.0, 1080.0));
    }

    #[test]
    fn test_bounds_above_source_is_noop() {
        let size = fit_dimensions(640, 480, Some(1280), Some(720));
        assert_eq!((size.width, size.height), (640.0, 480.0));
    }

    #[test]
    fn test_aspect_ratio_preserved() {
        for (w, h, mw, mh) in [(1920, 1080, 640, 640), (720, 1280, 500, 400), (333, 111, 100, 1)] {
            let size = fit_dimensions(w, h, Some(mw), Some(mh));
            assert!(size.width <= mw as f64 + 1e-9);
            assert!(size.height <= mh as f64 + 1e-9);
            let expected = w as f64 / h as f64;
            assert!((size.width / size.height - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_to_size_arg() {
        let size = fit_dimensions(360, 150, Some(40), None);
        assert_eq!(size.to_size_arg(), "40x17");

        let size = fit_dimensions(10, 1000, None, Some(10));
        assert_eq!(size.to_pixels(), (1, 10));
    }
}
