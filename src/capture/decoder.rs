//! Barcode decoding on grayscale frames.

use image::GrayImage;

/// Axis-aligned box around a symbol, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Smallest box containing all `points`, clamped to non-negative pixels.
    pub fn from_points(points: impl IntoIterator<Item = (f32, f32)>) -> Option<Self> {
        let mut min = (f32::MAX, f32::MAX);
        let mut max = (f32::MIN, f32::MIN);
        let mut any = false;
        for (x, y) in points {
            any = true;
            min = (min.0.min(x), min.1.min(y));
            max = (max.0.max(x), max.1.max(y));
        }
        if !any {
            return None;
        }
        let x = min.0.max(0.0) as u32;
        let y = min.1.max(0.0) as u32;
        Some(Self {
            x,
            y,
            width: (max.0.max(0.0) as u32).saturating_sub(x).max(1),
            height: (max.1.max(0.0) as u32).saturating_sub(y).max(1),
        })
    }
}

/// One decoded barcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub value: String,
    pub bounds: Option<BoundingBox>,
}

impl Symbol {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            bounds: None,
        }
    }
}

pub trait BarcodeDecoder {
    /// Every symbol visible in the frame; empty when there is none.
    fn decode(&mut self, frame: &GrayImage) -> Vec<Symbol>;
}

/// Decoder used when the build has no barcode backend.
pub struct NullDecoder;

impl BarcodeDecoder for NullDecoder {
    fn decode(&mut self, _frame: &GrayImage) -> Vec<Symbol> {
        Vec::new()
    }
}

#[cfg(feature = "barcode")]
pub struct RxingDecoder;

#[cfg(feature = "barcode")]
impl BarcodeDecoder for RxingDecoder {
    fn decode(&mut self, frame: &GrayImage) -> Vec<Symbol> {
        let (width, height) = frame.dimensions();
        // NotFound is the usual outcome for an empty frame.
        match rxing::helpers::detect_multiple_in_luma(frame.as_raw().clone(), width, height) {
            Ok(results) => results
                .iter()
                .map(|result| Symbol {
                    value: result.getText().to_string(),
                    bounds: BoundingBox::from_points(result.getPoints().iter().map(|p| (p.x, p.y))),
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// The best decoder this build has.
pub fn default_decoder() -> Box<dyn BarcodeDecoder> {
    #[cfg(feature = "barcode")]
    {
        Box::new(RxingDecoder)
    }
    #[cfg(not(feature = "barcode"))]
    {
        tracing::warn!("Built without the `barcode` feature; frames will not be decoded");
        Box::new(NullDecoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_from_corner_points() {
        let bounds =
            BoundingBox::from_points([(10.5, 20.0), (110.0, 22.0), (108.0, 60.0), (12.0, 58.9)])
                .unwrap();
        assert_eq!(
            bounds,
            BoundingBox {
                x: 10,
                y: 20,
                width: 100,
                height: 40
            }
        );
    }

    #[test]
    fn test_bounding_box_degenerate_inputs() {
        assert_eq!(BoundingBox::from_points(Vec::new()), None);

        // Points outside the frame are clamped
        let bounds = BoundingBox::from_points([(-5.0, -5.0), (3.0, 3.0)]).unwrap();
        assert_eq!((bounds.x, bounds.y, bounds.width, bounds.height), (0, 0, 3, 3));

        // A single point still yields a visible box
        let bounds = BoundingBox::from_points([(7.0, 7.0)]).unwrap();
        assert_eq!((bounds.width, bounds.height), (1, 1));
    }

    #[test]
    fn test_null_decoder_finds_nothing() {
        let frame = GrayImage::new(16, 16);
        assert!(NullDecoder.decode(&frame).is_empty());
    }
}
