use image::{Rgb, RgbImage};

use super::decoder::{BoundingBox, Symbol};
use super::glyphs::{lit, GLYPH_HEIGHT, GLYPH_WIDTH};

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: u32 = 2;
/// Gap between a box and its label.
const LABEL_GAP: u32 = 2;

/// Copy of `frame` with a box and the decoded value drawn for every located
/// symbol.
pub fn annotate(frame: &RgbImage, symbols: &[Symbol]) -> RgbImage {
    let mut out = frame.clone();
    for symbol in symbols {
        let Some(bounds) = symbol.bounds else {
            continue;
        };
        draw_box(&mut out, bounds);
        draw_label(&mut out, bounds, &symbol.value);
    }
    out
}

/// Above the box when there is room, otherwise just below it.
fn draw_label(img: &mut RgbImage, b: BoundingBox, text: &str) {
    let y = if b.y >= GLYPH_HEIGHT + LABEL_GAP {
        b.y - GLYPH_HEIGHT - LABEL_GAP
    } else {
        b.y + b.height + LABEL_GAP + 1
    };

    let mut x = b.x;
    for c in text.chars() {
        if x >= img.width() {
            break;
        }
        for row in 0..GLYPH_HEIGHT {
            for col in 0..GLYPH_WIDTH {
                if lit(c, col, row) {
                    put(img, x + col, y + row);
                }
            }
        }
        x += GLYPH_WIDTH + 1;
    }
}

fn draw_box(img: &mut RgbImage, b: BoundingBox) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || b.x >= w || b.y >= h {
        return;
    }
    let right = (b.x + b.width).min(w - 1);
    let bottom = (b.y + b.height).min(h - 1);

    for t in 0..BOX_THICKNESS {
        for x in b.x..=right {
            put(img, x, b.y + t);
            put(img, x, bottom.saturating_sub(t));
        }
        for y in b.y..=bottom {
            put(img, b.x + t, y);
            put(img, right.saturating_sub(t), y);
        }
    }
}

fn put(img: &mut RgbImage, x: u32, y: u32) {
    if x < img.width() && y < img.height() {
        img.put_pixel(x, y, BOX_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_is_drawn_on_a_copy() {
        let frame = RgbImage::new(20, 20);
        let symbol = Symbol {
            value: "X".to_string(),
            bounds: Some(BoundingBox { x: 2, y: 3, width: 10, height: 5 }),
        };
        let out = annotate(&frame, &[symbol]);

        assert_eq!(*out.get_pixel(2, 3), BOX_COLOR);
        assert_eq!(*out.get_pixel(12, 8), BOX_COLOR);
        assert_eq!(*out.get_pixel(7, 6), Rgb([0, 0, 0]));
        assert_eq!(*frame.get_pixel(2, 3), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_value_is_written_above_the_box() {
        let frame = RgbImage::new(40, 40);
        let symbol = Symbol {
            value: "1".to_string(),
            bounds: Some(BoundingBox { x: 4, y: 20, width: 10, height: 5 }),
        };
        let out = annotate(&frame, &[symbol]);

        // Top row of '1' is a single pixel in the middle column, 9 rows up.
        assert_eq!(*out.get_pixel(6, 11), BOX_COLOR);
        assert_eq!(*out.get_pixel(4, 11), Rgb([0, 0, 0]));
        // Bottom row spans three columns.
        assert_eq!(*out.get_pixel(5, 17), BOX_COLOR);
        assert_eq!(*out.get_pixel(7, 17), BOX_COLOR);
    }

    #[test]
    fn test_label_moves_below_a_box_at_the_top_edge() {
        let frame = RgbImage::new(40, 40);
        let symbol = Symbol {
            value: "-".to_string(),
            bounds: Some(BoundingBox { x: 0, y: 0, width: 10, height: 5 }),
        };
        let out = annotate(&frame, &[symbol]);

        // '-' lights row 3 of a glyph starting at y = 5 + 2 + 1.
        assert_eq!(*out.get_pixel(0, 11), BOX_COLOR);
        assert_eq!(*out.get_pixel(4, 11), BOX_COLOR);
        assert_eq!(*out.get_pixel(0, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_box_past_the_edge_is_clipped() {
        let frame = RgbImage::new(10, 10);
        let symbol = Symbol {
            value: "X".to_string(),
            bounds: Some(BoundingBox { x: 8, y: 8, width: 50, height: 50 }),
        };
        let out = annotate(&frame, &[symbol]);
        assert_eq!(*out.get_pixel(9, 9), BOX_COLOR);
    }
}
