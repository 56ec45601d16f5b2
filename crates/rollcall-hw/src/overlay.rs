//! Overlay drawing on RGB8 buffers: rectangle outlines and a tiny 3×5
//! bitmap font for labels. Presentation only.

pub type Color = (u8, u8, u8);

pub const GREEN: Color = (0, 255, 0);
pub const WHITE: Color = (255, 255, 255);

const GLYPH_W: usize = 3;
const GLYPH_H: usize = 5;

/// Draw a rectangle outline (2 px thick), clipped to the buffer.
pub fn draw_rect(rgb: &mut [u8], width: usize, height: usize, x: i32, y: i32, w: i32, h: i32, color: Color) {
    for t in 0..2i32 {
        for px in x..x + w {
            put_pixel(rgb, width, height, px, y + t, color);
            put_pixel(rgb, width, height, px, y + h - 1 - t, color);
        }
        for py in y..y + h {
            put_pixel(rgb, width, height, x + t, py, color);
            put_pixel(rgb, width, height, x + w - 1 - t, py, color);
        }
    }
}

/// Draw a text line starting at (x, y). Characters are uppercased; glyphs
/// are `scale`× enlarged.
pub fn draw_text(rgb: &mut [u8], width: usize, height: usize, x: i32, y: i32, text: &str, color: Color, scale: usize) {
    let advance = ((GLYPH_W + 1) * scale) as i32;
    let mut cx = x;
    for c in text.chars() {
        draw_glyph(rgb, width, height, cx, y, c, color, scale);
        cx += advance;
    }
}

/// Pixel width of `text` at the given scale.
pub fn text_width(text: &str, scale: usize) -> usize {
    text.chars().count() * (GLYPH_W + 1) * scale
}

fn put_pixel(rgb: &mut [u8], width: usize, height: usize, x: i32, y: i32, color: Color) {
    if x < 0 || y < 0 || x as usize >= width || y as usize >= height {
        return;
    }
    let idx = (y as usize * width + x as usize) * 3;
    rgb[idx] = color.0;
    rgb[idx + 1] = color.1;
    rgb[idx + 2] = color.2;
}

fn draw_glyph(rgb: &mut [u8], width: usize, height: usize, x: i32, y: i32, c: char, color: Color, scale: usize) {
    let rows = glyph(c);
    for (row, bits) in rows.iter().enumerate() {
        for col in 0..GLYPH_W {
            if (bits >> (GLYPH_W - 1 - col)) & 1 == 1 {
                for dy in 0..scale {
                    for dx in 0..scale {
                        put_pixel(
                            rgb,
                            width,
                            height,
                            x + (col * scale + dx) as i32,
                            y + (row * scale + dy) as i32,
                            color,
                        );
                    }
                }
            }
        }
    }
}

/// 3-bit-wide, 5-row glyphs. Some letters are necessarily approximate at
/// this size.
fn glyph(c: char) -> [u8; GLYPH_H] {
    match c.to_ascii_uppercase() {
        'A' => [0x2, 0x5, 0x7, 0x5, 0x5],
        'B' => [0x6, 0x5, 0x6, 0x5, 0x6],
        'C' => [0x7, 0x4, 0x4, 0x4, 0x7],
        'D' => [0x6, 0x5, 0x5, 0x5, 0x6],
        'E' => [0x7, 0x4, 0x6, 0x4, 0x7],
        'F' => [0x7, 0x4, 0x6, 0x4, 0x4],
        'G' => [0x7, 0x4, 0x5, 0x5, 0x7],
        'H' => [0x5, 0x5, 0x7, 0x5, 0x5],
        'I' => [0x7, 0x2, 0x2, 0x2, 0x7],
        'J' => [0x1, 0x1, 0x1, 0x5, 0x7],
        'K' => [0x5, 0x5, 0x6, 0x5, 0x5],
        'L' => [0x4, 0x4, 0x4, 0x4, 0x7],
        'M' => [0x5, 0x7, 0x5, 0x5, 0x5],
        'N' => [0x6, 0x5, 0x5, 0x5, 0x5],
        'O' => [0x7, 0x5, 0x5, 0x5, 0x7],
        'P' => [0x7, 0x5, 0x7, 0x4, 0x4],
        'Q' => [0x7, 0x5, 0x5, 0x7, 0x1],
        'R' => [0x6, 0x5, 0x6, 0x5, 0x5],
        'S' => [0x3, 0x4, 0x2, 0x1, 0x6],
        'T' => [0x7, 0x2, 0x2, 0x2, 0x2],
        'U' => [0x5, 0x5, 0x5, 0x5, 0x7],
        'V' => [0x5, 0x5, 0x5, 0x5, 0x2],
        'W' => [0x5, 0x5, 0x5, 0x7, 0x5],
        'X' => [0x5, 0x5, 0x2, 0x5, 0x5],
        'Y' => [0x5, 0x5, 0x2, 0x2, 0x2],
        'Z' => [0x7, 0x1, 0x2, 0x4, 0x7],
        '0' => [0x7, 0x5, 0x5, 0x5, 0x7],
        '1' => [0x2, 0x6, 0x2, 0x2, 0x7],
        '2' => [0x7, 0x1, 0x7, 0x4, 0x7],
        '3' => [0x7, 0x1, 0x7, 0x1, 0x7],
        '4' => [0x5, 0x5, 0x7, 0x1, 0x1],
        '5' => [0x7, 0x4, 0x7, 0x1, 0x7],
        '6' => [0x7, 0x4, 0x7, 0x5, 0x7],
        '7' => [0x7, 0x1, 0x2, 0x4, 0x4],
        '8' => [0x7, 0x5, 0x7, 0x5, 0x7],
        '9' => [0x7, 0x5, 0x7, 0x1, 0x7],
        ' ' => [0x0, 0x0, 0x0, 0x0, 0x0],
        ':' => [0x0, 0x2, 0x0, 0x2, 0x0],
        '-' => [0x0, 0x0, 0x7, 0x0, 0x0],
        '_' => [0x0, 0x0, 0x0, 0x0, 0x7],
        '.' => [0x0, 0x0, 0x0, 0x0, 0x2],
        _ => [0x7, 0x7, 0x7, 0x7, 0x7], // block for anything unmapped
    }
}
