//! Built-in 5×7 bitmap font for shape labels.
//!
//! Each glyph is seven rows of five bits; bit 4 is the leftmost column.
//! Covers ASCII letters, digits and space. Any other character renders as
//! a blank cell of the same advance.

/// Glyph width in font cells.
pub const GLYPH_WIDTH: u32 = 5;

/// Glyph height in font cells.
pub const GLYPH_HEIGHT: u32 = 7;

/// Horizontal distance between consecutive glyph origins (one blank
/// column of spacing).
pub const ADVANCE: u32 = GLYPH_WIDTH + 1;

const BLANK: [u8; 7] = [0; 7];

#[rustfmt::skip]
const UPPERCASE: [[u8; 7]; 26] = [
    [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11], // A
    [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E], // B
    [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E], // C
    [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C], // D
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F], // E
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10], // F
    [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F], // G
    [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11], // H
    [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E], // I
    [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C], // J
    [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11], // K
    [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F], // L
    [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11], // M
    [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11], // N
    [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E], // O
    [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10], // P
    [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D], // Q
    [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11], // R
    [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E], // S
    [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04], // T
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E], // U
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04], // V
    [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A], // W
    [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11], // X
    [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04], // Y
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F], // Z
];

#[rustfmt::skip]
const LOWERCASE: [[u8; 7]; 26] = [
    [0x00, 0x00, 0x0E, 0x01, 0x0F, 0x11, 0x0F], // a
    [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x1E], // b
    [0x00, 0x00, 0x0E, 0x10, 0x10, 0x11, 0x0E], // c
    [0x01, 0x01, 0x0D, 0x13, 0x11, 0x11, 0x0F], // d
    [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E], // e
    [0x06, 0x09, 0x08, 0x1C, 0x08, 0x08, 0x08], // f
    [0x00, 0x0F, 0x11, 0x11, 0x0F, 0x01, 0x0E], // g
    [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x11], // h
    [0x04, 0x00, 0x0C, 0x04, 0x04, 0x04, 0x0E], // i
    [0x02, 0x00, 0x06, 0x02, 0x02, 0x12, 0x0C], // j
    [0x10, 0x10, 0x12, 0x14, 0x18, 0x14, 0x12], // k
    [0x0C, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E], // l
    [0x00, 0x00, 0x1A, 0x15, 0x15, 0x11, 0x11], // m
    [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11], // n
    [0x00, 0x00, 0x0E, 0x11, 0x11, 0x11, 0x0E], // o
    [0x00, 0x00, 0x1E, 0x11, 0x1E, 0x10, 0x10], // p
    [0x00, 0x00, 0x0D, 0x13, 0x0F, 0x01, 0x01], // q
    [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10], // r
    [0x00, 0x00, 0x0E, 0x10, 0x0E, 0x01, 0x1E], // s
    [0x08, 0x08, 0x1C, 0x08, 0x08, 0x09, 0x06], // t
    [0x00, 0x00, 0x11, 0x11, 0x11, 0x13, 0x0D], // u
    [0x00, 0x00, 0x11, 0x11, 0x11, 0x0A, 0x04], // v
    [0x00, 0x00, 0x11, 0x11, 0x15, 0x15, 0x0A], // w
    [0x00, 0x00, 0x11, 0x0A, 0x04, 0x0A, 0x11], // x
    [0x00, 0x00, 0x11, 0x11, 0x0F, 0x01, 0x0E], // y
    [0x00, 0x00, 0x1F, 0x02, 0x04, 0x08, 0x1F], // z
];

#[rustfmt::skip]
const DIGITS: [[u8; 7]; 10] = [
    [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E], // 0
    [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E], // 1
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F], // 2
    [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E], // 3
    [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02], // 4
    [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E], // 5
    [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E], // 6
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08], // 7
    [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E], // 8
    [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C], // 9
];

/// Row bitmaps for one character.
#[must_use]
pub fn glyph(c: char) -> [u8; 7] {
    let offset = |base: char| (c as usize) - (base as usize);
    match c {
        'A'..='Z' => UPPERCASE[offset('A')],
        'a'..='z' => LOWERCASE[offset('a')],
        '0'..='9' => DIGITS[offset('0')],
        _ => BLANK,
    }
}

/// Width in pixels of `text` drawn at `scale`, without trailing spacing.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn text_width(text: &str, scale: u32) -> u32 {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return 0;
    }
    ((chars - 1) * ADVANCE + GLYPH_WIDTH) * scale
}

/// Lit cells of `text` as `(column, row)` pairs in unscaled font units,
/// with row 0 at the top of the glyph line.
pub fn lit_cells(text: &str) -> impl Iterator<Item = (u32, u32)> + '_ {
    text.chars().zip((0u32..).step_by(ADVANCE as usize)).flat_map(|(c, origin)| {
        glyph(c).into_iter().zip(0u32..).flat_map(move |(bits, row)| {
            (0..GLYPH_WIDTH)
                .filter(move |&col| bits & (0x10u8 >> col) != 0)
                .map(move |col| (origin + col, row))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_rows_fit_five_columns() {
        for table in [&UPPERCASE[..], &LOWERCASE[..], &DIGITS[..]] {
            for g in table {
                assert!(g.iter().all(|row| *row < 0x20));
            }
        }
    }

    #[test]
    fn every_label_character_has_a_glyph() {
        for label in ["Triangle", "Rectangle", "Circle", "Unknown"] {
            for c in label.chars() {
                assert_ne!(glyph(c), BLANK, "missing glyph for {c:?}");
            }
        }
    }

    #[test]
    fn unsupported_characters_are_blank() {
        assert_eq!(glyph(' '), BLANK);
        assert_eq!(glyph('é'), BLANK);
        assert_eq!(glyph('?'), BLANK);
    }

    #[test]
    fn text_width_counts_spacing_between_glyphs() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("A", 1), 5);
        assert_eq!(text_width("AB", 1), 11);
        assert_eq!(text_width("AB", 2), 22);
    }

    #[test]
    fn lit_cells_of_letter_l() {
        let cells: Vec<(u32, u32)> = lit_cells("L").collect();
        // Left column for six rows, then the full bottom row.
        assert_eq!(cells.len(), 7 + 4);
        assert!(cells.contains(&(0, 0)));
        assert!(cells.contains(&(4, 6)));
        assert!(!cells.contains(&(4, 5)));
    }

    #[test]
    fn second_glyph_is_offset_by_advance() {
        let cells: Vec<(u32, u32)> = lit_cells("IT").collect();
        // T's top bar spans columns 6..11.
        for col in 6..11 {
            assert!(cells.contains(&(col, 0)), "column {col}");
        }
        assert!(cells.iter().all(|&(col, _)| col != 5));
    }

    #[test]
    fn cells_stay_inside_text_box() {
        let text = "Rectangle";
        let width = text_width(text, 1);
        assert!(lit_cells(text).all(|(col, row)| col < width && row < GLYPH_HEIGHT));
    }
}
