use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A global or local color table.
///
/// The number of entries is always a power of two between 2 and 256, derived from the 3 bit size
/// field of the block that declared the table.
#[derive(Clone, PartialEq, Eq)]
pub struct ColorTable {
    entries: Box<[Rgb]>,
}

impl ColorTable {
    /// Number of entries declared by a 3 bit size exponent.
    pub fn len_for_exponent(exponent: u8) -> usize {
        1 << ((exponent & 0b111) + 1)
    }

    pub(crate) fn from_rgb_bytes(bytes: &[u8]) -> Self {
        let entries = bytes
            .chunks_exact(3)
            .map(|rgb| Rgb::new(rgb[0], rgb[1], rgb[2]))
            .collect();

        Self { entries }
    }

    pub fn get(&self, index: u8) -> Option<Rgb> {
        self.entries.get(index as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Rgb] {
        &self.entries
    }
}

impl fmt::Debug for ColorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // full tables drown debug logs
        f.debug_struct("ColorTable").field("len", &self.len()).finish()
    }
}

/// A decoded frame, row-major and top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u16,
    pub height: u16,
    pub pixels: Vec<Rgb>,
}

impl Image {
    pub fn pixel(&self, x: u16, y: u16) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Rgb]> {
        // chunks panics on zero, and a zero width image has no rows anyway
        self.pixels.chunks(self.width.max(1) as usize)
    }
}
