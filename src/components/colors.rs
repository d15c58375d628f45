use crate::canvas::Rgb;

/// Number of user-editable palette slots.
pub const CUSTOM_PALETTE_SIZE: usize = 5;

/// Preset swatches, 5 rows x 5 columns.
pub const DEFAULT_PALETTE: [Rgb; 25] = [
    // Grayscale
    Rgb::new(0x00, 0x00, 0x00),
    Rgb::new(0x40, 0x40, 0x40),
    Rgb::new(0x80, 0x80, 0x80),
    Rgb::new(0xc0, 0xc0, 0xc0),
    Rgb::new(0xff, 0xff, 0xff),
    // Reds & oranges
    Rgb::new(0x59, 0x09, 0x09),
    Rgb::new(0xb8, 0x1a, 0x1a),
    Rgb::new(0xff, 0x4d, 0x4d),
    Rgb::new(0xff, 0x99, 0x33),
    Rgb::new(0xff, 0xcc, 0x00),
    // Greens & yellows
    Rgb::new(0x2b, 0x3d, 0x12),
    Rgb::new(0x4b, 0x69, 0x2f),
    Rgb::new(0x76, 0xa1, 0x38),
    Rgb::new(0xa4, 0xd9, 0x4e),
    Rgb::new(0xe8, 0xf7, 0xa8),
    // Blues & teals
    Rgb::new(0x0b, 0x18, 0x28),
    Rgb::new(0x1a, 0x3a, 0x59),
    Rgb::new(0x29, 0x66, 0x8c),
    Rgb::new(0x4d, 0xa6, 0xff),
    Rgb::new(0x99, 0xe5, 0xff),
    // Purples & pinks
    Rgb::new(0x28, 0x12, 0x29),
    Rgb::new(0x5d, 0x2c, 0x5d),
    Rgb::new(0x9e, 0x45, 0x9e),
    Rgb::new(0xef, 0x7d, 0xce),
    Rgb::new(0xff, 0xcc, 0xff),
];

pub const DEFAULT_CUSTOM_PALETTE: [Rgb; CUSTOM_PALETTE_SIZE] = [
    Rgb::new(0xff, 0xff, 0xff),
    Rgb::new(0xcc, 0xcc, 0xcc),
    Rgb::new(0x99, 0x99, 0x99),
    Rgb::new(0x66, 0x66, 0x66),
    Rgb::new(0x33, 0x33, 0x33),
];

/// The five user-editable swatches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CustomPalette([Rgb; CUSTOM_PALETTE_SIZE]);

impl Default for CustomPalette {
    fn default() -> Self {
        Self(DEFAULT_CUSTOM_PALETTE)
    }
}

impl CustomPalette {
    /// Build from any number of colors: extra entries are dropped, missing
    /// slots keep their defaults.
    pub fn from_colors(colors: &[Rgb]) -> Self {
        let mut slots = DEFAULT_CUSTOM_PALETTE;
        for (slot, &c) in slots.iter_mut().zip(colors) {
            *slot = c;
        }
        Self(slots)
    }

    pub fn colors(&self) -> &[Rgb; CUSTOM_PALETTE_SIZE] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<Rgb> {
        self.0.get(index).copied()
    }

    /// Replace one slot. Returns `false` for an out-of-range index.
    pub fn set(&mut self, index: usize, color: Rgb) -> bool {
        match self.0.get_mut(index) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|c| c.to_string()).collect()
    }
}
