use alignmark_core::{Coord, LayoutError, Region, TextGenerator};

/// Characters that can appear in a position label.
pub const LABEL_GLYPHS: &str = "0123456789RC";

/// Text of the label under the cross at (`row`, `col`).
pub fn position_label(row: usize, col: usize) -> String {
    format!("R{}C{}", row, col)
}

/// Assembles labels from glyphs rendered once up front.
///
/// Glyphs are stored with their ink starting at x = 0. Each is placed at the
/// running offset, which then advances by the glyph's bbox width plus
/// `spacing`, so consecutive glyphs are exactly `spacing` apart.
#[derive(Debug, Clone)]
pub struct LabelRenderer {
    glyphs: Vec<(char, Region)>,
    spacing: Coord,
}

impl LabelRenderer {
    /// Pre-render [`LABEL_GLYPHS`] at `label_size` database units tall.
    pub fn new(label_size: Coord, spacing: Coord) -> Result<Self, LayoutError> {
        let generator = TextGenerator::with_height(label_size);
        let glyphs = LABEL_GLYPHS
            .chars()
            .map(|c| {
                generator.glyph(c).map(|region| {
                    let left = region.bbox().map_or(0, |b| b.min.x);
                    (c, region.translated(-left, 0))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!(
            "Pre-rendered {} label glyphs at {} nm (dot {} nm)",
            glyphs.len(),
            label_size,
            generator.dot_size()
        );
        Ok(Self { glyphs, spacing })
    }

    fn glyph(&self, c: char) -> Result<&Region, LayoutError> {
        self.glyphs
            .iter()
            .find(|(ch, _)| *ch == c)
            .map(|(_, region)| region)
            .ok_or(LayoutError::UnsupportedGlyph(c))
    }

    /// Render `text` with its first glyph origin at (0, 0).
    ///
    /// Fails on the first character outside [`LABEL_GLYPHS`].
    pub fn render_label(&self, text: &str) -> Result<Region, LayoutError> {
        let mut label = Region::new();
        let mut x_offset: Coord = 0;
        for c in text.chars() {
            let glyph = self.glyph(c)?;
            label += &glyph.translated(x_offset, 0);
            let width = glyph.bbox().map(|b| b.width()).unwrap_or(0);
            x_offset += width + self.spacing;
        }
        Ok(label)
    }
}
