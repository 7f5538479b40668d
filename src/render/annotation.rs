use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlign {
    /// The text position is the top of the text bounds.
    BoundsTop,
    Baseline,
}

/// Look of the status label drawn next to the cursor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnnotationStyle {
    pub font: String,
    pub pixel_size: f32,
    pub text_color: [u8; 4],
    pub background: [u8; 4],
    /// Label position relative to the cursor.
    pub offset: [f32; 2],
    /// Background margin around the text bounds.
    pub padding: f32,
    pub vertical_align: VerticalAlign,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            font: "Tahoma".to_string(),
            pixel_size: 13.0,
            text_color: [20, 20, 20, 255],
            background: [220, 220, 220, 230],
            offset: [35.0, -20.0],
            padding: 3.0,
            vertical_align: VerticalAlign::BoundsTop,
        }
    }
}

/// Screen-space rectangle, `min` is the upper left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2d {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds2d {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Grown by `amount` pixels on every side.
    pub fn offset(self, amount: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(amount),
            max: self.max + Vec2::splat(amount),
        }
    }

    /// Upper left, lower left, lower right, upper right.
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.min.x, self.max.y),
            self.max,
            Vec2::new(self.max.x, self.min.y),
        ]
    }
}

/// 2D drawing surface handed to the tool during a redraw.
pub trait ViewSurface {
    /// Bounds `text` would occupy, when the surface can measure text.
    fn text_bounds(
        &self,
        _position: Vec2,
        _text: &str,
        _style: &AnnotationStyle,
    ) -> Option<Bounds2d> {
        None
    }

    fn draw_quad(&mut self, corners: [Vec2; 4], color: [u8; 4]);
    fn draw_text(&mut self, position: Vec2, text: &str, style: &AnnotationStyle);
}

/// Draw `text` offset from `anchor`, on a padded background when the surface
/// can measure it.
pub fn draw_label(
    surface: &mut dyn ViewSurface,
    anchor: Vec2,
    text: &str,
    style: &AnnotationStyle,
) {
    let position = anchor + Vec2::from_array(style.offset);
    if let Some(bounds) = surface.text_bounds(position, text, style) {
        surface.draw_quad(bounds.offset(style.padding).corners(), style.background);
    }
    surface.draw_text(position, text, style);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Quad { corners: [Vec2; 4], color: [u8; 4] },
    Text { position: Vec2, text: String },
}

/// Surface that records draw calls. Text is measured with a fixed advance of
/// 0.6 em per character and 1.2 em per line.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    commands: Vec<DrawCommand>,
    measures_text: bool,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            measures_text: true,
        }
    }

    /// A surface that cannot measure text, so labels get no background.
    pub fn without_metrics() -> Self {
        Self {
            commands: Vec::new(),
            measures_text: false,
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn last_text(&self) -> Option<&str> {
        self.commands.iter().rev().find_map(|command| match command {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            DrawCommand::Quad { .. } => None,
        })
    }
}

impl ViewSurface for RecordingSurface {
    fn text_bounds(&self, position: Vec2, text: &str, style: &AnnotationStyle) -> Option<Bounds2d> {
        if !self.measures_text {
            return None;
        }
        let columns = text.lines().map(|line| line.chars().count()).max().unwrap_or(0);
        let rows = text.lines().count().max(1);
        let size = Vec2::new(
            columns as f32 * style.pixel_size * 0.6,
            rows as f32 * style.pixel_size * 1.2,
        );
        let top = match style.vertical_align {
            VerticalAlign::BoundsTop => position,
            VerticalAlign::Baseline => position - Vec2::new(0.0, style.pixel_size),
        };
        Some(Bounds2d::new(top, top + size))
    }

    fn draw_quad(&mut self, corners: [Vec2; 4], color: [u8; 4]) {
        self.commands.push(DrawCommand::Quad { corners, color });
    }

    fn draw_text(&mut self, position: Vec2, text: &str, _style: &AnnotationStyle) {
        self.commands.push(DrawCommand::Text {
            position,
            text: text.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_gets_padded_background_first() {
        let style = AnnotationStyle::default();
        let mut surface = RecordingSurface::new();
        draw_label(&mut surface, Vec2::new(100.0, 100.0), "Replace Brick ...", &style);

        let [background, text] = surface.commands() else {
            panic!("expected two commands, got {:?}", surface.commands());
        };
        match background {
            DrawCommand::Quad { corners, color } => {
                assert_eq!(*color, style.background);
                assert_eq!(corners[0], Vec2::new(132.0, 77.0));
            }
            other => panic!("expected quad, got {:?}", other),
        }
        match text {
            DrawCommand::Text { position, text } => {
                assert_eq!(*position, Vec2::new(135.0, 80.0));
                assert_eq!(text, "Replace Brick ...");
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn label_without_metrics_is_text_only() {
        let mut surface = RecordingSurface::without_metrics();
        draw_label(&mut surface, Vec2::ZERO, "Replace Default ...", &AnnotationStyle::default());
        assert_eq!(surface.commands().len(), 1);
        assert_eq!(surface.last_text(), Some("Replace Default ..."));
    }

    #[test]
    fn multi_line_bounds_grow_downwards() {
        let style = AnnotationStyle::default();
        let surface = RecordingSurface::new();
        let one = surface.text_bounds(Vec2::ZERO, "Replace A", &style).unwrap();
        let two = surface.text_bounds(Vec2::ZERO, "Replace A\nwith B", &style).unwrap();
        assert_eq!(one.min, two.min);
        assert!(two.max.y > one.max.y);
        assert_eq!(one.max.x, two.max.x);
    }

    #[test]
    fn corners_wind_around_bounds() {
        let bounds = Bounds2d::new(Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0));
        assert_eq!(
            bounds.corners(),
            [
                Vec2::new(1.0, 2.0),
                Vec2::new(1.0, 4.0),
                Vec2::new(3.0, 4.0),
                Vec2::new(3.0, 2.0),
            ]
        );
    }
}
