//! Writes a worked solution onto the canvas below the student's work.

use canvas::doc::{Color, ShapeId, ShapeSpec};
use canvas::surface::Surface;

use crate::bounds;
use crate::client::SolutionStep;
use crate::tag::{self, AiTag, Role};

/// Vertical distance between the bottom of the content and the first step.
pub const SOLUTION_TOP_GAP: f64 = 80.0;
const LINE_GAP: f64 = 8.0;
const STEP_GAP: f64 = 24.0;
/// Explanations are word-wrapped to this many characters per line.
const WRAP_COLUMNS: usize = 60;

pub struct SolutionRenderer;

impl SolutionRenderer {
    /// Stack `steps` downward, starting below everything that is not already
    /// solution text (or at the page origin on an empty page).
    pub fn render<S: Surface + ?Sized>(surface: &mut S, steps: &[SolutionStep]) -> Vec<ShapeId> {
        let previous = tag::solution_shape_ids(surface);
        let content: Vec<ShapeId> = surface.list_shape_ids().into_iter().filter(|id| !previous.contains(id)).collect();
        let (x, mut y) = match bounds::union_bounds(surface, &content) {
            Some(b) => (b.min_x, b.max_y() + SOLUTION_TOP_GAP),
            None => (0.0, 0.0),
        };

        let mut ids = Vec::new();
        for (index, step) in steps.iter().enumerate() {
            let title = format!("Paso {}", index + 1);
            let tag = AiTag {
                annotation_id: format!("solution-{}", index + 1),
                role: Role::Solution,
                kind: None,
                text: title.clone(),
                explanation: step.explanation.clone(),
                anchor: None,
            };
            let blocks = [
                (title, Color::Blue),
                (wrap(&step.explanation, WRAP_COLUMNS), Color::Black),
                (step.latex.trim().to_string(), Color::Violet),
            ];
            for (text, color) in blocks {
                if text.is_empty() {
                    continue;
                }
                let spec = ShapeSpec::text(x, y, &text).with_color(color).with_meta(tag.to_meta());
                y += spec.height + LINE_GAP;
                ids.push(surface.create_shape(spec));
            }
            y += STEP_GAP;
        }
        ids
    }

    /// Remove every solution shape. Returns how many there were.
    pub fn clear<S: Surface + ?Sized>(surface: &mut S) -> usize {
        let ids = tag::solution_shape_ids(surface);
        surface.delete_shapes(&ids);
        ids.len()
    }
}

fn wrap(text: &str, columns: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.trim().lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > columns {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
#[path = "solution_test.rs"]
mod tests;
