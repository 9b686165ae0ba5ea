use tracing::instrument;

use crate::Rect;

/// Proximity probe around a box: centred vertically, half as tall, and
/// widened by half of `spacing` on either side.
fn sensor(rect: &Rect, spacing: i32) -> Rect {
    let sensor_height = (rect.height / 2).max(1);
    Rect::new(
        rect.x - spacing / 2,
        rect.y + rect.height / 2 - sensor_height / 2,
        rect.width + spacing,
        sensor_height,
    )
}

/// Clusters character rectangles into words. Two boxes belong together when
/// their sensors overlap; a word's sensor is recomputed after every merge.
/// Words whose height falls outside `min_height..=max_height` are dropped.
#[instrument(level = "debug", skip(rects), fields(rects = rects.len()))]
pub fn group_words(rects: &[Rect], spacing: i32, min_height: i32, max_height: i32) -> Vec<Rect> {
    let mut remaining = rects.to_vec();
    let mut words = Vec::new();

    while !remaining.is_empty() {
        let mut word = remaining.remove(0);
        while let Some(next) = remaining
            .iter()
            .position(|r| sensor(&word, spacing).intersects(&sensor(r, spacing)))
        {
            word = word.union(&remaining.remove(next));
        }
        words.push(word);
    }

    let total = words.len();
    words.retain(|w| w.width >= 1 && (min_height..=max_height).contains(&w.height));
    log::debug!(
        "Grouped {} rectangles into {} words ({} dropped by height).",
        rects.len(),
        words.len(),
        total - words.len()
    );
    words
}
