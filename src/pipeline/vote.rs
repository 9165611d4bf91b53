use crate::color::ColorLabel;
use crate::error::{MatchError, Result};

/// Most frequent label in `labels`.
///
/// Ties go to the label whose name sorts first (`"blue"` beats `"green"`),
/// which keeps the result independent of input order.
pub fn mode(labels: &[ColorLabel]) -> Result<ColorLabel> {
    let counts = tally(labels);
    ColorLabel::ALL
        .into_iter()
        .filter(|label| counts[label.index()] > 0)
        .max_by(|a, b| {
            counts[a.index()]
                .cmp(&counts[b.index()])
                .then_with(|| b.as_str().cmp(a.as_str()))
        })
        .ok_or(MatchError::EmptyInput)
}

/// Occurrence count per label, indexed by [`ColorLabel::index`].
pub fn tally(labels: &[ColorLabel]) -> [usize; ColorLabel::COUNT] {
    let mut counts = [0usize; ColorLabel::COUNT];
    for label in labels {
        counts[label.index()] += 1;
    }
    counts
}
