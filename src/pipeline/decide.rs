use std::collections::BTreeSet;
use std::fmt;

use log::{debug, warn};

use crate::color::MatchingRule;
use crate::color::ColorLabel;
use crate::error::Result;
use crate::pipeline::wheel;

/// The chromatic labels that harmonize with a reference color.
///
/// Never empty and never holds a neutral. Iterates in wheel order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSet(BTreeSet<ColorLabel>);

impl MatchSet {
    /// Every chromatic label.
    pub fn all_chromatic() -> Self {
        Self(ColorLabel::CHROMATIC.into_iter().collect())
    }

    pub fn contains(&self, label: ColorLabel) -> bool {
        self.0.contains(&label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ColorLabel> + '_ {
        self.0.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<ColorLabel> {
        self.iter().collect()
    }
}

impl fmt::Display for MatchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(ColorLabel::as_str).collect();
        f.write_str(&names.join(", "))
    }
}

/// Colors that match `reference` under `rule`.
///
/// Neutrals go with anything, so they match every chromatic color. A
/// chromatic reference is rotated on the wheel and each result mapped back
/// to its anchor label.
pub fn decide(reference: ColorLabel, rule: MatchingRule) -> MatchSet {
    let Some(anchor) = reference.anchor() else {
        debug!("{reference} is neutral, matching all chromatic colors");
        return MatchSet::all_chromatic();
    };

    let labels: BTreeSet<ColorLabel> = wheel::rotate(anchor, rule.degrees())
        .into_iter()
        .map(|rotated| {
            ColorLabel::from_anchor(rotated).unwrap_or_else(|| {
                let nearest = ColorLabel::nearest_chromatic(rotated);
                warn!("rotation produced off-wheel color {rotated}, using {nearest}");
                nearest
            })
        })
        .collect();
    debug!("{reference} under {rule} matches {labels:?}");
    MatchSet(labels)
}

/// [`decide`] for names given as text, e.g. from a form or a config file.
///
/// Unknown names are rejected before any work is done.
pub fn decide_named(reference: &str, rule: &str) -> Result<MatchSet> {
    let reference: ColorLabel = reference.parse()?;
    let rule: MatchingRule = rule.parse()?;
    Ok(decide(reference, rule))
}
