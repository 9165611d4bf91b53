use palette::ShiftHue;

use crate::color::Color;

/// Rotate `profile` around the hue wheel by `degrees` in both directions.
///
/// Lightness and saturation are kept; only hue moves. The result holds at
/// most two colors and never repeats one, so a half-turn yields a single
/// color. A rotation that is a whole number of turns is the identity.
pub fn rotate(profile: Color, degrees: f32) -> Vec<Color> {
    if degrees.rem_euclid(360.0) == 0.0 {
        return vec![profile];
    }

    let hsl = profile.to_hsl();
    let mut rotated = Vec::with_capacity(2);
    for shift in [-degrees, degrees] {
        let candidate = Color::from_hsl(hsl.shift_hue(shift));
        if !rotated.contains(&candidate) {
            rotated.push(candidate);
        }
    }
    rotated
}
