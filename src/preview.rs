use std::io::Write;

use anyhow::Result;
use crossterm::style::{Color as TermColor, Stylize};

use crate::color::{Color, ColorLabel};
use crate::pipeline::decide::MatchSet;

fn to_term(c: Color) -> TermColor {
    TermColor::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

/// Choose black or white foreground for readable text on the given background.
fn contrast_fg(c: Color) -> TermColor {
    if c.relative_luminance() > 0.4 {
        TermColor::Black
    } else {
        TermColor::White
    }
}

/// A label name centered on its own swatch color.
fn swatch(label: ColorLabel) -> String {
    let bg = label.swatch();
    format!("{:^9}", label.as_str())
        .with(contrast_fg(bg))
        .on(to_term(bg))
        .to_string()
}

/// Two lines: the reference swatch, then one swatch per matching color.
pub fn render(reference: ColorLabel, matches: &MatchSet) -> String {
    let row: Vec<String> = matches.iter().map(swatch).collect();
    format!(
        "  reference  {}\n  matches    {}\n",
        swatch(reference),
        row.join(" ")
    )
}

/// Write the preview to `out`.
pub fn print(out: &mut impl Write, reference: ColorLabel, matches: &MatchSet) -> Result<()> {
    out.write_all(render(reference, matches).as_bytes())?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::MatchingRule;
    use crate::pipeline::decide::decide;

    #[test]
    fn preview_names_every_color() {
        let matches = decide(ColorLabel::Red, MatchingRule::Triad);
        let text = render(ColorLabel::Red, &matches);
        assert_eq!(text.lines().count(), 2);
        for name in ["red", "green", "blue"] {
            assert!(text.contains(name), "missing {name} in {text:?}");
        }
    }

    #[test]
    fn preview_carries_rgb_escapes() {
        if std::env::var_os("NO_COLOR").is_some() {
            return;
        }
        let text = render(ColorLabel::Yellow, &MatchSet::all_chromatic());
        // 24-bit background escape for the yellow swatch
        assert!(text.contains("48;2;255;255;0"), "{text:?}");
    }

    #[test]
    fn print_writes_render_output() {
        let matches = MatchSet::all_chromatic();
        let mut buf = Vec::new();
        print(&mut buf, ColorLabel::Grey, &matches).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            render(ColorLabel::Grey, &matches)
        );
    }
}
