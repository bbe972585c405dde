use crate::core::model::ColorScale;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// WCAG relative luminance in [0, 1].
    pub fn luminance(self) -> f64 {
        fn lin(c: u8) -> f64 {
            let c = c as f64 / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * lin(self.0) + 0.7152 * lin(self.1) + 0.0722 * lin(self.2)
    }
}

// Moreland's diverging cool-warm map sampled at 33 evenly spaced points.
const COOLWARM: [Rgb; 33] = [
    Rgb(59, 76, 192),
    Rgb(68, 90, 204),
    Rgb(77, 104, 215),
    Rgb(87, 117, 225),
    Rgb(98, 130, 234),
    Rgb(108, 142, 241),
    Rgb(119, 154, 247),
    Rgb(130, 165, 251),
    Rgb(141, 176, 254),
    Rgb(152, 185, 255),
    Rgb(163, 194, 255),
    Rgb(174, 201, 253),
    Rgb(184, 208, 249),
    Rgb(194, 213, 244),
    Rgb(204, 217, 238),
    Rgb(213, 219, 230),
    Rgb(221, 221, 221),
    Rgb(229, 216, 209),
    Rgb(236, 211, 197),
    Rgb(241, 204, 185),
    Rgb(245, 196, 173),
    Rgb(247, 187, 160),
    Rgb(247, 177, 148),
    Rgb(247, 166, 135),
    Rgb(244, 154, 123),
    Rgb(241, 141, 111),
    Rgb(236, 127, 99),
    Rgb(229, 112, 88),
    Rgb(222, 96, 77),
    Rgb(213, 80, 66),
    Rgb(203, 62, 56),
    Rgb(192, 40, 47),
    Rgb(180, 4, 38),
];

pub const COOLWARM_NAME: &str = "coolwarm";

/// Color at `t` in [0, 1]; out-of-range positions clamp to the end colors.
pub fn coolwarm(t: f64) -> Rgb {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let pos = t * (COOLWARM.len() - 1) as f64;
    let i = (pos.floor() as usize).min(COOLWARM.len() - 2);
    let frac = pos - i as f64;
    let a = COOLWARM[i];
    let b = COOLWARM[i + 1];
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    Rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

pub fn scaled(scale: &ColorScale, v: f64) -> Rgb {
    coolwarm(scale.normalize(v))
}

/// Dark text on light cells, white text on dark cells.
pub fn annotation_color(cell: Rgb) -> &'static str {
    if cell.luminance() > 0.408 {
        "#262626"
    } else {
        "#ffffff"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_and_midpoint() {
        assert_eq!(coolwarm(0.0), Rgb(59, 76, 192));
        assert_eq!(coolwarm(0.5), Rgb(221, 221, 221));
        assert_eq!(coolwarm(1.0), Rgb(180, 4, 38));
        assert_eq!(coolwarm(-3.0), coolwarm(0.0));
        assert_eq!(coolwarm(7.0), coolwarm(1.0));
    }

    #[test]
    fn test_scaled_ani_range() {
        let s = ColorScale::ANI;
        assert_eq!(scaled(&s, 0.0), COOLWARM[0]);
        assert_eq!(scaled(&s, 100.0), COOLWARM[32]);
        assert_eq!(scaled(&s, 97.5), COOLWARM[16]);
    }

    #[test]
    fn test_annotation_contrast() {
        assert_eq!(annotation_color(coolwarm(0.5)), "#262626");
        assert_eq!(annotation_color(coolwarm(1.0)), "#ffffff");
        assert_eq!(annotation_color(coolwarm(0.0)), "#ffffff");
    }

    #[test]
    fn test_hex() {
        assert_eq!(Rgb(180, 4, 38).hex(), "#b40426");
    }
}
