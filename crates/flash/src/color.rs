use std::fmt;

/// A color in the HSLA color space. All components are in the `0.0..=1.0` range.
#[derive(Clone, Copy, Default, PartialEq)]
pub struct Hsla {
    pub h: f32,
    pub s: f32,
    pub l: f32,
    pub a: f32,
}

/// Constructs an [`Hsla`] color.
pub fn hsla(h: f32, s: f32, l: f32, a: f32) -> Hsla {
    Hsla {
        h: h.clamp(0., 1.),
        s: s.clamp(0., 1.),
        l: l.clamp(0., 1.),
        a: a.clamp(0., 1.),
    }
}

/// Converts a `0xRRGGBB` literal into an opaque color.
pub fn rgb(hex: u32) -> Hsla {
    rgba((hex << 8) | 0xff)
}

/// Converts a `0xRRGGBBAA` literal into a color.
pub fn rgba(hex: u32) -> Hsla {
    let r = ((hex >> 24) & 0xff) as f32 / 255.;
    let g = ((hex >> 16) & 0xff) as f32 / 255.;
    let b = ((hex >> 8) & 0xff) as f32 / 255.;
    let a = (hex & 0xff) as f32 / 255.;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let l = (max + min) / 2.;

    if delta == 0. {
        return Hsla { h: 0., s: 0., l, a };
    }

    let s = if l < 0.5 {
        delta / (max + min)
    } else {
        delta / (2. - max - min)
    };
    let h = if max == r {
        ((g - b) / delta).rem_euclid(6.)
    } else if max == g {
        (b - r) / delta + 2.
    } else {
        (r - g) / delta + 4.
    } / 6.;

    Hsla { h, s, l, a }
}

pub fn black() -> Hsla {
    hsla(0., 0., 0., 1.)
}

pub fn white() -> Hsla {
    hsla(0., 0., 1., 1.)
}

pub fn transparent_black() -> Hsla {
    hsla(0., 0., 0., 0.)
}

impl Hsla {
    pub fn is_transparent(&self) -> bool {
        self.a == 0.
    }

    /// Returns this color with its alpha multiplied by `factor`.
    pub fn opacity(self, factor: f32) -> Self {
        Hsla {
            a: (self.a * factor).clamp(0., 1.),
            ..self
        }
    }
}

impl fmt::Debug for Hsla {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsla({:.3}, {:.3}, {:.3}, {:.3})",
            self.h, self.s, self.l, self.a
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_primaries() {
        let red = rgb(0xff0000);
        assert_eq!((red.h, red.s, red.l, red.a), (0., 1., 0.5, 1.));

        let blue = rgb(0x0000ff);
        assert!((blue.h - 2. / 3.).abs() < 1e-6);

        let gray = rgba(0x80808080);
        assert_eq!(gray.s, 0.);
        assert!((gray.a - 128. / 255.).abs() < 1e-6);
    }
}
