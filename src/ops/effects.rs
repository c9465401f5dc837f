// ============================================================================
// EFFECTS: parameterised pixel transforms applied to one raster buffer
// ============================================================================
//
// Effects are plain values: cloning one gives an independent copy with the
// same parameters, so a retained effect can never alter recorded history.
// Colour transforms saturate at the channel limits instead of wrapping.
// ============================================================================

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use rayon::prelude::*;

/// Names accepted by [`Effect::from_str`].
pub const EFFECT_NAMES: &[&str] = &["brightness", "rotate", "invert", "sepia"];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Effect {
    /// Additive brightness, −255 (black) … +255 (white).  Larger magnitudes
    /// saturate.
    Brightness { delta: i32 },
    /// Quarter-turn rotation in degrees.  Multiples of 90 that are not
    /// multiples of 360 rotate; anything else leaves the buffer alone.
    Rotate { angle: f32 },
    /// Invert R, G and B.  Alpha is preserved.
    Invert,
    /// Classic sepia tone matrix.
    Sepia,
}

impl Effect {
    pub fn brightness(delta: i32) -> Self {
        Effect::Brightness { delta }
    }

    pub fn rotate(angle: f32) -> Self {
        Effect::Rotate { angle }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Effect::Brightness { .. } => "brightness",
            Effect::Rotate { .. } => "rotate",
            Effect::Invert => "invert",
            Effect::Sepia => "sepia",
        }
    }

    /// True when applying the effect cannot change any buffer.
    pub fn is_identity(&self) -> bool {
        match self {
            Effect::Brightness { delta } => *delta == 0,
            Effect::Rotate { .. } => self.quarter_turns() == 0,
            Effect::Invert | Effect::Sepia => false,
        }
    }

    /// Brightness offset normalised to `[-1, 1]`.
    fn brightness_unit(delta: i32) -> f32 {
        (delta as f32 / 255.0).clamp(-1.0, 1.0)
    }

    /// Clockwise quarter turns (0–3) for a rotation, 0 for unsupported angles.
    fn quarter_turns(&self) -> u8 {
        let Effect::Rotate { angle } = self else { return 0 };
        if !angle.is_finite() {
            return 0;
        }
        let a = angle.rem_euclid(360.0);
        if a == 90.0 {
            1
        } else if a == 180.0 {
            2
        } else if a == 270.0 {
            3
        } else {
            0
        }
    }

    /// Apply in place.  Returns `false` if the buffer was left untouched
    /// (identity parameters or an empty buffer).
    pub fn apply(&self, buffer: &mut RgbaImage) -> bool {
        if self.is_identity() || buffer.width() == 0 || buffer.height() == 0 {
            return false;
        }
        match *self {
            Effect::Brightness { delta } => {
                let offset = Self::brightness_unit(delta) * 255.0;
                apply_pixel_transform(buffer, move |r, g, b, a| {
                    (r + offset, g + offset, b + offset, a)
                });
            }
            Effect::Rotate { .. } => {
                *buffer = match self.quarter_turns() {
                    1 => image::imageops::rotate90(&*buffer),
                    2 => image::imageops::rotate180(&*buffer),
                    _ => image::imageops::rotate270(&*buffer),
                };
            }
            Effect::Invert => {
                apply_pixel_transform(buffer, |r, g, b, a| (255.0 - r, 255.0 - g, 255.0 - b, a));
            }
            Effect::Sepia => {
                apply_pixel_transform(buffer, |r, g, b, a| {
                    let sr = 0.393 * r + 0.769 * g + 0.189 * b;
                    let sg = 0.349 * r + 0.686 * g + 0.168 * b;
                    let sb = 0.272 * r + 0.534 * g + 0.131 * b;
                    (sr, sg, sb, a)
                });
            }
        }
        true
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Brightness { delta } => write!(f, "Brightness {:+}", delta),
            Effect::Rotate { angle } => write!(f, "Rotate {}°", angle),
            Effect::Invert => write!(f, "Invert Colors"),
            Effect::Sepia => write!(f, "Sepia"),
        }
    }
}

/// Parses `name` or `name:value`, e.g. `brightness:-50`, `rotate:90`,
/// `invert`.  Brightness defaults to +50 and rotation to 90°.
impl FromStr for Effect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = match s.split_once(':') {
            Some((n, v)) => (n.trim(), Some(v.trim())),
            None => (s.trim(), None),
        };
        match name.to_lowercase().as_str() {
            "brightness" => {
                let delta = match value {
                    Some(v) => v.parse::<i32>().map_err(|e| format!("bad brightness '{}': {}", v, e))?,
                    None => 50,
                };
                Ok(Effect::Brightness { delta })
            }
            "rotate" => {
                let angle = match value {
                    Some(v) => v.parse::<f32>().map_err(|e| format!("bad angle '{}': {}", v, e))?,
                    None => 90.0,
                };
                Ok(Effect::Rotate { angle })
            }
            "invert" => Ok(Effect::Invert),
            "sepia" => Ok(Effect::Sepia),
            other => Err(format!(
                "unknown effect '{}' (expected one of: {})",
                other,
                EFFECT_NAMES.join(", ")
            )),
        }
    }
}

/// Run `transform` over every pixel of `buffer`, rows in parallel.
/// `transform` receives and returns (r, g, b, a) as f32 in 0–255; results are
/// rounded and clamped.
fn apply_pixel_transform<F>(buffer: &mut RgbaImage, transform: F)
where
    F: Fn(f32, f32, f32, f32) -> (f32, f32, f32, f32) + Sync,
{
    let stride = buffer.width() as usize * 4;
    let raw: &mut [u8] = &mut **buffer;
    raw.par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            let (nr, ng, nb, na) = transform(px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32);
            px[0] = nr.round().clamp(0.0, 255.0) as u8;
            px[1] = ng.round().clamp(0.0, 255.0) as u8;
            px[2] = nb.round().clamp(0.0, 255.0) as u8;
            px[3] = na.round().clamp(0.0, 255.0) as u8;
        }
    });
}
