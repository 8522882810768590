//! Packed 24-bit colors.
//!
//! Users write colors as RGB (`0xRRGGBB`); the Chroma service expects
//! `0xBBGGRR`. Keeping the two orders in separate types makes it impossible
//! to push an unconverted config color to a device.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::GlowError;

const MASK_24: u32 = 0x00FF_FFFF;

/// A color in RGB order, as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb(u32);

/// A color in the device's native BGR order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bgr(pub u32);

impl Rgb {
    /// Create from a packed `0xRRGGBB` value; bits above 24 are dropped.
    pub const fn new(packed: u32) -> Self {
        Self(packed & MASK_24)
    }

    pub const fn packed(self) -> u32 {
        self.0
    }

    /// Convert to the device channel order.
    pub const fn to_bgr(self) -> Bgr {
        let r = (self.0 >> 16) & 0xFF;
        let g = (self.0 >> 8) & 0xFF;
        let b = self.0 & 0xFF;
        Bgr((b << 16) | (g << 8) | r)
    }

    /// Format as `#RRGGBB`.
    pub fn to_hex(self) -> String {
        format!("#{:06X}", self.0)
    }
}

impl Bgr {
    pub const OFF: Self = Self(0);

    /// Convert back to configuration channel order.
    pub const fn to_rgb(self) -> Rgb {
        let b = (self.0 >> 16) & 0xFF;
        let g = (self.0 >> 8) & 0xFF;
        let r = self.0 & 0xFF;
        Rgb((r << 16) | (g << 8) | b)
    }
}

impl From<Rgb> for Bgr {
    fn from(rgb: Rgb) -> Self {
        rgb.to_bgr()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

/// Parse a color string.
///
/// Accepted forms: `#RRGGBB`, `0xRRGGBB`, a bare hex string containing at
/// least one `a-f` digit, or plain decimal digits. The result is masked to
/// 24 bits.
impl FromStr for Rgb {
    type Err = GlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || GlowError::InvalidColor(s.to_string());

        let (digits, radix) = if let Some(hex) = trimmed.strip_prefix('#') {
            (hex, 16)
        } else if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            (hex, 16)
        } else if trimmed.chars().all(|c| c.is_ascii_digit()) {
            (trimmed, 10)
        } else {
            (trimmed, 16)
        };

        if digits.is_empty() {
            return Err(invalid());
        }
        u32::from_str_radix(digits, radix)
            .map(Self::new)
            .map_err(|_| invalid())
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RgbVisitor;

        impl Visitor<'_> for RgbVisitor {
            type Value = Rgb;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a color as an integer or a hex/decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Rgb, E> {
                Ok(Rgb::new((v & u64::from(MASK_24)) as u32))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Rgb, E> {
                if v < 0 {
                    return Err(E::custom(format!("negative color value {v}")));
                }
                self.visit_u64(v as u64)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Rgb, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(RgbVisitor)
    }
}
