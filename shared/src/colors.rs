use serde::{Deserialize, Serialize};

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Parse `#rrggbb`, `rrggbb` or the short `#rgb` form.
pub fn parse_hex_color(hex: &str) -> Option<Rgb> {
    let hex = hex.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Rgb(r, g, b))
        }
        3 => {
            let mut channels = [0u8; 3];
            for (slot, digit) in channels.iter_mut().zip(hex.chars()) {
                let v = digit.to_digit(16)? as u8;
                *slot = v * 17;
            }
            Some(Rgb(channels[0], channels[1], channels[2]))
        }
        _ => None,
    }
}

/// Deterministic color via CRC32 hash of a key, for layers with an unusable color.
pub fn fallback_color(key: &str) -> Rgb {
    let hash = crc32fast::hash(key.as_bytes());
    let bytes = hash.to_be_bytes();
    Rgb(bytes[0], bytes[1], bytes[2])
}

/// Layer color, falling back to a stable per-id color when unparseable.
pub fn layer_color(color: &str, layer_id: &str) -> Rgb {
    parse_hex_color(color).unwrap_or_else(|| {
        tracing::warn!(layer = layer_id, color, "unparseable layer color, using fallback");
        fallback_color(layer_id)
    })
}
