//! Theme loading: btop-style `theme[key]="value"` files and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Colours for the board and the status sidebar.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Block fill by width: 1, 2, 3, 4+ cells.
    pub blocks: [Color; 4],
    /// Board background.
    pub bg: Color,
    /// Grid dots and borders.
    pub div_line: Color,
    pub main_fg: Color,
    pub title: Color,
    /// Secondary text (help line, empty values).
    pub inactive_fg: Color,
    /// Colour a cleared row flashes before fading out.
    pub flash: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark()
    }
}

impl Theme {
    pub const fn onedark() -> Self {
        Self {
            blocks: [rgb(0x98C379), rgb(0x61AFEF), rgb(0xC678DD), rgb(0xE06C75)],
            bg: rgb(0x282C34),
            div_line: rgb(0x3F444F),
            main_fg: rgb(0xABB2BF),
            title: rgb(0xE5C07B),
            inactive_fg: rgb(0x5C6370),
            flash: rgb(0xFFFFFF),
        }
    }

    /// Load a btop-style theme file. A missing path falls back to One Dark;
    /// keys absent from the file keep their One Dark value.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => Self::from_map(&parse_theme_file(&std::fs::read_to_string(p)?)),
            _ => Self::onedark(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.blocks = [rgb(0x00FF00), rgb(0x0088FF), rgb(0xFF00FF), rgb(0xFF0000)];
                self.main_fg = Color::White;
            }
            crate::Palette::Colorblind => {
                self.blocks = [rgb(0x0077BB), rgb(0xEE7733), rgb(0x009988), rgb(0xEE3377)];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let base = Self::onedark();
        let get = |keys: &[&str], fallback: Color| {
            keys.iter()
                .find_map(|key| map.get(*key).and_then(|v| parse_hex(v).ok()))
                .unwrap_or(fallback)
        };
        Self {
            blocks: [
                get(&["mem_box", "cpu_start"], base.blocks[0]),
                get(&["cpu_box"], base.blocks[1]),
                get(&["net_box"], base.blocks[2]),
                get(&["cpu_end", "temp_end"], base.blocks[3]),
            ],
            bg: get(&["main_bg", "meter_bg"], base.bg),
            div_line: get(&["div_line"], base.div_line),
            main_fg: get(&["main_fg"], base.main_fg),
            title: get(&["title"], base.title),
            inactive_fg: get(&["inactive_fg"], base.inactive_fg),
            flash: get(&["hi_fg"], base.flash),
        }
    }

    /// Fill colour for a block of `width` cells.
    #[inline]
    pub fn block_color(&self, width: usize) -> Color {
        self.blocks[width.clamp(1, 4) - 1]
    }
}

/// Parse a btop-style theme file into a key → value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| {
            let rest = line.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Parse "#RRGGBB" or "#RGB".
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let digits = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let value = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
    match digits.len() {
        6 => Ok(rgb(value)),
        3 => {
            let (r, g, b) = ((value >> 8) & 0xF, (value >> 4) & 0xF, value & 0xF);
            Ok(rgb((r * 17) << 16 | (g * 17) << 8 | b * 17))
        }
        _ => Err(invalid()),
    }
}
