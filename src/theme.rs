use std::fs;
use std::path::Path;

use ratatui::style::Color;
use serde::Deserialize;

use crate::line::LineKind;

const RED: Color = Color::Rgb(248, 113, 113);
const BLUE: Color = Color::Rgb(96, 165, 250);
const GRAY: Color = Color::Rgb(209, 213, 219);
const YELLOW: Color = Color::Rgb(250, 204, 21);
const GREEN: Color = Color::Rgb(74, 222, 128);
const PALE_GREEN: Color = Color::Rgb(187, 247, 208);
const WHITE: Color = Color::Rgb(255, 255, 255);

#[derive(Debug, Clone)]
pub struct Theme {
    pub app_bg: Color,
    pub header_bg: Color,
    pub input_bg: Color,
    pub overlay_bg: Color,
    pub text_fg: Color,
    pub muted_fg: Color,
    pub title_fg: Color,
    pub prompt_fg: Color,
    pub accent_fg: Color,
    pub selected_bg: Color,
    pub highlight_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            app_bg: Color::Rgb(24, 24, 27),
            header_bg: Color::Rgb(16, 16, 17),
            input_bg: Color::Rgb(32, 32, 36),
            overlay_bg: Color::Rgb(31, 41, 55),
            text_fg: Color::Rgb(229, 231, 235),
            muted_fg: Color::Rgb(156, 163, 175),
            title_fg: Color::Rgb(145, 70, 255),
            prompt_fg: Color::Rgb(34, 211, 238),
            accent_fg: Color::Rgb(169, 112, 255),
            selected_bg: Color::Rgb(255, 255, 255),
            highlight_bg: Color::Rgb(88, 28, 135),
        }
    }
}

impl Theme {
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path_ref = path.as_ref();
        match fs::read_to_string(path_ref) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(theme) => theme,
                Err(err) => {
                    tracing::warn!(path = %path_ref.display(), %err, "invalid theme, using defaults");
                    Self::default()
                }
            },
            Err(err) => {
                tracing::debug!(path = %path_ref.display(), %err, "no theme file, using defaults");
                Self::default()
            }
        }
    }

    /// Parses `[colors]` entries given as `"#rrggbb"`. Missing entries keep
    /// their default.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        let cfg: ThemeToml = toml::from_str(s)?;
        let mut theme = Self::default();
        let colors = cfg.colors;
        let slots = [
            (colors.app_bg, &mut theme.app_bg),
            (colors.header_bg, &mut theme.header_bg),
            (colors.input_bg, &mut theme.input_bg),
            (colors.overlay_bg, &mut theme.overlay_bg),
            (colors.text_fg, &mut theme.text_fg),
            (colors.muted_fg, &mut theme.muted_fg),
            (colors.title_fg, &mut theme.title_fg),
            (colors.prompt_fg, &mut theme.prompt_fg),
            (colors.accent_fg, &mut theme.accent_fg),
            (colors.selected_bg, &mut theme.selected_bg),
            (colors.highlight_bg, &mut theme.highlight_bg),
        ];
        for (value, slot) in slots {
            if let Some(color) = value.as_deref().and_then(parse_color) {
                *slot = color;
            }
        }
        Ok(theme)
    }
}

#[derive(Debug, Deserialize)]
struct ThemeToml {
    #[serde(default)]
    colors: ThemeColorsToml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ThemeColorsToml {
    app_bg: Option<String>,
    header_bg: Option<String>,
    input_bg: Option<String>,
    overlay_bg: Option<String>,
    text_fg: Option<String>,
    muted_fg: Option<String>,
    title_fg: Option<String>,
    prompt_fg: Option<String>,
    accent_fg: Option<String>,
    selected_bg: Option<String>,
    highlight_bg: Option<String>,
}

/// Foreground of a line kind. `None` keeps the pane default.
pub fn kind_color(kind: LineKind) -> Option<Color> {
    match kind {
        LineKind::Error | LineKind::MinusOne => Some(RED),
        LineKind::System => Some(BLUE),
        LineKind::Message => Some(GRAY),
        LineKind::FrontendError | LineKind::Warning | LineKind::Info => Some(YELLOW),
        LineKind::Command | LineKind::Success | LineKind::PlusOne | LineKind::Join => Some(GREEN),
        LineKind::Output => Some(WHITE),
        LineKind::Sword => Some(PALE_GREEN),
        LineKind::None => None,
    }
}

/// Single-cell marker drawn before each line.
pub fn kind_icon(kind: LineKind) -> &'static str {
    match kind {
        LineKind::Command => "$",
        LineKind::Error | LineKind::Warning => "▲",
        LineKind::FrontendError => "!",
        LineKind::System => "i",
        LineKind::Message => "≡",
        LineKind::Output => "≡",
        LineKind::Success => "✓",
        LineKind::PlusOne => "+",
        LineKind::MinusOne => "-",
        LineKind::Sword => "⚔",
        LineKind::Info => "O",
        LineKind::None => ">",
        LineKind::Join => "-",
    }
}

const NAMED_COLORS: [(&str, (u8, u8, u8)); 10] = [
    ("black", (0x00, 0x00, 0x00)),
    ("darkblue", (0x00, 0x00, 0x8b)),
    ("darkcyan", (0x00, 0x8b, 0x8b)),
    ("darkgray", (0xa9, 0xa9, 0xa9)),
    ("darkgreen", (0x00, 0x64, 0x00)),
    ("darkgrey", (0xa9, 0xa9, 0xa9)),
    ("darkmagenta", (0x8b, 0x00, 0x8b)),
    ("darkred", (0x8b, 0x00, 0x00)),
    ("darkslategray", (0x2f, 0x4f, 0x4f)),
    ("darkslategrey", (0x2f, 0x4f, 0x4f)),
];

fn parse_rgb(value: &str) -> Option<(u8, u8, u8)> {
    let value = value.trim();
    if let Some((_, rgb)) = NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
    {
        return Some(*rgb);
    }
    if let Some(hex) = value.strip_prefix('#') {
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        return match hex.len() {
            3 => {
                let mut digits = hex.chars().map(|c| c.to_string().repeat(2));
                Some((
                    channel(&digits.next()?)?,
                    channel(&digits.next()?)?,
                    channel(&digits.next()?)?,
                ))
            }
            // #rrggbbaa: alpha is ignored
            6 | 8 => Some((
                channel(hex.get(0..2)?)?,
                channel(hex.get(2..4)?)?,
                channel(hex.get(4..6)?)?,
            )),
            _ => None,
        };
    }
    if value.starts_with("rgb") {
        let mut parts = value
            .split(|c: char| !c.is_ascii_digit())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<u8>().ok());
        return Some((parts.next()??, parts.next()??, parts.next()??));
    }
    None
}

pub fn parse_color(value: &str) -> Option<Color> {
    parse_rgb(value).map(|(r, g, b)| Color::Rgb(r, g, b))
}

/// Adds `percent` of full brightness to each channel of a hex, `rgb()` or
/// named color.
pub fn lighten(value: &str, percent: u8) -> Option<Color> {
    let (r, g, b) = parse_rgb(value)?;
    let amount = (2.55 * f32::from(percent)).round() as u16;
    let up = |c: u8| (u16::from(c) + amount).min(255) as u8;
    Some(Color::Rgb(up(r), up(g), up(b)))
}
