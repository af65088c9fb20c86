use crossterm::style::Color;
use serde::{Deserialize, Serialize};

/// Named themes, as stored in the settings file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
    HighContrast,
}

impl ThemeName {
    pub fn next(self) -> Self {
        match self {
            ThemeName::Dark => ThemeName::Light,
            ThemeName::Light => ThemeName::HighContrast,
            ThemeName::HighContrast => ThemeName::Dark,
        }
    }
}

impl std::fmt::Display for ThemeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThemeName::Dark => write!(f, "Dark"),
            ThemeName::Light => write!(f, "Light"),
            ThemeName::HighContrast => write!(f, "High contrast"),
        }
    }
}

/// Color theme for the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    /// Background color
    pub bg: Color,
    /// Default text color
    pub fg: Color,
    /// Unknown cell color
    pub unknown: Color,
    /// Water cell color
    pub water: Color,
    /// Ship cell color (all ship variants)
    pub ship: Color,
    /// Target numbers
    pub target: Color,
    /// Selected cell background
    pub selected_bg: Color,
    /// Highlighted cells (same row/col)
    pub highlight_bg: Color,
    /// Target exceeded
    pub error: Color,
    /// Target met
    pub success: Color,
    /// Status/info text color
    pub info: Color,
    /// Key binding text color
    pub key: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn from_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self::dark(),
            ThemeName::Light => Self::light(),
            ThemeName::HighContrast => Self::high_contrast(),
        }
    }

    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb { r: 20, g: 22, b: 30 },
            fg: Color::Rgb { r: 230, g: 230, b: 240 },
            unknown: Color::Rgb { r: 120, g: 125, b: 140 },
            water: Color::Rgb { r: 80, g: 180, b: 255 },
            ship: Color::Rgb { r: 255, g: 255, b: 255 },
            target: Color::Rgb { r: 255, g: 210, b: 100 },
            selected_bg: Color::Rgb { r: 70, g: 90, b: 140 },
            highlight_bg: Color::Rgb { r: 35, g: 40, b: 55 },
            error: Color::Rgb { r: 255, g: 90, b: 90 },
            success: Color::Rgb { r: 90, g: 255, b: 130 },
            info: Color::Rgb { r: 160, g: 165, b: 185 },
            key: Color::Rgb { r: 255, g: 210, b: 100 },
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            bg: Color::Rgb { r: 248, g: 248, b: 252 },
            fg: Color::Rgb { r: 30, g: 30, b: 40 },
            unknown: Color::Rgb { r: 150, g: 150, b: 165 },
            water: Color::Rgb { r: 30, g: 100, b: 200 },
            ship: Color::Rgb { r: 0, g: 0, b: 0 },
            target: Color::Rgb { r: 200, g: 120, b: 20 },
            selected_bg: Color::Rgb { r: 180, g: 200, b: 255 },
            highlight_bg: Color::Rgb { r: 230, g: 232, b: 242 },
            error: Color::Rgb { r: 220, g: 50, b: 50 },
            success: Color::Rgb { r: 40, g: 160, b: 60 },
            info: Color::Rgb { r: 90, g: 90, b: 110 },
            key: Color::Rgb { r: 200, g: 120, b: 20 },
        }
    }

    /// High contrast theme
    pub fn high_contrast() -> Self {
        Self {
            bg: Color::Black,
            fg: Color::White,
            unknown: Color::Grey,
            water: Color::Cyan,
            ship: Color::Yellow,
            target: Color::White,
            selected_bg: Color::Blue,
            highlight_bg: Color::Rgb { r: 30, g: 30, b: 30 },
            error: Color::Red,
            success: Color::Green,
            info: Color::Grey,
            key: Color::Yellow,
        }
    }
}
