use chrono::Timelike;
use crossterm::style::Color;

const NIGHT_STARTS_AT_HOUR: u32 = 18;
const DAY_STARTS_AT_HOUR: u32 = 6;

/// Global day/night presentation flag.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum DisplayMode {
    #[default]
    Day,
    Night,
}

impl DisplayMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Night => "night",
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Day => Self::Night,
            Self::Night => Self::Day,
        }
    }

    pub fn for_time(now: &impl Timelike) -> Self {
        if is_night_time(now) {
            Self::Night
        } else {
            Self::Day
        }
    }
}

/// Night runs from 18:00 (inclusive) until 06:00 (exclusive), local time.
pub fn is_night_time(now: &impl Timelike) -> bool {
    is_night_hour(now.hour())
}

pub fn is_night_hour(hour: u32) -> bool {
    hour >= NIGHT_STARTS_AT_HOUR || hour < DAY_STARTS_AT_HOUR
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Theme {
    pub base: BasePalette,
    pub card: CardPalette,
    pub selection: SelectionPalette,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct BasePalette {
    pub text: Color,
    pub text_muted: Color,
    pub header: Color,
    pub danger: Color,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CardPalette {
    pub title: Color,
    pub requester: Color,
    pub badge: Color,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SelectionPalette {
    pub selected: Color,
    pub unselected: Color,
    pub summary: Color,
}

impl Theme {
    pub fn from_mode(mode: DisplayMode) -> Self {
        match mode {
            DisplayMode::Night => Self {
                base: BasePalette {
                    text: Color::White,
                    text_muted: Color::DarkGrey,
                    header: Color::Cyan,
                    danger: Color::Red,
                },
                card: CardPalette {
                    title: Color::White,
                    requester: Color::Green,
                    badge: Color::Grey,
                },
                selection: SelectionPalette {
                    selected: Color::Yellow,
                    unselected: Color::DarkGrey,
                    summary: Color::Blue,
                },
            },
            DisplayMode::Day => Self {
                base: BasePalette {
                    text: Color::Rgb { r: 32, g: 38, b: 51 },
                    text_muted: Color::Rgb {
                        r: 95,
                        g: 105,
                        b: 122,
                    },
                    header: Color::Rgb {
                        r: 37,
                        g: 99,
                        b: 235,
                    },
                    danger: Color::Rgb {
                        r: 185,
                        g: 28,
                        b: 28,
                    },
                },
                card: CardPalette {
                    title: Color::Rgb { r: 32, g: 38, b: 51 },
                    requester: Color::Rgb {
                        r: 22,
                        g: 163,
                        b: 74,
                    },
                    badge: Color::Rgb {
                        r: 55,
                        g: 65,
                        b: 81,
                    },
                },
                selection: SelectionPalette {
                    selected: Color::Rgb {
                        r: 217,
                        g: 119,
                        b: 6,
                    },
                    unselected: Color::Rgb {
                        r: 156,
                        g: 163,
                        b: 175,
                    },
                    summary: Color::Rgb {
                        r: 29,
                        g: 78,
                        b: 216,
                    },
                },
            },
        }
    }
}
