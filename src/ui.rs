//! Presentation surface. `render` is a pure function of selection, match
//! state and display mode; `paint` applies the theme for a terminal.

use crossterm::style::{Color, Stylize, style};

use crate::categories::{all_categories, lookup, main_categories};
use crate::matcher::MatchState;
use crate::matching::post_categories;
use crate::theme::{DisplayMode, Theme};
use crate::types::{CategoryId, HelpRequest};

const DESCRIPTION_MAX_CHARS: usize = 140;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LineStyle {
    Header,
    Text,
    Muted,
    Selected,
    Unselected,
    Summary,
    Title,
    Requester,
    Badge,
    Danger,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Line {
    pub text: String,
    pub style: LineStyle,
}

impl Line {
    fn new(style: LineStyle, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

pub struct ViewModel<'a> {
    pub selection: &'a [CategoryId],
    pub matches: &'a MatchState,
    pub mode: DisplayMode,
}

pub fn render(view: &ViewModel<'_>) -> Vec<Line> {
    let mut lines = vec![
        Line::new(
            LineStyle::Header,
            format!("🤝 I Want to Help  [{}]", view.mode.as_str()),
        ),
        Line::new(
            LineStyle::Muted,
            "Select the categories you can help with and see the open requests.",
        ),
        Line::new(LineStyle::Text, ""),
    ];

    let is_selected = |id: &str| view.selection.iter().any(|selected| selected == id);

    for category in main_categories() {
        lines.push(category_line(
            category.glyph,
            category.label,
            category.id,
            is_selected(category.id),
        ));
    }
    let others = all_categories()
        .iter()
        .filter(|category| !category.is_main)
        .map(|category| {
            let marker = if is_selected(category.id) { "*" } else { "" };
            format!("{} {}{marker}", category.glyph, category.id)
        })
        .collect::<Vec<_>>()
        .join("  ");
    lines.push(Line::new(LineStyle::Muted, format!("More: {others}")));

    if view.selection.is_empty() {
        lines.push(Line::new(LineStyle::Text, ""));
        lines.push(offer_line());
        return lines;
    }

    lines.push(Line::new(LineStyle::Text, ""));
    lines.push(Line::new(LineStyle::Summary, selection_summary(view.selection)));
    lines.push(Line::new(LineStyle::Text, ""));
    lines.push(Line::new(LineStyle::Header, "📋 Open help requests"));

    if view.matches.loading {
        lines.push(Line::new(LineStyle::Muted, "Loading..."));
    } else if view.matches.results.is_empty() {
        lines.push(Line::new(
            LineStyle::Muted,
            "No requests found for the selected categories.",
        ));
    } else {
        for (index, request) in view.matches.results.iter().enumerate() {
            lines.extend(request_lines(index + 1, request));
        }
    }

    if let Some(error) = view.matches.last_error.as_deref() {
        lines.push(Line::new(
            LineStyle::Danger,
            format!("⚠ Could not refresh requests: {error}"),
        ));
    }

    lines.push(Line::new(
        LineStyle::Muted,
        "Pick a request (chat <n>) to start a conversation and offer help.",
    ));
    lines.push(Line::new(LineStyle::Text, ""));
    lines.push(offer_line());
    lines
}

pub fn selection_summary(selection: &[CategoryId]) -> String {
    let noun = if selection.len() == 1 {
        "category selected"
    } else {
        "categories selected"
    };
    let glyphs = selection
        .iter()
        .map(|id| lookup(id).glyph)
        .collect::<Vec<_>>()
        .join(" ");
    format!("✓ {} {noun}: {glyphs}", selection.len())
}

fn category_line(glyph: &str, label: &str, id: &str, selected: bool) -> Line {
    let (marker, style) = if selected {
        ("[x]", LineStyle::Selected)
    } else {
        ("[ ]", LineStyle::Unselected)
    };
    Line::new(style, format!("  {marker} {glyph} {label} ({id})"))
}

fn request_lines(position: usize, request: &HelpRequest) -> Vec<Line> {
    let mut lines = vec![
        Line::new(
            LineStyle::Requester,
            format!(
                "[{position}] ({}) {} · needs help",
                request.requester_initial(),
                request.requester_name()
            ),
        ),
        Line::new(LineStyle::Title, format!("    {}", request.title)),
    ];
    if !request.description.trim().is_empty() {
        lines.push(Line::new(
            LineStyle::Text,
            format!(
                "    {}",
                truncate_chars(request.description.trim(), DESCRIPTION_MAX_CHARS)
            ),
        ));
    }
    lines.push(Line::new(
        LineStyle::Badge,
        format!("    {}", lookup(badge_category(request)).badge()),
    ));
    lines
}

/// Legacy category, or the first tagged one when the legacy field is blank.
fn badge_category(request: &HelpRequest) -> &str {
    match request.category.as_str() {
        "" => post_categories(request)
            .first()
            .map(String::as_str)
            .unwrap_or_default(),
        legacy => legacy,
    }
}

fn offer_line() -> Line {
    Line::new(
        LineStyle::Muted,
        "+ Prefer to publish a public help offer instead? (home)",
    )
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

/// Renders lines for a terminal, coloured by the mode's palette.
pub fn paint(lines: &[Line], mode: DisplayMode, color: bool) -> String {
    let theme = Theme::from_mode(mode);
    let mut out = String::new();
    for line in lines {
        if color && !line.text.is_empty() {
            let styled = style(line.text.as_str()).with(line_color(&theme, line.style));
            out.push_str(&styled.to_string());
        } else {
            out.push_str(&line.text);
        }
        out.push('\n');
    }
    out
}

fn line_color(theme: &Theme, line_style: LineStyle) -> Color {
    match line_style {
        LineStyle::Header => theme.base.header,
        LineStyle::Text => theme.base.text,
        LineStyle::Muted => theme.base.text_muted,
        LineStyle::Selected => theme.selection.selected,
        LineStyle::Unselected => theme.selection.unselected,
        LineStyle::Summary => theme.selection.summary,
        LineStyle::Title => theme.card.title,
        LineStyle::Requester => theme.card.requester,
        LineStyle::Badge => theme.card.badge,
        LineStyle::Danger => theme.base.danger,
    }
}
