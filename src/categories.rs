//! Static help-category taxonomy.

use serde::Serialize;

/// Glyph used for category ids that are not part of the taxonomy.
pub const FALLBACK_GLYPH: &str = "📝";

const MAIN_CATEGORY_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct Category {
    pub id: &'static str,
    pub label: &'static str,
    pub glyph: &'static str,
    pub is_main: bool,
}

static ALL_CATEGORIES: [Category; 10] = [
    Category {
        id: "social",
        label: "Social",
        glyph: "🤝",
        is_main: true,
    },
    Category {
        id: "clothes",
        label: "Clothes",
        glyph: "👕",
        is_main: true,
    },
    Category {
        id: "furniture",
        label: "Furniture",
        glyph: "🪑",
        is_main: true,
    },
    Category {
        id: "transport",
        label: "Transport",
        glyph: "🚗",
        is_main: true,
    },
    Category {
        id: "food",
        label: "Food",
        glyph: "🍽️",
        is_main: false,
    },
    Category {
        id: "legal",
        label: "Legal",
        glyph: "⚖️",
        is_main: false,
    },
    Category {
        id: "health",
        label: "Health",
        glyph: "🏥",
        is_main: false,
    },
    Category {
        id: "housing",
        label: "Housing",
        glyph: "🏠",
        is_main: false,
    },
    Category {
        id: "work",
        label: "Work",
        glyph: "💼",
        is_main: false,
    },
    Category {
        id: "education",
        label: "Education",
        glyph: "📚",
        is_main: false,
    },
];

pub fn all_categories() -> &'static [Category] {
    &ALL_CATEGORIES
}

/// The compact selector grid: a prefix of [`all_categories`].
pub fn main_categories() -> &'static [Category] {
    &ALL_CATEGORIES[..MAIN_CATEGORY_COUNT]
}

pub fn is_known(id: &str) -> bool {
    ALL_CATEGORIES.iter().any(|category| category.id == id)
}

/// Display metadata for a category id. Never fails: unknown ids resolve to
/// the fallback glyph with the id itself as label.
pub fn lookup(id: &str) -> CategoryInfo {
    match ALL_CATEGORIES.iter().find(|category| category.id == id) {
        Some(category) => CategoryInfo {
            id: category.id.to_string(),
            label: category.label.to_string(),
            glyph: category.glyph.to_string(),
            known: true,
        },
        None => CategoryInfo {
            id: id.to_string(),
            label: id.to_string(),
            glyph: FALLBACK_GLYPH.to_string(),
            known: false,
        },
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct CategoryInfo {
    pub id: String,
    pub label: String,
    pub glyph: String,
    pub known: bool,
}

impl CategoryInfo {
    pub fn badge(&self) -> String {
        format!("{} {}", self.glyph, self.label)
    }
}
