use serde::{Deserialize, Deserializer, Serialize};

pub type CategoryId = String;

/// Server-side post filter for `/api/posts`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    /// Someone asking for help.
    Need,
}

impl PostKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PostKind::Need => "need",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct Requester {
    #[serde(default)]
    pub name: Option<String>,
}

/// A "need" post as returned by the backend. Read-only to this crate.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct HelpRequest {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Legacy single category; may be null on posts that carry `categories`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: CategoryId,
    #[serde(
        default,
        deserialize_with = "category_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub categories: Option<Vec<CategoryId>>,
    #[serde(default)]
    pub user: Option<Requester>,
}

const ANONYMOUS_NAME: &str = "User";
const ANONYMOUS_INITIAL: char = 'U';

impl HelpRequest {
    pub fn requester_name(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|user| user.name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(ANONYMOUS_NAME)
    }

    pub fn requester_initial(&self) -> char {
        self.user
            .as_ref()
            .and_then(|user| user.name.as_deref())
            .and_then(|name| name.trim().chars().next())
            .unwrap_or(ANONYMOUS_INITIAL)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(value) => value,
        RawId::Number(value) => value.to_string(),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Drops null entries so one bad tag does not reject the post.
fn category_list<'de, D>(deserializer: D) -> Result<Option<Vec<CategoryId>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Option<CategoryId>>>::deserialize(deserializer)?;
    Ok(raw.map(|list| list.into_iter().flatten().collect()))
}
