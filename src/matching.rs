use crate::types::HelpRequest;

/// Categories a post is matched on: the multi-category list when present and
/// non-empty, otherwise the legacy single `category`.
pub fn post_categories(request: &HelpRequest) -> &[String] {
    match request.categories.as_deref() {
        Some(categories) if !categories.is_empty() => categories,
        _ => std::slice::from_ref(&request.category),
    }
}

/// OR semantics: a request qualifies when any of its categories is selected.
pub fn request_matches<S: AsRef<str>>(request: &HelpRequest, selection: &[S]) -> bool {
    post_categories(request)
        .iter()
        .any(|category| selection.iter().any(|selected| selected.as_ref() == category))
}

/// Stable filter over a fetched batch; fetch order is preserved.
pub fn filter_requests<S: AsRef<str>>(batch: Vec<HelpRequest>, selection: &[S]) -> Vec<HelpRequest> {
    if selection.is_empty() {
        return Vec::new();
    }

    batch
        .into_iter()
        .filter(|request| request_matches(request, selection))
        .collect()
}
