use once_cell::sync::Lazy;
use regex::Regex;

/// Positions the root-domain images are spliced into, one per image, in order.
pub const ROOT_IMAGE_POSITIONS: [usize; 5] = [2, 5, 10, 15, 20];

static SPECIAL_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[&/\\#,+()$~%.'":*?<>{}|—]"#).expect("Failed to compile special chars regex")
});

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));

/// The page title only yields a query when it has visible characters.
pub fn has_title(title: &str) -> bool {
    !title.trim().is_empty()
}

/// Build the page-specific query: drop every case-insensitive occurrence of
/// the domain label, then the special characters. Falls back to the
/// untouched title when nothing is left.
pub fn page_search_query(title: &str, label: &str) -> String {
    let without_label = if label.is_empty() {
        title.to_string()
    } else {
        match Regex::new(&format!("(?i){}", regex::escape(label))) {
            Ok(re) => re.replace_all(title, "").into_owned(),
            Err(_) => title.to_string(),
        }
    };

    let stripped = SPECIAL_CHARS.replace_all(&without_label, "");
    let query = WHITESPACE.replace_all(stripped.trim(), " ").into_owned();

    if query.is_empty() {
        title.to_string()
    } else {
        query
    }
}

/// Splice root-domain images into the page results at [`ROOT_IMAGE_POSITIONS`].
///
/// Each insert happens on the already-grown list. Positions past the end
/// append; missing root images are skipped rather than leaving a hole.
pub fn merge_images(page: Vec<String>, root: &[String]) -> Vec<String> {
    let mut merged = page;

    for (image, &position) in root.iter().zip(ROOT_IMAGE_POSITIONS.iter()) {
        let at = position.min(merged.len());
        merged.insert(at, image.clone());
    }

    merged
}
