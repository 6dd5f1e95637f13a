use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("Failed to parse title selector"));

static ICON_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [r#"link[rel="shortcut icon"]"#, r#"link[rel="icon"]"#]
        .into_iter()
        .map(|s| Selector::parse(s).expect("Failed to parse icon selector"))
        .collect()
});

/// Metadata scraped from a page's `<head>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaTags {
    pub url: String,
    /// Text of the first `<title>`. May be empty.
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

pub fn get_meta_tags(html: &str, url: &Url) -> MetaTags {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default();

    let favicon = ICON_SELECTORS
        .iter()
        .find_map(|selector| {
            document
                .select(selector)
                .filter_map(|el| el.value().attr("href"))
                .map(str::trim)
                .find(|href| !href.is_empty())
        })
        .and_then(|href| resolve(url, href));

    MetaTags {
        url: url.to_string(),
        title,
        favicon,
        description: meta_tag(&document, "description"),
        image: meta_tag(&document, "image").and_then(|href| resolve(url, &href)),
        author: meta_tag(&document, "author"),
        site_name: meta_tag(&document, "site_name"),
    }
}

/// Look a field up as `name=field`, `name=og:field`, `property=og:field`,
/// then `name=twitter:field`. First non-empty `content` wins.
fn meta_tag(doc: &Html, field: &str) -> Option<String> {
    let candidates = [
        format!(r#"meta[name="{field}"]"#),
        format!(r#"meta[name="og:{field}"]"#),
        format!(r#"meta[property="og:{field}"]"#),
        format!(r#"meta[name="twitter:{field}"]"#),
    ];

    candidates.iter().find_map(|candidate| {
        let selector = Selector::parse(candidate).ok()?;
        doc.select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(|content| content.trim().to_string())
            .find(|content| !content.is_empty())
    })
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    if href.starts_with("data:") {
        log::debug!("inline data urls are not supported");
        return None;
    }

    base.join(href).ok().map(|u| u.to_string())
}
