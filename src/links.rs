use serde::Serialize;

use crate::{
    models::Movie,
    platforms::{Platform, PlatformRegistry, SpaceEncoding, TITLE_PLACEHOLDER},
};

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResolvedLink {
    pub platform_id: String,
    pub platform_name: String,
    pub url: String,
    pub is_direct: bool,
}

/// One link per registered platform, in registry order. A stored direct link
/// wins; otherwise the platform's search page for the title.
pub fn resolve_links(registry: &PlatformRegistry, movie: &Movie) -> Vec<ResolvedLink> {
    registry
        .platforms()
        .iter()
        .map(|platform| {
            let (url, is_direct) = match movie.direct_link(&platform.link_key) {
                Some(direct) => (direct.to_string(), true),
                None => (search_url(platform, &movie.title), false),
            };
            ResolvedLink {
                platform_id: platform.id.clone(),
                platform_name: platform.display_name.clone(),
                url,
                is_direct,
            }
        })
        .collect()
}

pub fn search_url(platform: &Platform, title: &str) -> String {
    platform
        .search_url_template
        .replace(TITLE_PLACEHOLDER, &encode_title(title, platform.space_encoding))
}

pub fn encode_title(title: &str, encoding: SpaceEncoding) -> String {
    let separator = match encoding {
        SpaceEncoding::Percent => "%20",
        SpaceEncoding::Hyphen => "-",
        SpaceEncoding::Plus => "+",
    };
    title.split_whitespace().map(urlencoding::encode).collect::<Vec<_>>().join(separator)
}
