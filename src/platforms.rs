use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

pub const TITLE_PLACEHOLDER: &str = "{title}";

/// How a platform's search endpoint expects spaces in a title.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceEncoding {
    #[default]
    Percent,
    Hyphen,
    Plus,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub id: String,
    pub display_name: String,
    pub search_url_template: String,
    #[serde(default)]
    pub space_encoding: SpaceEncoding,
    /// Key under which a movie stores its direct link for this platform.
    #[serde(default)]
    pub link_key: String,
    /// Lower-case provider names (as reported by TMDB) that map onto this platform.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Platform {
    fn new(
        id: &str,
        display_name: &str,
        search_url_template: &str,
        space_encoding: SpaceEncoding,
        aliases: &[&str],
    ) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            search_url_template: search_url_template.to_string(),
            space_encoding,
            link_key: id.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// `scheme://host` of the search template.
    pub fn base_url(&self) -> &str {
        &self.search_url_template[..self.host_end()]
    }

    fn host_end(&self) -> usize {
        let template = self.search_url_template.as_str();
        let host_start = template.find("://").map(|i| i + 3).unwrap_or(0);
        template[host_start..]
            .find(['/', '?', '#'])
            .map(|i| host_start + i)
            .unwrap_or(template.len())
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.id.trim().is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if !self.search_url_template.contains(TITLE_PLACEHOLDER) {
            return Err(RegistryError::MissingPlaceholder { platform: self.id.clone() });
        }
        let template = self.search_url_template.as_str();
        if !(template.starts_with("https://") || template.starts_with("http://")) {
            return Err(RegistryError::InvalidScheme { platform: self.id.clone() });
        }
        // Search URLs must stay on the platform's host.
        if template.find(TITLE_PLACEHOLDER).is_some_and(|i| i < self.host_end()) {
            return Err(RegistryError::PlaceholderInHost { platform: self.id.clone() });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("platform id must not be empty")]
    EmptyId,
    #[error("duplicate platform id `{0}`")]
    DuplicateId(String),
    #[error("search template for `{platform}` is missing the {{title}} placeholder")]
    MissingPlaceholder { platform: String },
    #[error("search template for `{platform}` must be an http(s) URL")]
    InvalidScheme { platform: String },
    #[error("search template for `{platform}` puts the {{title}} placeholder in the host")]
    PlaceholderInHost { platform: String },
    #[error("failed to read platform table: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse platform table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Ordered, validated table of streaming platforms. Order is display priority.
#[derive(Clone, Debug)]
pub struct PlatformRegistry {
    platforms: Vec<Platform>,
}

impl PlatformRegistry {
    pub fn new(platforms: Vec<Platform>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        let mut platforms = platforms;
        for platform in &mut platforms {
            platform.validate()?;
            if !seen.insert(platform.id.clone()) {
                return Err(RegistryError::DuplicateId(platform.id.clone()));
            }
            if platform.link_key.trim().is_empty() {
                platform.link_key = platform.id.clone();
            }
            for alias in &mut platform.aliases {
                *alias = alias.trim().to_lowercase();
            }
            platform.aliases.retain(|a| !a.is_empty());
        }
        Ok(Self { platforms })
    }

    pub fn builtin() -> Self {
        use SpaceEncoding::*;

        let platforms = vec![
            Platform::new(
                "netflix",
                "Netflix",
                "https://www.netflix.com/search?q={title}",
                Percent,
                &["netflix"],
            ),
            Platform::new(
                "prime",
                "Prime Video",
                "https://www.primevideo.com/search/ref=atv_nb_sr?phrase={title}",
                Percent,
                &["amazon prime video", "prime video", "amazon video"],
            ),
            Platform::new(
                "hotstar",
                "JioHotstar",
                "https://www.hotstar.com/in/search?q={title}",
                Percent,
                &["hotstar", "disney plus hotstar", "jiohotstar"],
            ),
            Platform::new(
                "jiocinema",
                "JioCinema",
                "https://www.jiocinema.com/search/{title}",
                Hyphen,
                &["jiocinema", "jio cinema"],
            ),
            Platform::new(
                "zee5",
                "ZEE5",
                "https://www.zee5.com/search?q={title}",
                Percent,
                &["zee5"],
            ),
            Platform::new(
                "sonyliv",
                "SonyLIV",
                "https://www.sonyliv.com/search?searchTerm={title}",
                Percent,
                &["sony liv", "sonyliv"],
            ),
            Platform::new(
                "aha",
                "aha",
                "https://www.aha.video/search?q={title}",
                Percent,
                &["aha"],
            ),
            Platform::new(
                "youtube",
                "YouTube",
                "https://www.youtube.com/results?search_query={title}",
                Plus,
                &["youtube"],
            ),
        ];

        Self { platforms }
    }

    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let platforms: Vec<Platform> = serde_json::from_str(json)?;
        Self::new(platforms)
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn get(&self, id: &str) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.id == id)
    }

    /// Maps a provider name such as "Amazon Prime Video" onto a registry platform.
    pub fn match_provider(&self, provider_name: &str) -> Option<&Platform> {
        let name = provider_name.trim().to_lowercase();
        if name.is_empty() {
            return None;
        }
        self.platforms
            .iter()
            .find(|p| p.id == name || p.aliases.iter().any(|alias| name.contains(alias.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_passes_validation() {
        let builtin = PlatformRegistry::builtin();
        let validated = PlatformRegistry::new(builtin.platforms().to_vec()).unwrap();
        assert_eq!(validated.platforms(), builtin.platforms());
        assert_eq!(builtin.platforms()[0].id, "netflix");
    }

    #[test]
    fn json_table_keeps_configured_order_and_defaults_link_key() {
        let json = r#"[
            {"id": "zee5", "display_name": "ZEE5", "search_url_template": "https://www.zee5.com/search?q={title}"},
            {"id": "aha", "display_name": "aha", "search_url_template": "https://www.aha.video/search/{title}",
             "space_encoding": "hyphen", "link_key": "aha_url", "aliases": [" AHA "]}
        ]"#;
        let registry = PlatformRegistry::from_json(json).unwrap();
        let ids: Vec<_> = registry.platforms().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["zee5", "aha"]);
        assert_eq!(registry.get("zee5").unwrap().link_key, "zee5");
        assert_eq!(registry.get("zee5").unwrap().space_encoding, SpaceEncoding::Percent);
        assert_eq!(registry.get("aha").unwrap().link_key, "aha_url");
        assert_eq!(registry.get("aha").unwrap().aliases, ["aha"]);
    }

    #[test]
    fn template_without_placeholder_is_rejected_at_load() {
        let json = r#"[{"id": "netflix", "display_name": "Netflix", "search_url_template": "https://www.netflix.com/search"}]"#;
        let err = PlatformRegistry::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::MissingPlaceholder { ref platform } if platform == "netflix"
        ));
    }

    #[test]
    fn duplicate_ids_and_bad_schemes_are_rejected() {
        let dup = r#"[
            {"id": "aha", "display_name": "aha", "search_url_template": "https://a.example/{title}"},
            {"id": "aha", "display_name": "aha 2", "search_url_template": "https://b.example/{title}"}
        ]"#;
        assert!(matches!(
            PlatformRegistry::from_json(dup),
            Err(RegistryError::DuplicateId(id)) if id == "aha"
        ));

        let ftp = r#"[{"id": "x", "display_name": "X", "search_url_template": "ftp://x.example/{title}"}]"#;
        let err = PlatformRegistry::from_json(ftp);
        assert!(matches!(err, Err(RegistryError::InvalidScheme { .. })));

        assert!(matches!(PlatformRegistry::from_json("{"), Err(RegistryError::Parse(_))));
    }

    #[test]
    fn placeholder_must_follow_the_host() {
        let templates = [
            "https://{title}.example.com/",
            "https://www.example.com{title}",
            "http://x{title}?q=1",
        ];
        for template in templates {
            let json = format!(
                r#"[{{"id": "x", "display_name": "X", "search_url_template": "{template}"}}]"#
            );
            assert!(
                matches!(
                    PlatformRegistry::from_json(&json),
                    Err(RegistryError::PlaceholderInHost { ref platform }) if platform == "x"
                ),
                "{template} should be rejected"
            );
        }

        let ok = r#"[{"id": "x", "display_name": "X", "search_url_template": "https://x.example/s/{title}"}]"#;
        let registry = PlatformRegistry::from_json(ok).unwrap();
        assert_eq!(registry.get("x").unwrap().base_url(), "https://x.example");
    }

    #[test]
    fn provider_names_map_through_aliases() {
        let registry = PlatformRegistry::builtin();
        assert_eq!(registry.match_provider("Amazon Prime Video").unwrap().id, "prime");
        assert_eq!(registry.match_provider("Netflix basic with Ads").unwrap().id, "netflix");
        assert_eq!(registry.match_provider("Sony LIV").unwrap().id, "sonyliv");
        assert!(registry.match_provider("Mubi").is_none());
        assert!(registry.match_provider("  ").is_none());
    }

    #[test]
    fn base_url_is_scheme_and_host() {
        let registry = PlatformRegistry::builtin();
        assert_eq!(registry.get("netflix").unwrap().base_url(), "https://www.netflix.com");
        assert_eq!(registry.get("jiocinema").unwrap().base_url(), "https://www.jiocinema.com");
    }
}
