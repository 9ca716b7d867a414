use serde::Deserialize;

use crate::{error::AppResult, models::Enrichment};

/// Overviews shorter than this are replaced by OMDb's plot.
const MIN_OVERVIEW_LEN: usize = 10;

pub struct OmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OmdbClient {
    pub fn new(client: reqwest::Client, api_key: String, base_url: String) -> Self {
        Self { client, api_key, base_url }
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Layers IMDb rating, plot, and certification over a TMDB enrichment.
    /// Does nothing without an API key or an IMDb id.
    pub async fn refine(&self, patch: &mut Enrichment) -> AppResult<()> {
        let Some(imdb_id) = patch.imdb_id.clone() else {
            return Ok(());
        };
        if !self.is_enabled() {
            return Ok(());
        }

        let resp: OmdbResponse = self
            .client
            .get(self.base_url.trim_end_matches('/'))
            .query(&[("i", imdb_id.as_str()), ("apikey", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        apply(patch, resp);
        Ok(())
    }
}

fn apply(patch: &mut Enrichment, resp: OmdbResponse) {
    if resp.response != "True" {
        return;
    }
    if let Some(rating) = resp.imdb_rating.as_deref().and_then(|r| r.parse::<f64>().ok()) {
        patch.rating = Some(rating);
    }
    let short = patch.overview.as_deref().is_none_or(|o| o.trim().len() < MIN_OVERVIEW_LEN);
    if short {
        if let Some(plot) = resp.plot.filter(|p| p != "N/A" && !p.trim().is_empty()) {
            patch.overview = Some(plot);
        }
    }
    if let Some(rated) = resp.rated.filter(|r| r != "N/A" && !r.trim().is_empty()) {
        patch.certification = Some(rated);
    }
}

#[derive(Debug, Deserialize)]
struct OmdbResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "Rated")]
    rated: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> OmdbResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn imdb_values_override_tmdb() {
        let mut patch = Enrichment {
            overview: Some("TBD".to_string()),
            rating: Some(6.8),
            ..Default::default()
        };
        let found = r#"{"Response": "True", "imdbRating": "7.9",
                        "Plot": "A village strongman.", "Rated": "UA"}"#;
        apply(&mut patch, response(found));
        assert_eq!(patch.rating, Some(7.9));
        assert_eq!(patch.overview.as_deref(), Some("A village strongman."));
        assert_eq!(patch.certification.as_deref(), Some("UA"));
    }

    #[test]
    fn not_available_values_are_ignored() {
        let mut patch = Enrichment {
            overview: Some("A long enough TMDB overview.".to_string()),
            rating: Some(6.8),
            ..Default::default()
        };
        let sparse =
            r#"{"Response": "True", "imdbRating": "N/A", "Plot": "Short plot.", "Rated": "N/A"}"#;
        apply(&mut patch, response(sparse));
        assert_eq!(patch.rating, Some(6.8));
        assert_eq!(patch.overview.as_deref(), Some("A long enough TMDB overview."));
        assert_eq!(patch.certification, None);

        apply(&mut patch, response(r#"{"Response": "False", "Error": "Movie not found!"}"#));
        assert_eq!(patch.rating, Some(6.8));
    }
}
