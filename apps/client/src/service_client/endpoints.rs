use reqwest::Url;

use crate::errors::ConfigError;

/// Endpoint URLs derived from the injected service base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    base: Url,
}

impl ServiceEndpoints {
    pub fn new(base: Url) -> Result<Self, ConfigError> {
        if base.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl {
                value: base.to_string(),
                reason: "URL cannot carry a path".to_string(),
            });
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// POST: job-opening creation.
    pub fn job_opening_create(&self) -> Url {
        self.join(&["job-opening", "create"])
    }

    /// POST: job-seeker profile upload.
    pub fn job_seeker_upload(&self) -> Url {
        self.join(&["job-seeker", "upload"])
    }

    /// GET: rendered similarity graph for an entity.
    pub fn visualization(&self, entity_id: &str) -> Url {
        self.join(&["visualization", entity_id])
    }

    pub fn matches(&self, entity_id: &str) -> Url {
        self.join(&["matches", entity_id])
    }

    // Segments are percent-encoded, so an identifier can never escape its path slot.
    fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}
