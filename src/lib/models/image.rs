use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::{ModelResult, require};

/// A container image as shown by the listing and search views.
///
/// Optional fields stay `None` when the source has no answer for them. They
/// are never defaulted to `false`, `0` or an empty string, and they are left
/// out of the JSON form entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub name: String,
    pub short_id: String,
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_official: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pulled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pulling: Option<bool>,
    pub tag: String,
}

impl Image {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        short_id: impl Into<String>,
        labels: HashMap<String, String>,
        tag: impl Into<String>,
    ) -> Self {
        Image {
            id: id.into(),
            name: name.into(),
            short_id: short_id.into(),
            labels,
            star_count: None,
            is_official: None,
            description: None,
            is_pulled: None,
            is_pulling: None,
            tag: tag.into(),
        }
    }

    /// Parses and validates an image coming in from outside the process.
    pub fn from_json(raw: &str) -> ModelResult<Self> {
        let image: Image = serde_json::from_str(raw)?;
        image.validate()?;
        Ok(image)
    }

    pub fn validate(&self) -> ModelResult<()> {
        require("id", &self.id)?;
        require("name", &self.name)?;
        require("short_id", &self.short_id)?;
        require("tag", &self.tag)?;
        Ok(())
    }

    pub fn reference(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }

    /// False when the image claims to be both pulled and mid-pull.
    ///
    /// The shape itself allows that combination; this only reports it.
    pub fn is_consistent(&self) -> bool {
        !(self.is_pulled == Some(true) && self.is_pulling == Some(true))
    }

    pub fn start_pulling(&mut self) {
        self.is_pulling = Some(true);
        self.is_pulled = Some(false);
    }

    pub fn finish_pulling(&mut self) {
        self.is_pulling = Some(false);
        self.is_pulled = Some(true);
    }
}
