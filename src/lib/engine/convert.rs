use std::collections::HashMap;

use bollard::models::{CreateImageInfo, ImageSearchResponseItem, ImageSummary};

use super::types::PullProgress;
use crate::models::{
    Image,
    reference::{DEFAULT_TAG, parse_reference, short_id},
};

const UNTAGGED: &str = "<none>:<none>";

/// One `Image` per repo tag of a local image. Dangling images produce none.
pub fn images_from_summary(summary: &ImageSummary) -> Vec<Image> {
    let short = short_id(&summary.id);

    summary
        .repo_tags
        .iter()
        .filter(|reference| reference.as_str() != UNTAGGED)
        .filter_map(|reference| match parse_reference(reference) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!("Skipping tag of image {}: {}", summary.id, e);
                None
            }
        })
        .map(|(name, tag)| {
            let mut image = Image::new(
                summary.id.clone(),
                name,
                short.clone(),
                summary.labels.clone(),
                tag,
            );
            image.is_pulled = Some(true);
            image
        })
        .collect()
}

/// Hub results carry no digest, so the repository name doubles as the id.
pub fn image_from_search(item: ImageSearchResponseItem) -> Option<Image> {
    let name = item.name.filter(|name| !name.is_empty())?;

    let mut image = Image::new(
        name.clone(),
        name.clone(),
        name,
        HashMap::new(),
        DEFAULT_TAG,
    );
    image.star_count = item.star_count.and_then(|count| u64::try_from(count).ok());
    image.is_official = item.is_official;
    image.description = item.description;
    Some(image)
}

impl From<CreateImageInfo> for PullProgress {
    fn from(info: CreateImageInfo) -> Self {
        PullProgress {
            id: info.id,
            status: info.status,
            progress: info.progress,
        }
    }
}
