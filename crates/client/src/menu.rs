//! Menu fetch and photo-id caching.
//!
//! The API client already caches menu payloads in memory; this module adds
//! the durable side: photo ids are persisted under
//! [`keys::MENU_ITEM_PHOTO_IDS`] so the UI can resolve thumbnails without a
//! fresh fetch.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::instrument;

use tableside_core::AccessToken;

use crate::api::OrderApiClient;
use crate::api::types::MenuItem;
use crate::error::ClientError;
use crate::storage::{self, KeyValueStorage, StorageError, keys};

/// Mapping from item display name to its photo id.
pub type PhotoIds = BTreeMap<String, String>;

/// Collect the photo ids present on a menu.
fn photo_ids(items: &[MenuItem]) -> PhotoIds {
    items
        .iter()
        .filter_map(|item| {
            item.photo_id
                .as_ref()
                .map(|id| (item.name.clone(), id.clone()))
        })
        .collect()
}

/// Fetch the menu and persist its photo ids.
///
/// A menu without any photo ids leaves the previously persisted mapping in
/// place rather than wiping it.
///
/// # Errors
///
/// Propagates API and storage failures.
#[instrument(skip_all)]
pub async fn fetch_menu(
    api: &OrderApiClient,
    storage: &dyn KeyValueStorage,
    token: &AccessToken,
) -> Result<Arc<Vec<MenuItem>>, ClientError> {
    let menu = api.fetch_menu(token).await?;

    let ids = photo_ids(&menu);
    if !ids.is_empty() {
        storage::set_json(storage, keys::MENU_ITEM_PHOTO_IDS, &ids)?;
    }

    Ok(menu)
}

/// Read the persisted photo-id mapping, if any.
///
/// # Errors
///
/// Returns `StorageError` if the persisted mapping cannot be read.
pub fn cached_photo_ids(storage: &dyn KeyValueStorage) -> Result<PhotoIds, StorageError> {
    Ok(storage::get_json(storage, keys::MENU_ITEM_PHOTO_IDS)?.unwrap_or_default())
}
