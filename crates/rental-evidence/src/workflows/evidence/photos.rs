//! Photo capture: upload, append, memo edits and removal.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::catalog::FREE_KEY_PREFIX;
use super::clock::next_after;
use super::domain::{Actor, GeoPoint, PhaseKind, PhotoRecord, RentalId};
use super::errors::{EvidenceError, NotFoundError, ValidationError};
use super::image::ImageFormat;
use super::service::EvidenceService;
use super::store::{EvidenceStore, ListItem, ListKey, ListKind, ListPath, StoreError};

/// Attempts to find a free timestamp before giving up on an append.
const APPEND_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct PhotoUpload {
    /// Catalog key; must be `None` for free-form rentals.
    pub area_key: Option<String>,
    pub image: Vec<u8>,
    pub memo: Option<String>,
    pub location: Option<GeoPoint>,
}

/// Rejects payloads that cannot be a condition photo.
pub fn validate_image(image: &[u8], max_bytes: usize) -> Result<ImageFormat, ValidationError> {
    if image.is_empty() {
        return Err(ValidationError::EmptyImage);
    }
    if image.len() > max_bytes {
        return Err(ValidationError::ImageTooLarge {
            size: image.len(),
            max: max_bytes,
        });
    }
    ImageFormat::sniff(image).ok_or(ValidationError::UnsupportedImageFormat)
}

pub(crate) fn normalize_memo(memo: Option<&str>) -> Option<String> {
    memo.map(str::trim)
        .filter(|memo| !memo.is_empty())
        .map(str::to_string)
}

impl<S> EvidenceService<S>
where
    S: EvidenceStore + 'static,
{
    /// Uploads the image, then appends its record to the phase.
    ///
    /// The blob is written before the list append so an interrupted request leaves at most an
    /// unreferenced blob behind.
    pub async fn add_photo(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
        phase: PhaseKind,
        upload: PhotoUpload,
    ) -> Result<PhotoRecord, EvidenceError> {
        let rental = self.load_for_write(actor, rental_id, "add photos to").await?;
        let format = validate_image(&upload.image, self.config.max_image_bytes)?;
        let catalog = rental.catalog();
        catalog.photo_area_key(upload.area_key.as_deref(), self.now())?;

        let memo = normalize_memo(upload.memo.as_deref());
        let location = upload
            .location
            .and_then(|point| GeoPoint::new(point.latitude, point.longitude));
        let size_bytes = upload.image.len();
        let content_type = format.content_type();
        let blob_path = format!(
            "rentals/{}/{}/photos/{}.{}",
            rental.id,
            phase.slug(),
            Uuid::new_v4().simple(),
            format.extension()
        );

        let image_url = self
            .store
            .upload_blob(&blob_path, upload.image, &content_type)
            .await
            .map_err(|error| EvidenceError::from_store(error, rental_id))?;

        let path = ListPath {
            phase,
            list: ListKind::Photos,
        };
        let mut latest = rental.phase(phase).latest_photo_at();
        for attempt in 1..=APPEND_ATTEMPTS {
            let taken_at = next_after(self.now(), latest);
            let record = PhotoRecord {
                image_url: image_url.clone(),
                content_type: content_type.clone(),
                area_key: catalog.photo_area_key(upload.area_key.as_deref(), taken_at)?,
                taken_at,
                location,
                memo: memo.clone(),
                size_bytes,
            };

            let item = ListItem::Photo {
                phase,
                record: record.clone(),
            };
            match self.store.append_to_list(rental_id, item).await {
                Ok(()) => {
                    info!(
                        rental_id = %rental_id,
                        path = %path,
                        area_key = %record.area_key,
                        size_bytes,
                        located = record.location.is_some(),
                        "photo recorded"
                    );
                    self.note_evidence(&rental, phase).await?;
                    return Ok(record);
                }
                Err(StoreError::Conflict) => {
                    debug!(rental_id = %rental_id, attempt, "photo timestamp taken; retrying");
                    latest = self.load(rental_id).await?.phase(phase).latest_photo_at();
                }
                Err(error) => return Err(EvidenceError::from_store(error, rental_id)),
            }
        }

        Err(EvidenceError::Conflict(path.to_string()))
    }

    /// Replaces a photo's memo. A blank memo clears it.
    pub async fn edit_memo(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
        phase: PhaseKind,
        taken_at: DateTime<Utc>,
        memo: Option<String>,
    ) -> Result<PhotoRecord, EvidenceError> {
        let rental = self.load_for_write(actor, rental_id, "edit photos of").await?;
        let missing = || EvidenceError::from(NotFoundError::Photo { phase, taken_at });

        let mut record = rental
            .phase(phase)
            .photo(taken_at)
            .cloned()
            .ok_or_else(missing)?;
        record.memo = normalize_memo(memo.as_deref());

        let item = ListItem::Photo {
            phase,
            record: record.clone(),
        };
        match self.store.replace_in_list(rental_id, item).await {
            Ok(()) => Ok(record),
            Err(StoreError::NotFound) => Err(missing()),
            Err(error) => Err(EvidenceError::from_store(error, rental_id)),
        }
    }

    /// Removes a photo. Completion timestamps are left untouched.
    pub async fn delete_photo(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
        phase: PhaseKind,
        taken_at: DateTime<Utc>,
    ) -> Result<(), EvidenceError> {
        self.load_for_write(actor, rental_id, "delete photos of").await?;
        match self
            .store
            .remove_from_list(rental_id, ListKey::Photo { phase, taken_at })
            .await
        {
            Ok(()) => {
                info!(rental_id = %rental_id, %phase, taken_at = %taken_at, "photo removed");
                Ok(())
            }
            Err(StoreError::NotFound) => Err(NotFoundError::Photo { phase, taken_at }.into()),
            Err(error) => Err(EvidenceError::from_store(error, rental_id)),
        }
    }

    /// Photos filed under an area, oldest first.
    pub async fn area_photos(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
        phase: PhaseKind,
        area_key: &str,
    ) -> Result<Vec<PhotoRecord>, EvidenceError> {
        let rental = self.load_for_read(actor, rental_id).await?;
        let catalog = rental.catalog();
        let known = catalog.find(area_key).is_some()
            || (catalog.is_free_form() && area_key.starts_with(FREE_KEY_PREFIX));
        if !known {
            return Err(ValidationError::UnknownArea(area_key.to_string()).into());
        }

        Ok(rental
            .phase(phase)
            .photos_for_area(area_key)
            .cloned()
            .collect())
    }
}
