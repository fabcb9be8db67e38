use crate::models::{
    ApartmentPatch, ApartmentRecord, NewApartment, Status, MANUAL_URL_PREFIX,
};
use crate::store::{CreateOutcome, JsonFileStore, StoreError};
use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Outcome of submitting a new record
#[derive(Debug, Clone)]
pub struct Submitted {
    /// The stored record, or the already-tracked one for a duplicate url
    pub apartment: ApartmentRecord,
    pub duplicate: bool,
}

/// Boundary operations that change a user's collection
#[derive(Debug, Clone)]
pub struct ApartmentService {
    store: JsonFileStore,
}

impl ApartmentService {
    pub fn new(store: JsonFileStore) -> Self {
        Self { store }
    }

    pub async fn list(&self, user_id: &str) -> ServiceResult<Vec<ApartmentRecord>> {
        Ok(self.store.list(user_id).await?)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> ServiceResult<Option<ApartmentRecord>> {
        Ok(self.store.get(user_id, id).await?)
    }

    /// Assign id, `addedAt` and default status, then save. Records without
    /// a source url get a synthetic manual-entry token.
    pub async fn submit(&self, user_id: &str, new: NewApartment) -> ServiceResult<Submitted> {
        let now = Utc::now();
        let url = match new.url {
            Some(url) if !url.trim().is_empty() => url,
            _ => format!("{}{}", MANUAL_URL_PREFIX, now.timestamp_millis()),
        };

        let record = ApartmentRecord {
            id: Uuid::new_v4().simple().to_string(),
            user_id: user_id.to_string(),
            url,
            price: new.price,
            address: new.address,
            rooms: new.rooms,
            floor: new.floor,
            sqm: new.sqm,
            has_parking: new.has_parking,
            contact_name: new.contact_name,
            contact_phone: new.contact_phone,
            entry_date: new.entry_date,
            image_url: new.image_url,
            description: new.description,
            posted_time: new.posted_time,
            added_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            status: new.status.unwrap_or_default(),
            pros: new.pros,
            cons: new.cons,
            amenities: new.amenities,
            location: new.location,
        };

        debug!(user_id, id = %record.id, url = %record.url, "Submitting apartment");
        match self.store.create(user_id, record).await? {
            CreateOutcome::Created(apartment) => Ok(Submitted {
                apartment,
                duplicate: false,
            }),
            CreateOutcome::Duplicate(apartment) => Ok(Submitted {
                apartment,
                duplicate: true,
            }),
        }
    }

    /// Apply a partial update. An unknown id is a silent no-op (`Ok(None)`).
    pub async fn edit(
        &self,
        user_id: &str,
        patch: ApartmentPatch,
    ) -> ServiceResult<Option<ApartmentRecord>> {
        let id = required_id(patch.id.as_deref())?;
        Ok(self.store.update(user_id, &id, patch).await?)
    }

    /// Kanban move. Callers update their view optimistically before this
    /// completes; the returned record is the persisted state to reconcile
    /// against, `None` meaning the card no longer exists.
    pub async fn change_status(
        &self,
        user_id: &str,
        id: Option<&str>,
        status: Status,
    ) -> ServiceResult<Option<ApartmentRecord>> {
        let id = required_id(id)?;
        info!(user_id, id = %id, %status, "Changing apartment status");
        Ok(self
            .store
            .update(user_id, &id, ApartmentPatch::status(id.clone(), status))
            .await?)
    }

    pub async fn remove(&self, user_id: &str, id: Option<&str>) -> ServiceResult<bool> {
        let id = required_id(id)?;
        Ok(self.store.delete(user_id, &id).await?)
    }
}

fn required_id(id: Option<&str>) -> ServiceResult<String> {
    match id.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ServiceError::Validation("ID is required".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;
    use tempfile::TempDir;

    fn service() -> (TempDir, ApartmentService) {
        let dir = TempDir::new().unwrap();
        let service = ApartmentService::new(JsonFileStore::new(dir.path()));
        (dir, service)
    }

    fn listing(url: &str) -> NewApartment {
        NewApartment {
            url: Some(url.to_string()),
            price: "₪6,500".to_string(),
            address: "Ibn Gabirol 50, Tel Aviv".to_string(),
            rooms: 3.0,
            floor: 2,
            sqm: 75.0,
            pros: vec!["balcony".to_string()],
            location: Some(GeoPoint::new(32.08, 34.78)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn submit_then_get_returns_record_with_defaults() {
        let (_dir, service) = service();
        let submitted = service
            .submit("u1", listing("https://www.yad2.co.il/item/1"))
            .await
            .unwrap();
        assert!(!submitted.duplicate);

        let stored = service
            .get("u1", &submitted.apartment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, submitted.apartment);
        assert!(!stored.id.is_empty());
        assert_eq!(stored.user_id, "u1");
        assert_eq!(stored.status, Status::Active);
        assert_eq!(stored.price, "₪6,500");
        assert_eq!(stored.rooms, 3.0);
        assert_eq!(stored.pros, vec!["balcony".to_string()]);
        assert!(chrono::DateTime::parse_from_rfc3339(&stored.added_at).is_ok());
    }

    #[tokio::test]
    async fn submit_keeps_explicit_status() {
        let (_dir, service) = service();
        let mut new = listing("https://x/1");
        new.status = Some(Status::Contacted);

        let submitted = service.submit("u1", new).await.unwrap();
        assert_eq!(submitted.apartment.status, Status::Contacted);
    }

    #[tokio::test]
    async fn submit_without_url_becomes_manual_entry() {
        let (_dir, service) = service();
        let mut new = listing("");
        new.url = None;

        let first = service.submit("u1", new.clone()).await.unwrap();
        let second = service.submit("u1", new).await.unwrap();

        assert!(first.apartment.is_manual());
        assert!(!second.duplicate);
        assert_ne!(first.apartment.id, second.apartment.id);
        assert_eq!(service.list("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn duplicate_url_reports_existing_record() {
        let (_dir, service) = service();
        let first = service.submit("u1", listing("https://x/1")).await.unwrap();
        let second = service.submit("u1", listing("https://x/1")).await.unwrap();

        assert!(second.duplicate);
        assert_eq!(second.apartment.id, first.apartment.id);
        assert_eq!(service.list("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn edit_requires_id() {
        let (_dir, service) = service();
        let err = service
            .edit("u1", ApartmentPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn change_status_returns_persisted_record() {
        let (_dir, service) = service();
        let id = service
            .submit("u1", listing("https://x/1"))
            .await
            .unwrap()
            .apartment
            .id;

        let moved = service
            .change_status("u1", Some(&id), Status::Irrelevant)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.status, Status::Irrelevant);
        assert_eq!(moved.id, id);

        let missing = service
            .change_status("u1", Some("gone"), Status::Visited)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn remove_requires_id_and_deletes() {
        let (_dir, service) = service();
        let id = service
            .submit("u1", listing("https://x/1"))
            .await
            .unwrap()
            .apartment
            .id;

        assert!(matches!(
            service.remove("u1", Some("  ")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(service.remove("u1", Some(&id)).await.unwrap());
        assert!(service.get("u1", &id).await.unwrap().is_none());
    }
}
