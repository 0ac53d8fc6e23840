//! Local will store
//!
//! `LocalWillStore` keeps each will as a JSON file and each uploaded photo
//! as a plain file under the data directory:
//!
//! ```text
//! <data_dir>/wills/<id>.json
//! <data_dir>/photos/<uuid>.<ext>
//! ```
//!
//! It implements [`WillEndpoint`], so the autosave task can use it directly.
//!
//! ## Usage
//!
//! ```ignore
//! let store = LocalWillStore::open(&config)?;
//! let saved = store.save(SaveRequest::new(None, &values, &Attachment::None))?;
//! let wills = store.list()?;
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::attachment::{Attachment, LocalBlob};
use crate::autosave::{SaveError, SaveRequest, SavedWill, WillEndpoint};
use crate::config::Config;
use crate::models::{parse_date, EducationRecord, WillRecord, WillValues, WorkExperienceRecord};
use crate::permissions::{can_create_will, can_use_customizations, SubscriptionLevel};
use crate::storage::{self, StorageError, StorageResult};
use crate::validation::{validate, validate_photo};

/// File-backed store for wills and their photos
#[derive(Debug, Clone)]
pub struct LocalWillStore {
    wills_dir: PathBuf,
    photos_dir: PathBuf,
    level: SubscriptionLevel,
}

impl LocalWillStore {
    /// Open the store in the configured data directory
    pub fn open(config: &Config) -> StorageResult<Self> {
        let store = Self {
            wills_dir: config.wills_dir(),
            photos_dir: config.photos_dir(),
            level: config.subscription,
        };
        for dir in [&store.wills_dir, &store.photos_dir] {
            fs::create_dir_all(dir).map_err(|source| StorageError::CreateDirectory {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(store)
    }

    /// Store rooted at `root`, without touching the filesystem
    pub fn with_root(root: &Path, level: SubscriptionLevel) -> Self {
        Self {
            wills_dir: root.join("wills"),
            photos_dir: root.join("photos"),
            level,
        }
    }

    pub fn level(&self) -> SubscriptionLevel {
        self.level
    }

    /// Create or update a will
    ///
    /// Without an id a new will is created, subject to the plan's will
    /// limit. Work experience and education lists are replaced wholesale.
    /// The photo is only touched when the request carries one: a pending
    /// blob replaces the stored file, `Attachment::None` removes it.
    pub fn save(&self, request: SaveRequest) -> Result<SavedWill, SaveError> {
        let values = request.values.normalized();
        validate(&values)?;
        if let Some(photo) = &request.photo {
            validate_photo(photo)?;
        }

        let now = Utc::now();
        let mut record = match &request.id {
            Some(id) => self
                .get(id)?
                .ok_or_else(|| SaveError::NotFound(id.clone()))?,
            None => {
                if !can_create_will(self.level, self.count()?) {
                    return Err(SaveError::LimitReached);
                }
                WillRecord::new(Uuid::new_v4().to_string(), now)
            }
        };

        let customizes = sets_new_value(&values.border_style, &record.border_style)
            || sets_new_value(&values.color_hex, &record.color_hex);
        if customizes && !can_use_customizations(self.level) {
            return Err(SaveError::CustomizationRequiresUpgrade);
        }

        match &request.photo {
            Some(Attachment::Pending(blob)) => {
                self.remove_photo(&record)?;
                record.photo_url = Some(self.write_photo(blob)?);
            }
            Some(Attachment::None) => {
                self.remove_photo(&record)?;
                record.photo_url = None;
            }
            // Remote references already point at the stored photo
            Some(Attachment::Remote(_)) | None => {}
        }

        apply_values(&mut record, &values);
        record.updated_at = now;

        let path = self.will_path(&record.id)?;
        storage::write_json(&path, &record)?;
        debug!(id = %record.id, "Wrote will to {:?}", path);

        Ok(SavedWill {
            id: record.id.clone(),
            record,
        })
    }

    /// Get a will by id
    pub fn get(&self, id: &str) -> StorageResult<Option<WillRecord>> {
        match self.will_path(id) {
            Ok(path) => storage::read_json(&path),
            Err(_) => Ok(None),
        }
    }

    /// All wills, newest first
    pub fn list(&self) -> StorageResult<Vec<WillRecord>> {
        let entries = match fs::read_dir(&self.wills_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::from_read(e, self.wills_dir.clone())),
        };

        let mut wills = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| StorageError::from_read(e, self.wills_dir.clone()))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = storage::read_json::<WillRecord>(&path)? {
                wills.push(record);
            }
        }

        wills.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(wills)
    }

    /// Number of stored wills
    pub fn count(&self) -> StorageResult<usize> {
        Ok(self.list()?.len())
    }

    /// Delete a will and its photo, returning the deleted record
    pub fn delete(&self, id: &str) -> Result<WillRecord, SaveError> {
        let record = self
            .get(id)?
            .ok_or_else(|| SaveError::NotFound(id.to_string()))?;
        self.remove_photo(&record)?;
        storage::remove_if_exists(&self.will_path(id)?)?;
        debug!(id, "Deleted will");
        Ok(record)
    }

    /// Load a will as editable values
    pub fn load_values(&self, id: &str) -> Result<WillValues, SaveError> {
        self.get(id)?
            .map(|record| WillValues::from_record(&record))
            .ok_or_else(|| SaveError::NotFound(id.to_string()))
    }

    fn will_path(&self, id: &str) -> StorageResult<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::NotFound {
                path: self.wills_dir.join(id),
            });
        }
        Ok(self.wills_dir.join(format!("{}.json", id)))
    }

    fn write_photo(&self, blob: &LocalBlob) -> StorageResult<String> {
        let ext = blob.extension().unwrap_or_else(|| "bin".to_string());
        let path = self
            .photos_dir
            .join(format!("{}.{}", Uuid::new_v4(), ext));
        storage::atomic_write(&path, &blob.data)?;
        debug!(size = blob.size, "Stored photo {:?}", path);
        Ok(path.to_string_lossy().into_owned())
    }

    /// Remove the record's photo file if it lives in this store
    fn remove_photo(&self, record: &WillRecord) -> StorageResult<()> {
        match &record.photo_url {
            Some(url) if Path::new(url).starts_with(&self.photos_dir) => {
                storage::remove_if_exists(Path::new(url))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl WillEndpoint for LocalWillStore {
    async fn save_will(&self, request: SaveRequest) -> Result<SavedWill, SaveError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.save(request))
            .await
            .map_err(|e| SaveError::Storage(format!("Save task failed: {}", e)))?
    }
}

/// A customization counts only when it sets a value different from the
/// stored one; clearing or keeping a value is always allowed
fn sets_new_value(new: &Option<String>, stored: &Option<String>) -> bool {
    new.is_some() && new != stored
}

fn apply_values(record: &mut WillRecord, values: &WillValues) {
    record.title = values.title.clone();
    record.description = values.description.clone();
    record.first_name = values.first_name.clone();
    record.last_name = values.last_name.clone();
    record.job_title = values.job_title.clone();
    record.city = values.city.clone();
    record.country = values.country.clone();
    record.phone = values.phone.clone();
    record.email = values.email.clone();
    record.summary = values.summary.clone();
    record.color_hex = values.color_hex.clone();
    record.border_style = values.border_style.clone();
    record.skills = values.skills.clone();
    record.work_experiences = values
        .work_experiences
        .iter()
        .map(|exp| WorkExperienceRecord {
            position: exp.position.clone(),
            company: exp.company.clone(),
            start_date: exp.start_date.as_deref().and_then(parse_date),
            end_date: exp.end_date.as_deref().and_then(parse_date),
            description: exp.description.clone(),
        })
        .collect();
    record.educations = values
        .educations
        .iter()
        .map(|edu| EducationRecord {
            degree: edu.degree.clone(),
            school: edu.school.clone(),
            start_date: edu.start_date.as_deref().and_then(parse_date),
            end_date: edu.end_date.as_deref().and_then(parse_date),
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosave::{spawn_autosave, AutoSaveConfig};
    use crate::location::{Location, QueryLocation, WILL_ID_PARAM};
    use crate::models::{Education, WorkExperience};
    use crate::validation::ValidationError;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn store(temp_dir: &TempDir, level: SubscriptionLevel) -> LocalWillStore {
        LocalWillStore::with_root(temp_dir.path(), level)
    }

    fn create(store: &LocalWillStore, values: &WillValues) -> Result<SavedWill, SaveError> {
        store.save(SaveRequest::new(None, values, &Attachment::None))
    }

    fn update(
        store: &LocalWillStore,
        id: &str,
        values: &WillValues,
        photo: Option<Attachment>,
    ) -> Result<SavedWill, SaveError> {
        let mut request = SaveRequest::new(Some(id.to_string()), values, &Attachment::None);
        request.photo = photo;
        store.save(request)
    }

    fn titled(title: &str) -> WillValues {
        WillValues {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn png(data: &[u8]) -> Attachment {
        Attachment::Pending(LocalBlob::new("me.png", "image/png", 1, data.to_vec()))
    }

    #[test]
    fn test_create_assigns_id_and_persists() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, SubscriptionLevel::Free);

        let mut values = titled("  My will  ");
        values.skills = vec![" rust ".to_string(), " ".to_string()];
        values.work_experiences.push(WorkExperience {
            company: Some("Acme".to_string()),
            start_date: Some("2020-01-31".to_string()),
            ..Default::default()
        });

        let saved = create(&store, &values).unwrap();
        assert!(!saved.id.is_empty());

        let record = store.get(&saved.id).unwrap().unwrap();
        assert_eq!(record, saved.record);
        assert_eq!(record.title.as_deref(), Some("My will"));
        assert_eq!(record.skills, vec!["rust".to_string()]);
        assert_eq!(
            record.work_experiences[0].start_date,
            NaiveDate::from_ymd_opt(2020, 1, 31)
        );
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_update_keeps_id_and_replaces_lists() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, SubscriptionLevel::Free);

        let mut values = titled("Draft");
        values.educations = vec![Education::default(), Education::default()];
        let created = create(&store, &values).unwrap();

        let mut values = titled("Final");
        values.educations = vec![Education {
            school: Some("MIT".to_string()),
            ..Default::default()
        }];
        let updated = update(&store, &created.id, &values, None).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.record.title.as_deref(), Some("Final"));
        assert_eq!(updated.record.educations.len(), 1);
        assert_eq!(updated.record.created_at, created.record.created_at);
        assert!(updated.record.updated_at >= created.record.updated_at);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_identical_update_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, SubscriptionLevel::Free);
        let created = create(&store, &titled("A")).unwrap();

        let first = update(&store, &created.id, &titled("B"), None).unwrap();
        let second = update(&store, &created.id, &titled("B"), None).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.record.title.as_deref(), Some("B"));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_free_plan_limit() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, SubscriptionLevel::Free);

        create(&store, &titled("First")).unwrap();
        let err = create(&store, &titled("Second")).unwrap_err();
        assert_eq!(err, SaveError::LimitReached);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, SubscriptionLevel::Pro);

        let err = update(&store, "missing", &titled("A"), None).unwrap_err();
        assert_eq!(err, SaveError::NotFound("missing".to_string()));

        let err = update(&store, "../escape", &titled("A"), None).unwrap_err();
        assert_eq!(err, SaveError::NotFound("../escape".to_string()));
    }

    #[test]
    fn test_customizations_require_pro_plus() {
        let temp_dir = TempDir::new().unwrap();
        let mut values = titled("Styled");
        values.color_hex = Some("#ff0000".to_string());

        let pro = store(&temp_dir, SubscriptionLevel::Pro);
        assert_eq!(
            create(&pro, &values).unwrap_err(),
            SaveError::CustomizationRequiresUpgrade
        );

        let pro_plus = store(&temp_dir, SubscriptionLevel::ProPlus);
        let created = create(&pro_plus, &values).unwrap();

        // After a downgrade the stored customization can be kept or cleared
        values.title = Some("Still styled".to_string());
        update(&pro, &created.id, &values, None).unwrap();
        values.color_hex = None;
        update(&pro, &created.id, &values, None).unwrap();

        values.border_style = Some("rounded".to_string());
        assert_eq!(
            update(&pro, &created.id, &values, None).unwrap_err(),
            SaveError::CustomizationRequiresUpgrade
        );
    }

    #[test]
    fn test_photo_upload_keep_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, SubscriptionLevel::Free);
        let created = create(&store, &titled("A")).unwrap();

        let saved = update(&store, &created.id, &titled("A"), Some(png(&[1, 2, 3]))).unwrap();
        let first_photo = PathBuf::from(saved.record.photo_url.clone().unwrap());
        assert_eq!(fs::read(&first_photo).unwrap(), vec![1, 2, 3]);
        assert_eq!(first_photo.extension().unwrap(), "png");

        // Omitted photo: untouched
        let saved = update(&store, &created.id, &titled("B"), None).unwrap();
        assert_eq!(saved.record.photo_url.as_deref(), first_photo.to_str());

        // New photo replaces the old file
        let saved = update(&store, &created.id, &titled("B"), Some(png(&[9]))).unwrap();
        let second_photo = PathBuf::from(saved.record.photo_url.clone().unwrap());
        assert!(!first_photo.exists());
        assert!(second_photo.exists());

        // Explicit removal
        let saved = update(&store, &created.id, &titled("B"), Some(Attachment::None)).unwrap();
        assert!(saved.record.photo_url.is_none());
        assert!(!second_photo.exists());
    }

    #[test]
    fn test_invalid_photo_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, SubscriptionLevel::Free);
        let created = create(&store, &titled("A")).unwrap();

        let pdf = Attachment::Pending(LocalBlob::new("cv.pdf", "application/pdf", 1, vec![0u8]));
        let err = update(&store, &created.id, &titled("A"), Some(pdf)).unwrap_err();
        assert!(matches!(
            err,
            SaveError::Validation(ValidationError::NotAnImage { .. })
        ));
    }

    #[test]
    fn test_list_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, SubscriptionLevel::Pro);

        let older = create(&store, &titled("Older")).unwrap();
        let newer = create(&store, &titled("Newer")).unwrap();

        // Pin timestamps so ordering does not depend on clock resolution
        let mut record = older.record.clone();
        record.created_at = newer.record.created_at - ChronoDuration::hours(1);
        storage::write_json(&store.will_path(&older.id).unwrap(), &record).unwrap();

        let titles: Vec<String> = store
            .list()
            .unwrap()
            .iter()
            .map(|r| r.display_title().to_string())
            .collect();
        assert_eq!(titles, vec!["Newer".to_string(), "Older".to_string()]);
    }

    #[test]
    fn test_list_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, SubscriptionLevel::Free);
        assert!(store.list().unwrap().is_empty());
        assert!(store.get("nothing").unwrap().is_none());
    }

    #[test]
    fn test_delete_removes_will_and_photo() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, SubscriptionLevel::Free);
        let created = create(&store, &titled("A")).unwrap();
        let saved = update(&store, &created.id, &titled("A"), Some(png(&[7]))).unwrap();
        let photo = PathBuf::from(saved.record.photo_url.unwrap());

        let deleted = store.delete(&created.id).unwrap();
        assert_eq!(deleted.id, created.id);
        assert!(!photo.exists());
        assert!(store.get(&created.id).unwrap().is_none());

        assert_eq!(
            store.delete(&created.id).unwrap_err(),
            SaveError::NotFound(created.id.clone())
        );

        // The freed slot can be used again on the free plan
        create(&store, &titled("B")).unwrap();
    }

    #[test]
    fn test_load_values() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, SubscriptionLevel::Free);
        let created = create(&store, &titled("A")).unwrap();

        let values = store.load_values(&created.id).unwrap();
        assert_eq!(values.id.as_deref(), Some(created.id.as_str()));
        assert_eq!(values.title.as_deref(), Some("A"));
        assert!(values.photo.is_none());
    }

    #[test]
    fn test_open_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().join("data"),
            ..Default::default()
        };

        let store = LocalWillStore::open(&config).unwrap();
        assert!(config.wills_dir().is_dir());
        assert!(config.photos_dir().is_dir());
        assert_eq!(store.level(), SubscriptionLevel::Free);
    }

    #[tokio::test]
    async fn test_endpoint_save() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, SubscriptionLevel::Free);

        let request = SaveRequest::new(None, &titled("Async"), &Attachment::None);
        let saved = store.save_will(request).await.unwrap();
        assert_eq!(
            store.get(&saved.id).unwrap().unwrap().title.as_deref(),
            Some("Async")
        );
    }

    #[tokio::test]
    async fn test_autosave_into_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, SubscriptionLevel::Free);
        let location = Arc::new(QueryLocation::new());

        let handle = spawn_autosave(
            WillValues::new(),
            Arc::new(store.clone()),
            Arc::clone(&location) as Arc<dyn Location>,
            AutoSaveConfig {
                delay: Duration::from_millis(20),
            },
        );
        handle.update(|doc| doc.title = Some("Autosaved".to_string()));

        let mut status = handle.subscribe_status();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let current = status.borrow_and_update();
                    if current.will_id.is_some() && !current.has_unsaved_changes {
                        break;
                    }
                }
                status.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        let id = location.query_param(WILL_ID_PARAM).unwrap();
        let record = store.get(&id).unwrap().unwrap();
        assert_eq!(record.title.as_deref(), Some("Autosaved"));
        assert_eq!(location.history_len(), 1);

        handle.shutdown().await;
    }
}
