use crate::adapters::SystemClock;
use crate::core::store::{decode_records, migrate_licenses, PersistentStore};
use crate::domain::model::{
    Contact, ContactPatch, License, LicensePatch, LicenseType, NewContact, NewLicense, STORAGE_KEY,
};
use crate::domain::ports::{Clock, KeyValueStore, Notifier};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use serde_json::Map;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    pub licenses: usize,
    pub contacts: usize,
    pub fit_centers: usize,
    pub imaging_centers: usize,
    pub health_clinics: usize,
}

/// Owns the license collection and performs every mutation on it.
///
/// Each mutation builds a new collection from the previous one and hands it
/// to the persistent store; existing entities are never modified in place.
/// Unknown ids are tolerated: the collection stays unchanged and the usual
/// success notification is still sent.
pub struct LicenseDirectory<S: KeyValueStore, N: Notifier, C: Clock = SystemClock> {
    store: PersistentStore<Vec<License>, S>,
    notifier: N,
    clock: C,
}

impl<S: KeyValueStore, N: Notifier> LicenseDirectory<S, N, SystemClock> {
    pub fn open(backend: S, notifier: N) -> Self {
        Self::with_clock(backend, notifier, SystemClock)
    }
}

impl<S: KeyValueStore, N: Notifier, C: Clock> LicenseDirectory<S, N, C> {
    pub fn with_clock(backend: S, notifier: N, clock: C) -> Self {
        Self::with_key(backend, STORAGE_KEY, notifier, clock)
    }

    pub fn with_key(backend: S, key: &str, notifier: N, clock: C) -> Self {
        let store = PersistentStore::open_with(
            backend,
            key,
            Vec::new(),
            Some(migrate_licenses),
            decode_records::<License>,
        );
        tracing::debug!(
            "Opened license directory '{}' with {} licenses ({} unreadable kept)",
            store.key(),
            store.get().len(),
            store.retained().len()
        );
        Self {
            store,
            notifier,
            clock,
        }
    }

    pub fn licenses(&self) -> &[License] {
        self.store.get()
    }

    pub fn get(&self, id: &str) -> Option<&License> {
        self.licenses().iter().find(|l| l.id == id)
    }

    pub fn total_contacts(&self) -> usize {
        self.licenses().iter().map(|l| l.contacts.len()).sum()
    }

    pub fn stats(&self) -> DirectoryStats {
        let licenses = self.licenses();
        DirectoryStats {
            licenses: licenses.len(),
            contacts: self.total_contacts(),
            fit_centers: licenses.iter().filter(|l| l.is_fit_center).count(),
            imaging_centers: licenses
                .iter()
                .filter(|l| l.license_type == LicenseType::ImagingCenter)
                .count(),
            health_clinics: licenses
                .iter()
                .filter(|l| l.license_type == LicenseType::HealthClinic)
                .count(),
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn backend(&self) -> &S {
        self.store.backend()
    }

    /// Picks up writes made by other views of the same storage.
    pub fn sync_external(&mut self) -> usize {
        let applied = self.store.sync();
        if applied > 0 {
            tracing::info!(
                "🔄 Reloaded collection after {} external change(s), {} licenses",
                applied,
                self.licenses().len()
            );
        }
        applied
    }

    pub(crate) fn replace_all<F>(&mut self, updater: F)
    where
        F: FnOnce(&Vec<License>) -> Vec<License>,
    {
        self.store.set(updater);
    }

    fn checked<T: Validate>(&self, input: &T) -> Result<()> {
        input.validate().inspect_err(|e| {
            tracing::warn!("Rejected input: {}", e);
            self.notifier.error(&e.user_friendly_message());
        })
    }

    pub fn add_license(&mut self, input: NewLicense) -> Result<License> {
        let input = input.normalized();
        self.checked(&input)?;

        let now = self.clock.now();
        let license = License {
            id: Uuid::new_v4().to_string(),
            license_number: input.license_number,
            name: input.name,
            license_type: input.license_type,
            mode: input.mode,
            address: input.address,
            connector: input.connector,
            options: input.options,
            is_fit_center: input.is_fit_center,
            notes: input.notes,
            contacts: Vec::new(),
            created_at: now.into(),
            updated_at: now.into(),
            extra: Map::new(),
        };

        let created = license.clone();
        self.replace_all(move |prev| {
            let mut next = prev.clone();
            next.push(license);
            next
        });

        tracing::info!("Added license {} ({})", created.id, created.name);
        self.notifier.success("License added successfully");
        Ok(created)
    }

    pub fn update_license(&mut self, id: &str, patch: LicensePatch) -> Result<()> {
        let patch = patch.normalized();
        self.checked(&patch)?;

        let now = self.clock.now();
        if self.get(id).is_none() {
            tracing::debug!("update_license: no license with id {}", id);
        }
        self.replace_all(|prev| {
            prev.iter()
                .map(|l| if l.id == id { patch.apply(l, now) } else { l.clone() })
                .collect()
        });

        self.notifier.success("License updated successfully");
        Ok(())
    }

    pub fn delete_license(&mut self, id: &str) {
        let before = self.licenses().len();
        self.replace_all(|prev| prev.iter().filter(|l| l.id != id).cloned().collect());

        if self.licenses().len() == before {
            tracing::debug!("delete_license: no license with id {}", id);
        } else {
            tracing::info!("Deleted license {}", id);
        }
        self.notifier.success("License deleted successfully");
    }

    /// Returns the new contact even when `license_id` is unknown; in that case
    /// nothing is stored.
    pub fn add_contact(&mut self, license_id: &str, input: NewContact) -> Result<Contact> {
        let input = input.normalized();
        self.checked(&input)?;

        let contact = input.into_contact(Uuid::new_v4().to_string());
        let now = self.clock.now();
        let stored = contact.clone();
        self.replace_all(|prev| {
            prev.iter()
                .map(|l| {
                    if l.id != license_id {
                        return l.clone();
                    }
                    let mut next = l.clone();
                    next.contacts.push(stored.clone());
                    next.updated_at = now.into();
                    next
                })
                .collect()
        });

        self.notifier.success("Contact added successfully");
        Ok(contact)
    }

    pub fn update_contact(
        &mut self,
        license_id: &str,
        contact_id: &str,
        patch: ContactPatch,
    ) -> Result<()> {
        let patch = patch.normalized();
        self.checked(&patch)?;

        let now = self.clock.now();
        self.replace_all(|prev| {
            prev.iter()
                .map(|l| {
                    if l.id != license_id || l.contact(contact_id).is_none() {
                        return l.clone();
                    }
                    let mut next = l.clone();
                    next.contacts = l
                        .contacts
                        .iter()
                        .map(|c| if c.id == contact_id { patch.apply(c) } else { c.clone() })
                        .collect();
                    next.updated_at = now.into();
                    next
                })
                .collect()
        });

        self.notifier.success("Contact updated successfully");
        Ok(())
    }

    pub fn delete_contact(&mut self, license_id: &str, contact_id: &str) {
        let now = self.clock.now();
        self.replace_all(|prev| {
            prev.iter()
                .map(|l| {
                    if l.id != license_id || l.contact(contact_id).is_none() {
                        return l.clone();
                    }
                    let mut next = l.clone();
                    next.contacts.retain(|c| c.id != contact_id);
                    next.updated_at = now.into();
                    next
                })
                .collect()
        });

        self.notifier.success("Contact deleted successfully");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FixedClock, MemoryStorage, RecordingNotifier};
    use crate::domain::ports::NotificationLevel;
    use chrono::{Duration, TimeZone, Utc};

    fn directory() -> (
        LicenseDirectory<MemoryStorage, RecordingNotifier, FixedClock>,
        FixedClock,
    ) {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
        let dir = LicenseDirectory::with_clock(
            MemoryStorage::new(),
            RecordingNotifier::new(),
            clock.clone(),
        );
        (dir, clock)
    }

    #[test]
    fn test_add_license_stamps_and_appends() {
        let (mut dir, _) = directory();
        let first = dir
            .add_license(NewLicense::new("LIC-1", "Nord", LicenseType::ImagingCenter))
            .unwrap();
        let second = dir
            .add_license(NewLicense::new("LIC-2", "Sud", LicenseType::HealthClinic))
            .unwrap();

        assert_ne!(first.id, second.id);
        assert!(first.contacts.is_empty());
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(dir.licenses()[1].id, second.id);
        assert_eq!(
            dir.notifier().last(),
            Some((NotificationLevel::Success, "License added successfully".to_string()))
        );
    }

    #[test]
    fn test_add_license_rejects_blank_name() {
        let (mut dir, _) = directory();
        let result = dir.add_license(NewLicense::new("LIC-1", "   ", LicenseType::ImagingCenter));

        assert!(result.is_err());
        assert!(dir.licenses().is_empty());
        assert_eq!(dir.notifier().count(NotificationLevel::Error), 1);
    }

    #[test]
    fn test_contact_mutations_refresh_license_timestamp() {
        let (mut dir, clock) = directory();
        let license = dir
            .add_license(NewLicense::new("LIC-1", "Nord", LicenseType::ImagingCenter))
            .unwrap();

        clock.advance(Duration::minutes(5));
        let contact = dir
            .add_contact(&license.id, NewContact::new("Marie", "Dupont", "Directeur"))
            .unwrap();
        let after_add = dir.get(&license.id).unwrap().clone();
        assert_eq!(after_add.contacts, vec![contact.clone()]);
        assert_eq!(
            after_add.updated_at.instant(),
            license.created_at.instant() + Duration::minutes(5)
        );
        assert_eq!(after_add.created_at, license.created_at);

        clock.advance(Duration::minutes(5));
        dir.update_contact(
            &license.id,
            &contact.id,
            ContactPatch {
                role: Some("Coordinateur".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        let after_update = dir.get(&license.id).unwrap();
        assert_eq!(after_update.contacts[0].role, "Coordinateur");
        assert_eq!(after_update.contacts[0].first_name, "Marie");
        assert_eq!(
            after_update.updated_at.instant(),
            license.created_at.instant() + Duration::minutes(10)
        );

        clock.advance(Duration::minutes(5));
        dir.delete_contact(&license.id, &contact.id);
        let after_delete = dir.get(&license.id).unwrap();
        assert!(after_delete.contacts.is_empty());
        assert_eq!(
            after_delete.updated_at.instant(),
            license.created_at.instant() + Duration::minutes(15)
        );
    }

    #[test]
    fn test_unknown_contact_leaves_license_untouched() {
        let (mut dir, clock) = directory();
        let license = dir
            .add_license(NewLicense::new("LIC-1", "Nord", LicenseType::ImagingCenter))
            .unwrap();
        clock.advance(Duration::minutes(1));

        dir.delete_contact(&license.id, "missing");
        dir.update_contact(&license.id, "missing", ContactPatch::default())
            .unwrap();

        assert_eq!(dir.get(&license.id), Some(&license));
    }

    #[test]
    fn test_stats() {
        let (mut dir, _) = directory();
        let mut fit = NewLicense::new("LIC-1", "Nord", LicenseType::ImagingCenter);
        fit.is_fit_center = true;
        let fit = dir.add_license(fit).unwrap();
        dir.add_license(NewLicense::new("LIC-2", "Sud", LicenseType::HealthClinic))
            .unwrap();
        dir.add_contact(&fit.id, NewContact::new("A", "B", "C")).unwrap();

        assert_eq!(
            dir.stats(),
            DirectoryStats {
                licenses: 2,
                contacts: 1,
                fit_centers: 1,
                imaging_centers: 1,
                health_clinics: 1,
            }
        );
    }
}
