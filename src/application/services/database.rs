//! Document-database reset: snapshot, drop, restore, reseed
//!
//! Both databases are dropped whole. That loses index definitions along
//! with the data; the services rebuild them on restart. Nothing here runs
//! inside a transaction, so a connection failure part-way leaves whatever
//! was already done and the wipe must be rerun from the start.

use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Document};
use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::MongoConfig;
use crate::domain::{AdminBootstrapRecord, SettingsSnapshot, VersionRecord};
use crate::infrastructure::traits::{DocumentStore, StoreError};

/// Key field of the settings document used to write it back.
const SETTINGS_KEY: &str = "_id";

pub struct DatabaseWiper {
    store: Arc<dyn DocumentStore>,
    mongo: MongoConfig,
}

impl DatabaseWiper {
    pub fn new(store: Arc<dyn DocumentStore>, mongo: MongoConfig) -> Self {
        Self { store, mongo }
    }

    pub fn config(&self) -> &MongoConfig {
        &self.mongo
    }

    /// Read the settings document of the metadata database.
    ///
    /// `None` when the collection is empty, e.g. after an earlier run was
    /// aborted between the drop and the restore.
    #[instrument(skip(self))]
    pub fn snapshot_settings(&self) -> ApplicationResult<Option<SettingsSnapshot>> {
        let m = &self.mongo;
        let document = self
            .store
            .find_one(&m.workspace_db, &m.settings_collection)
            .map_err(connectivity("snapshot settings"))?;
        match &document {
            Some(d) => debug!("settings snapshot has {} fields", d.len()),
            None => warn!(
                "no settings document in {}.{}",
                m.workspace_db, m.settings_collection
            ),
        }
        Ok(document.map(SettingsSnapshot::new))
    }

    #[instrument(skip(self))]
    pub fn drop_metadata_database(&self) -> ApplicationResult<()> {
        info!("dropping {}", self.mongo.workspace_db);
        self.store
            .drop_database(&self.mongo.workspace_db)
            .map_err(connectivity("drop metadata database"))
    }

    #[instrument(skip(self))]
    pub fn drop_object_store_database(&self) -> ApplicationResult<()> {
        info!("dropping {}", self.mongo.object_store_db);
        self.store
            .drop_database(&self.mongo.object_store_db)
            .map_err(connectivity("drop object-store database"))
    }

    /// Write the snapshot back unchanged, inserting if the document is gone.
    #[instrument(skip_all)]
    pub fn restore_settings(&self, snapshot: SettingsSnapshot) -> ApplicationResult<()> {
        let m = &self.mongo;
        let mut document = snapshot.into_document();
        if !document.contains_key(SETTINGS_KEY) {
            // Nothing to match on; the collection was just dropped, so a fresh key inserts.
            document.insert(SETTINGS_KEY, ObjectId::new());
        }
        self.store
            .upsert(&m.workspace_db, &m.settings_collection, SETTINGS_KEY, document)
            .map_err(connectivity("restore settings"))
    }

    /// Upsert the fixed version records keyed by name.
    #[instrument(skip(self))]
    pub fn reseed_version_records(&self) -> ApplicationResult<Vec<VersionRecord>> {
        let m = &self.mongo;
        let records = VersionRecord::bootstrap();
        for record in &records {
            self.store
                .upsert(
                    &m.object_store_db,
                    &m.version_collection,
                    "name",
                    version_document(record),
                )
                .map_err(connectivity("reseed version records"))?;
        }
        Ok(records)
    }

    /// Upsert the admin account keyed by username.
    #[instrument(skip_all, fields(username = %admin.username))]
    pub fn reseed_admin_bootstrap_record(
        &self,
        admin: &AdminBootstrapRecord,
    ) -> ApplicationResult<()> {
        let m = &self.mongo;
        self.store
            .upsert(
                &m.object_store_db,
                &m.user_collection,
                "username",
                admin_document(admin),
            )
            .map_err(connectivity("reseed admin record"))
    }
}

fn version_document(record: &VersionRecord) -> Document {
    doc! { "name": record.name.as_str(), "version": record.version }
}

fn admin_document(admin: &AdminBootstrapRecord) -> Document {
    doc! {
        "uuid": admin.uuid.as_str(),
        "username": admin.username.as_str(),
        "fullname": admin.fullname.as_str(),
        "email": admin.email.as_str(),
        "password": "",
        "shock_admin": true,
    }
}

fn connectivity(context: &'static str) -> impl Fn(StoreError) -> ApplicationError {
    move |source| ApplicationError::Connectivity {
        context: context.to_string(),
        source,
    }
}
