//! MongoDB-backed document store (blocking driver)

use mongodb::bson::Document;
use mongodb::options::ReplaceOptions;
use mongodb::sync::Client;
use tracing::debug;

use super::traits::{DocumentStore, StoreError};

/// Document store talking to a MongoDB server.
///
/// The driver connects lazily, so construction performs no round trip.
pub struct MongoDocumentStore {
    client: Client,
}

impl MongoDocumentStore {
    pub fn connect(uri: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri)
            .map_err(|e| StoreError::new(format!("connect {}", uri), e.to_string()))?;
        Ok(Self { client })
    }
}

impl DocumentStore for MongoDocumentStore {
    fn find_one(&self, database: &str, collection: &str) -> Result<Option<Document>, StoreError> {
        debug!("find_one: {}.{}", database, collection);
        self.client
            .database(database)
            .collection::<Document>(collection)
            .find_one(None, None)
            .map_err(|e| StoreError::new(format!("find {}.{}", database, collection), e.to_string()))
    }

    fn upsert(
        &self,
        database: &str,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        let operation = format!("upsert {}.{}", database, collection);
        let value = document
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::new(&operation, format!("document has no '{}' field", key)))?;
        debug!("{}: {}={}", operation, key, value);

        let mut filter = Document::new();
        filter.insert(key, value);
        let options = ReplaceOptions::builder().upsert(true).build();
        self.client
            .database(database)
            .collection::<Document>(collection)
            .replace_one(filter, document, options)
            .map(|_| ())
            .map_err(|e| StoreError::new(operation, e.to_string()))
    }

    fn drop_database(&self, database: &str) -> Result<(), StoreError> {
        debug!("drop_database: {}", database);
        self.client
            .database(database)
            .drop(None)
            .map_err(|e| StoreError::new(format!("drop {}", database), e.to_string()))
    }
}
