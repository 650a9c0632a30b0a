//! Explicit save: read the live surface and sibling controls, issue one request.

use std::future::Future;

use signet_common::{RecordId, SignatureClient, SignaturePayload, SignatureRecord, SignetError};
use signet_editor_core::LiveContent;

/// Live values of the form controls next to the editor.
pub trait LiveFields {
    fn name(&self) -> String;
    fn is_default(&self) -> bool;
}

/// Persistence for signatures.
pub trait SignatureStore {
    fn fetch(&self, id: &RecordId) -> impl Future<Output = Result<SignatureRecord, SignetError>>;

    fn update(
        &self,
        id: &RecordId,
        payload: &SignaturePayload,
    ) -> impl Future<Output = Result<(), SignetError>>;

    fn create(&self, payload: &SignaturePayload) -> impl Future<Output = Result<(), SignetError>>;
}

impl SignatureStore for SignatureClient {
    async fn fetch(&self, id: &RecordId) -> Result<SignatureRecord, SignetError> {
        SignatureClient::fetch(self, id).await
    }

    async fn update(&self, id: &RecordId, payload: &SignaturePayload) -> Result<(), SignetError> {
        SignatureClient::update(self, id, payload).await
    }

    async fn create(&self, payload: &SignaturePayload) -> Result<(), SignetError> {
        SignatureClient::create(self, payload).await
    }
}

/// Which request a save issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    /// `PUT` an existing record.
    Update(RecordId),
    /// `POST` a new record.
    Create,
}

#[derive(Debug, Clone)]
pub struct SaveCoordinator {
    target: SaveTarget,
}

impl SaveCoordinator {
    pub fn new(target: SaveTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &SaveTarget {
        &self.target
    }

    /// Build the payload from the live surface and the live sibling controls.
    ///
    /// The content comes from `live`, never from the field mirror, so a
    /// capture that has not been delivered yet cannot be lost.
    pub fn payload(&self, live: &impl LiveContent, fields: &dyn LiveFields) -> SignaturePayload {
        SignaturePayload {
            name: fields.name(),
            content: live.live_markup(),
            is_default: fields.is_default(),
        }
    }

    /// Issue exactly one request for `payload`.
    #[tracing::instrument(skip_all, fields(save_target = ?self.target))]
    pub async fn commit(
        &self,
        store: &impl SignatureStore,
        payload: &SignaturePayload,
    ) -> Result<(), SignetError> {
        match &self.target {
            SaveTarget::Update(id) => store.update(id, payload).await,
            SaveTarget::Create => store.create(payload).await,
        }
    }
}
