//! Object-store adapter used by the upload step

pub mod oss;

pub use oss::OssObjectStore;

use async_trait::async_trait;

use crate::client::CoohomError;
use crate::models::StsGrant;

/// Destination for uploaded archives
///
/// The grant carries everything needed to address and authorize the PUT:
/// bucket, region, object key and temporary credentials.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `grant.file_path`
    ///
    /// Fails with `CoohomError::Upload` when the store rejects the object.
    async fn put_object(
        &self,
        grant: &StsGrant,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), CoohomError>;
}
