//! Forced re-evaluation of templated instances.

use crate::constants::MAX_TOUCH_ATTEMPTS;
use crate::crd::TemplatedInstance;
use crate::error::{Error, Result};
use crate::store::StoreClient;
use kube::Resource;
use tracing::debug;

/// Increment the instance's update counter so the broker re-evaluates it.
///
/// Reads fresh from the store on every attempt and retries on write conflicts,
/// up to [`MAX_TOUCH_ATTEMPTS`] writes.
///
/// # Errors
///
/// [`Error::NotFound`] when the instance does not exist, the last conflict once
/// attempts run out, or any other store error.
pub async fn touch_instance(
    client: &dyn StoreClient<TemplatedInstance>,
    namespace: &str,
    name: &str,
) -> Result<TemplatedInstance> {
    let mut attempt = 1;
    loop {
        let Some(mut instance) = client.get(namespace, name).await? else {
            return Err(Error::NotFound {
                kind: TemplatedInstance::kind(&()).to_string(),
                name: format!("{namespace}/{name}"),
            });
        };
        instance.spec.update_requests += 1;

        match client.update(&instance).await {
            Ok(updated) => return Ok(updated),
            Err(e) if e.is_conflict() && attempt < MAX_TOUCH_ATTEMPTS => {
                debug!(namespace, name, attempt, "touch conflicted, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
