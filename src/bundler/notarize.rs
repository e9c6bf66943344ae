//! Notarization: submit, poll to a terminal verdict, staple.
//!
//! The service is externally paced; the poll interval backs off to a cap
//! rather than hammering it. A rejection surfaces the service's log
//! verbatim so the operator sees exactly what the service saw. There is no
//! internal auto-retry: resubmission is an operator decision.

use crate::bundler::{
    error::{Error, Result},
    settings::Settings,
    tools::{Notary, NotaryVerdict},
};
use std::path::Path;
use std::time::Duration;

const INITIAL_POLL: Duration = Duration::from_secs(2);
const MAX_POLL: Duration = Duration::from_secs(15);

/// Notarizes a disk image and staples the ticket on acceptance.
pub async fn notarize_image(
    settings: &Settings,
    image: &Path,
    notary: &dyn Notary,
) -> Result<()> {
    let profile = settings
        .macos()
        .notary_profile
        .as_deref()
        .ok_or_else(|| {
            Error::GenericError("notarization requested but no credential profile configured".into())
        })?;

    let id = notary.submit(image, profile)?;
    log::info!("notarization submitted: {id}");

    let mut interval = INITIAL_POLL;
    loop {
        match notary.status(&id, profile)? {
            NotaryVerdict::InProgress => {
                tokio::time::sleep(interval).await;
                interval = (interval * 2).min(MAX_POLL);
            }
            NotaryVerdict::Accepted => break,
            NotaryVerdict::Rejected => {
                let detail = notary
                    .rejection_log(&id, profile)
                    .unwrap_or_else(|e| format!("(rejection log unavailable: {e})"));
                return Err(Error::NotarizationRejected(detail));
            }
        }
    }

    log::info!("notarization accepted: {id}");
    if settings.macos().skip_stapling {
        log::warn!("stapling skipped; offline verification will not succeed");
        return Ok(());
    }
    notary.staple(image)?;
    Ok(())
}
