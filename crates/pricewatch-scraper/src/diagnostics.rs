//! Best-effort capture of a screenshot and the raw HTML when a search fails.
//!
//! Capture never fails the caller: any artifact that cannot be produced is
//! logged and left out of the returned [`DiagnosticRecord`].

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use chrono::Utc;
use futures::FutureExt;
use pricewatch_core::{DiagnosticRecord, FailureKind, Site};
use uuid::Uuid;

use crate::adapter::panic_message;
use crate::session::BrowserSession;

#[derive(Debug, Clone)]
pub struct DiagnosticsCapture {
    dir: Option<PathBuf>,
}

impl DiagnosticsCapture {
    /// Writes artifacts under `dir`, creating it on first use.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Records failures without writing any artifacts.
    #[must_use]
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Captures the current state of `session`.
    ///
    /// File names are `<timestamp>_<site>_<kind>_<id>.{png,html}` so that
    /// concurrent failures never collide. A panic raised by the session while
    /// collecting artifacts is contained and yields a record without paths.
    pub async fn capture<S>(
        &self,
        session: &mut S,
        site: Site,
        kind: FailureKind,
    ) -> DiagnosticRecord
    where
        S: BrowserSession + ?Sized,
    {
        let id = Uuid::new_v4();
        let captured_at = Utc::now();
        let mut record = DiagnosticRecord {
            id,
            captured_at,
            site,
            kind,
            snapshot_path: None,
            html_path: None,
        };

        let Some(dir) = &self.dir else {
            return record;
        };

        let stem = format!(
            "{}_{}_{}_{}",
            captured_at.format("%Y%m%dT%H%M%S%.3fZ"),
            site.as_str(),
            kind.as_str(),
            id.simple()
        );

        match AssertUnwindSafe(collect_artifacts(session, dir, &stem, site, kind))
            .catch_unwind()
            .await
        {
            Ok(Artifacts { snapshot, html }) => {
                record.snapshot_path = snapshot;
                record.html_path = html;
            }
            Err(payload) => {
                tracing::warn!(
                    %site,
                    %kind,
                    panic = %panic_message(payload.as_ref()),
                    "diagnostics capture panicked"
                );
                return record;
            }
        }

        tracing::info!(
            %site,
            %kind,
            diagnostic_id = %id,
            snapshot = record.snapshot_path.is_some(),
            html = record.html_path.is_some(),
            "diagnostics captured"
        );
        record
    }
}

#[derive(Default)]
struct Artifacts {
    snapshot: Option<PathBuf>,
    html: Option<PathBuf>,
}

async fn collect_artifacts<S>(
    session: &mut S,
    dir: &Path,
    stem: &str,
    site: Site,
    kind: FailureKind,
) -> Artifacts
where
    S: BrowserSession + ?Sized,
{
    let mut artifacts = Artifacts::default();
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        tracing::warn!(dir = %dir.display(), error = %e, "cannot create diagnostics directory");
        return artifacts;
    }

    match session.screenshot().await {
        Ok(png) => artifacts.snapshot = write_artifact(dir, stem, "png", &png).await,
        Err(e) => tracing::warn!(%site, %kind, error = %e, "diagnostic screenshot failed"),
    }
    match session.content().await {
        Ok(html) => artifacts.html = write_artifact(dir, stem, "html", html.as_bytes()).await,
        Err(e) => tracing::warn!(%site, %kind, error = %e, "diagnostic html capture failed"),
    }
    artifacts
}

async fn write_artifact(dir: &Path, stem: &str, ext: &str, bytes: &[u8]) -> Option<PathBuf> {
    let path = dir.join(format!("{stem}.{ext}"));
    match tokio::fs::write(&path, bytes).await {
        Ok(()) => Some(path),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to write diagnostic artifact");
            None
        }
    }
}
