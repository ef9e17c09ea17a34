//! Backend discovery and selection
//!
//! Real backends are probed once, in priority order. A backend counts as
//! available only if its self-test round-trips for at least one variant;
//! being compiled in is not enough. The process-wide registry lives in a
//! `OnceLock`, so concurrent first users converge on a single probe.
//!
//! The insecure mock is never probed and never returned unless the caller
//! passes `allow_mock = true` *and* no real backend is usable.

use serde::Serialize;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::backend::BackendKind;
use crate::error::{CryptoError, CryptoResult};
use crate::variant::KemVariant;

/// Result of probing one backend.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub backend: BackendKind,
    /// Variants whose self-test succeeded
    pub supported: Vec<KemVariant>,
    /// Last self-test failure, if any
    pub error: Option<String>,
}

impl ProbeReport {
    pub fn is_available(&self) -> bool {
        !self.supported.is_empty()
    }

    pub fn supports(&self, variant: KemVariant) -> bool {
        self.supported.contains(&variant)
    }
}

/// The backend chosen for an operation, with its security label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackendSelection {
    pub backend: BackendKind,
    /// True only for the mock backend
    pub insecure: bool,
}

impl BackendSelection {
    fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            insecure: backend.is_insecure(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendRegistry {
    reports: Vec<ProbeReport>,
}

static GLOBAL: OnceLock<BackendRegistry> = OnceLock::new();

impl BackendRegistry {
    /// Probe every real backend in priority order.
    pub fn probe() -> Self {
        Self::with_backends(&BackendKind::REAL_PRIORITY)
    }

    /// Probe only `candidates`, keeping their order as the priority order.
    /// The mock is not a candidate and is skipped if listed.
    pub fn with_backends(candidates: &[BackendKind]) -> Self {
        let reports: Vec<ProbeReport> = candidates
            .iter()
            .copied()
            .filter(|b| !b.is_insecure())
            .map(probe_backend)
            .collect();

        let available: Vec<&str> = reports
            .iter()
            .filter(|r| r.is_available())
            .map(|r| r.backend.name())
            .collect();
        info!(available = ?available, "KEM backend registry initialised");

        Self { reports }
    }

    #[cfg(test)]
    pub(crate) fn from_reports(reports: Vec<ProbeReport>) -> Self {
        Self { reports }
    }

    /// The shared, lazily probed registry for this process.
    pub fn global() -> &'static BackendRegistry {
        GLOBAL.get_or_init(Self::probe)
    }

    pub fn report(&self) -> &[ProbeReport] {
        &self.reports
    }

    /// Available real backends in priority order.
    pub fn available(&self) -> impl Iterator<Item = BackendKind> + '_ {
        self.reports
            .iter()
            .filter(|r| r.is_available())
            .map(|r| r.backend)
    }

    /// Pick the highest-priority real backend, or the mock if explicitly allowed.
    pub fn select_backend(&self, allow_mock: bool) -> CryptoResult<BackendSelection> {
        self.select(allow_mock, |r| r.is_available())
    }

    /// Like [`select_backend`](Self::select_backend), restricted to backends
    /// whose self-test passed for `variant`. The mock is considered only when
    /// no real backend is available at all.
    pub fn select_for(
        &self,
        variant: KemVariant,
        allow_mock: bool,
    ) -> CryptoResult<BackendSelection> {
        self.select(allow_mock, |r| r.supports(variant))
    }

    /// Next real backend after `failed` that supports `variant`.
    /// Never the mock.
    pub fn fallback_after(&self, failed: BackendKind, variant: KemVariant) -> Option<BackendKind> {
        if failed.is_insecure() {
            return None;
        }
        self.reports
            .iter()
            .skip_while(|r| r.backend != failed)
            .skip(1)
            .find(|r| r.supports(variant))
            .map(|r| r.backend)
    }

    fn select(
        &self,
        allow_mock: bool,
        usable: impl Fn(&ProbeReport) -> bool,
    ) -> CryptoResult<BackendSelection> {
        if let Some(report) = self.reports.iter().find(|r| usable(r)) {
            debug!(backend = %report.backend, "selected KEM backend");
            return Ok(BackendSelection::new(report.backend));
        }
        if let Some(real) = self.available().next() {
            // A real backend is up but cannot serve this request; the mock
            // never stands in for it.
            warn!(
                backend = %real,
                "no real KEM backend supports the requested variant; refusing the mock"
            );
            return Err(CryptoError::NoBackendAvailable);
        }
        if allow_mock {
            warn!(
                backend = %BackendKind::InsecureMock,
                "no real KEM backend available; using the INSECURE mock backend as explicitly allowed"
            );
            return Ok(BackendSelection::new(BackendKind::InsecureMock));
        }
        Err(CryptoError::NoBackendAvailable)
    }
}

/// Select from the process-wide registry.
pub fn select_backend(allow_mock: bool) -> CryptoResult<BackendSelection> {
    BackendRegistry::global().select_backend(allow_mock)
}

fn probe_backend(backend: BackendKind) -> ProbeReport {
    let mut report = ProbeReport {
        backend,
        supported: Vec::new(),
        error: None,
    };
    if !backend.is_compiled() {
        report.error = Some("not compiled in".into());
        debug!(backend = %backend, "KEM backend not compiled in");
        return report;
    }
    for variant in KemVariant::ALL {
        match backend.self_test(variant) {
            Ok(()) => report.supported.push(variant),
            Err(e) => {
                debug!(backend = %backend, variant = %variant, "KEM self-test failed: {e}");
                report.error = Some(e.to_string());
            }
        }
    }
    debug!(
        backend = %backend,
        supported = ?report.supported,
        "KEM backend probed"
    );
    report
}
