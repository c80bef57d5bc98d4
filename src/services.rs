// 🧩 Services - everything a front end needs, wired from one Settings value

use crate::config::Settings;
use crate::engine::BingoEngine;
use crate::error::Result;
use crate::feed::CsvSignupFeed;
use crate::journal::Journal;
use crate::notify::{AccessGrants, Notifier};
use crate::registry::IdentityRegistry;
use crate::signup::SignupService;
use crate::workflow::SubmissionWorkflow;
use std::sync::Arc;

pub struct Services {
    pub settings: Settings,
    pub registry: Arc<IdentityRegistry>,
    pub engine: Arc<BingoEngine>,
    pub journal: Arc<Journal>,
    pub signups: SignupService,
    pub workflow: SubmissionWorkflow,
}

impl Services {
    pub fn new(
        settings: Settings,
        grants: Arc<dyn AccessGrants>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let journal = Arc::new(Journal::open(&settings.journal_path())?);
        Ok(Self::with_journal(settings, grants, notifier, journal))
    }

    pub fn with_journal(
        settings: Settings,
        grants: Arc<dyn AccessGrants>,
        notifier: Arc<dyn Notifier>,
        journal: Arc<Journal>,
    ) -> Self {
        let registry = Arc::new(IdentityRegistry::new(settings.registry_path(), settings.roster()));
        let engine = Arc::new(BingoEngine::new(&settings));

        let mut signups = SignupService::new(registry.clone(), grants, notifier.clone(), journal.clone())
            .with_paid_marker(&settings.signup.paid_marker);
        if let Some(csv) = &settings.signup.csv_path {
            signups = signups.with_feed(Arc::new(CsvSignupFeed::new(csv, settings.ledger_path())));
        }

        let workflow = SubmissionWorkflow::new(registry.clone(), engine.clone(), notifier, journal.clone());

        tracing::debug!(data_dir = %settings.data_dir.display(), "services ready");
        Services {
            settings,
            registry,
            engine,
            journal,
            signups,
            workflow,
        }
    }

    /// Feed for an explicit CSV path, sharing the configured ledger
    pub fn csv_feed(&self, csv: &std::path::Path) -> CsvSignupFeed {
        CsvSignupFeed::new(csv, self.settings.ledger_path())
    }
}
