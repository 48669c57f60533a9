use thiserror::Error;
use tracing::{debug, warn};

use crate::contact::ContactRecord;
use crate::db::{ContactStore, InsertReport, StoreError};
use crate::display::Present;
use crate::fetcher::{FetchError, HttpFetcher};
use crate::parser::ContactExtractor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Extracting,
    Persisting,
    Displaying,
    Failed,
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How one submit ended. Failures have already been shown to the operator.
#[derive(Debug)]
pub enum ScrapeOutcome {
    Failed(ScrapeError),
    Empty,
    Completed {
        records: Vec<ContactRecord>,
        report: InsertReport,
    },
}

/// Runs fetch → extract → persist → display for one operator action.
pub struct Orchestrator<X, P> {
    fetcher: HttpFetcher,
    extractor: X,
    store: ContactStore,
    presenter: P,
    phase: Phase,
    #[cfg(test)]
    trail: Vec<Phase>,
}

impl<X: ContactExtractor, P: Present> Orchestrator<X, P> {
    pub fn new(fetcher: HttpFetcher, extractor: X, store: ContactStore, presenter: P) -> Self {
        Orchestrator {
            fetcher,
            extractor,
            store,
            presenter,
            phase: Phase::Idle,
            #[cfg(test)]
            trail: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn store(&self) -> &ContactStore {
        &self.store
    }

    #[cfg(test)]
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    fn enter(&mut self, phase: Phase) {
        debug!("{:?} -> {:?}", self.phase, phase);
        #[cfg(test)]
        self.trail.push(phase);
        self.phase = phase;
    }

    fn fail(&mut self, err: ScrapeError) -> ScrapeOutcome {
        self.enter(Phase::Failed);
        warn!("Scrape failed: {}", err);
        self.presenter.error(&err.to_string());
        self.enter(Phase::Idle);
        ScrapeOutcome::Failed(err)
    }

    /// Handles one submit. Never errors out: every failure is reported to
    /// the presenter and the orchestrator goes back to idle.
    pub async fn submit(&mut self, url: &str) -> ScrapeOutcome {
        self.enter(Phase::Fetching);
        self.presenter.busy(url);
        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) => return self.fail(e.into()),
        };

        self.enter(Phase::Extracting);
        let records = self.extractor.extract(&html);
        debug!("Extracted {} contacts from {}", records.len(), url);
        if records.is_empty() {
            self.presenter.render(&[]);
            self.enter(Phase::Idle);
            return ScrapeOutcome::Empty;
        }

        self.enter(Phase::Persisting);
        let report = match self.store.insert_all(&records) {
            Ok(report) => report,
            Err(e) => return self.fail(e.into()),
        };
        for email in report.duplicate_emails() {
            self.presenter
                .warn(&format!("contact {email} is already saved, skipped"));
        }

        self.enter(Phase::Displaying);
        self.presenter.render(&records);
        self.enter(Phase::Idle);

        ScrapeOutcome::Completed { records, report }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::test_server::{local_client, serve_once};
    use crate::parser::PatternExtractor;

    #[derive(Default)]
    struct Recorder {
        renders: Vec<Vec<ContactRecord>>,
        warnings: Vec<String>,
        errors: Vec<String>,
        busy: Vec<String>,
    }

    impl Present for Recorder {
        fn render(&mut self, records: &[ContactRecord]) {
            self.renders.push(records.to_vec());
        }
        fn warn(&mut self, notice: &str) {
            self.warnings.push(notice.to_string());
        }
        fn error(&mut self, notice: &str) {
            self.errors.push(notice.to_string());
        }
        fn busy(&mut self, url: &str) {
            self.busy.push(url.to_string());
        }
    }

    fn orchestrator() -> Orchestrator<PatternExtractor, Recorder> {
        let store = ContactStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        Orchestrator::new(
            HttpFetcher::with_client(local_client()),
            PatternExtractor::default(),
            store,
            Recorder::default(),
        )
    }

    fn member(name: &str, title: &str, email: &str) -> String {
        format!(
            r#"<div class="member_name"><a href="/m/1">{name}</a></div>
<div class="member_info_content">{title}</div>
<a href="mailto:{email}">{email}</a>"#
        )
    }

    #[tokio::test]
    async fn happy_path_persists_then_displays() {
        let html = std::fs::read_to_string("tests/fixtures/faculty.html").unwrap();
        let url = serve_once(200, &html).await;
        let mut o = orchestrator();

        let outcome = o.submit(&url).await;

        let ScrapeOutcome::Completed { records, report } = outcome else {
            panic!("expected completed scrape");
        };
        assert_eq!(records.len(), 3);
        assert_eq!(report.inserted(), 3);
        assert_eq!(o.store().count().unwrap(), 3);
        assert_eq!(o.presenter().renders, vec![records]);
        assert_eq!(o.presenter().busy, vec![url]);
        assert!(o.presenter().warnings.is_empty());
        assert_eq!(
            o.trail,
            [Phase::Fetching, Phase::Extracting, Phase::Persisting, Phase::Displaying, Phase::Idle]
        );
        assert_eq!(o.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_store_untouched() {
        let url = serve_once(404, "not here").await;
        let mut o = orchestrator();

        let outcome = o.submit(&url).await;

        assert!(matches!(outcome, ScrapeOutcome::Failed(ScrapeError::Fetch(_))));
        assert_eq!(o.store().count().unwrap(), 0);
        assert!(o.presenter().renders.is_empty());
        assert_eq!(o.presenter().errors.len(), 1);
        assert!(o.presenter().errors[0].contains("cannot reach page"));
        assert_eq!(o.phase(), Phase::Idle);
        assert_eq!(o.trail, [Phase::Fetching, Phase::Failed, Phase::Idle]);
    }

    #[tokio::test]
    async fn no_matches_shows_empty_view_and_skips_store() {
        let url = serve_once(200, "<html><body><h1>Under construction</h1></body></html>").await;
        let mut o = orchestrator();

        let outcome = o.submit(&url).await;

        assert!(matches!(outcome, ScrapeOutcome::Empty));
        assert_eq!(o.presenter().renders, vec![Vec::<ContactRecord>::new()]);
        assert!(o.presenter().errors.is_empty());
        assert_eq!(o.store().count().unwrap(), 0);
        assert_eq!(o.trail, [Phase::Fetching, Phase::Extracting, Phase::Idle]);
    }

    #[tokio::test]
    async fn duplicate_email_warns_but_displays_both() {
        let html = format!(
            "{}\n{}",
            member("Jane Doe", "Professor", "shared@example.edu"),
            member("John Doe", "Lecturer", "shared@example.edu")
        );
        let url = serve_once(200, &html).await;
        let mut o = orchestrator();

        let ScrapeOutcome::Completed { report, .. } = o.submit(&url).await else {
            panic!("expected completed scrape");
        };

        assert_eq!(report.inserted(), 1);
        assert_eq!(report.duplicates(), 1);
        assert_eq!(o.store().count().unwrap(), 1);
        assert_eq!(
            o.store().find_by_email("shared@example.edu").unwrap().unwrap().record.name,
            "Jane Doe"
        );
        assert_eq!(o.presenter().warnings.len(), 1);
        assert!(o.presenter().warnings[0].contains("shared@example.edu"));
        assert_eq!(o.presenter().renders[0].len(), 2);
    }

    #[tokio::test]
    async fn rescraping_same_page_is_idempotent() {
        let html = member("Jane Doe", "Professor", "jane@example.edu");
        let mut o = orchestrator();

        let first = serve_once(200, &html).await;
        o.submit(&first).await;
        let second = serve_once(200, &html).await;
        let outcome = o.submit(&second).await;

        assert!(matches!(
            outcome,
            ScrapeOutcome::Completed { ref report, .. } if report.duplicates() == 1
        ));
        assert_eq!(o.store().count().unwrap(), 1);
        assert_eq!(o.presenter().renders.len(), 2);
    }

    #[tokio::test]
    async fn store_failure_is_reported_and_nothing_displayed() {
        let url = serve_once(200, &member("Jane Doe", "Professor", "jane@example.edu")).await;
        // No initialize(): the contacts table is missing.
        let mut o = Orchestrator::new(
            HttpFetcher::with_client(local_client()),
            PatternExtractor::default(),
            ContactStore::open_in_memory().unwrap(),
            Recorder::default(),
        );

        let outcome = o.submit(&url).await;

        assert!(matches!(outcome, ScrapeOutcome::Failed(ScrapeError::Store(_))));
        assert!(o.presenter().renders.is_empty());
        assert_eq!(o.presenter().errors.len(), 1);
        assert_eq!(o.phase(), Phase::Idle);
    }
}
