//! The verification engine: submissions, votes, administrative decisions,
//! rewards and transfers over an injected record store.
//!
//! Every operation follows the same shape:
//! 1. resolve principals through the identity gateway;
//! 2. take the per-report lock, then the per-account locks in sorted order;
//! 3. load the records, run the pure lifecycle and reward rules;
//! 4. commit one version-checked batch.
//!
//! A version conflict at step 4 means another writer (usually another
//! process on the same store) got there first; the whole operation is re-run
//! from step 3 against fresh state, up to `max_commit_retries` times.
//! Store and identity calls run on the blocking pool under `io_timeout`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use roadwatch_store::{RecordStore, RecordStoreExt, StoreError, Versioned, WriteBatch};
use roadwatch_types::{
    Account, Category, Clock, EngineParams, IdentityError, IdentityGateway, Location,
    MediaHandle, PrincipalId, Report, ReportId, SystemClock, Timestamp, ValidationError,
};
use roadwatch_verification::{
    apply_delta, check_invariants, compute_rewards, events_for, rewards_for, ReportLifecycle,
    RewardEvent, Transition,
};
use serde::Serialize;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::error::{ConflictReason, EngineError};
use crate::events::{EngineEvent, EventBus};
use crate::ids::ReportIdGenerator;
use crate::locks::KeyedLocks;
use crate::metrics::EngineMetrics;
use crate::query::{ReportQuery, ReportSet};

/// Runtime knobs of a [`VerificationEngine`].
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    pub params: EngineParams,
    pub io_timeout: Duration,
    pub max_commit_retries: u32,
    pub max_concurrent_ops: usize,
}

impl EngineSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            params: config.params.clone(),
            io_timeout: config.io_timeout(),
            max_commit_retries: config.max_commit_retries,
            max_concurrent_ops: config.max_concurrent_ops,
        }
    }

    pub fn with_params(mut self, params: EngineParams) -> Self {
        self.params = params;
        self
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Input of [`VerificationEngine::submit`].
#[derive(Clone, Debug, PartialEq)]
pub struct NewReport {
    pub submitter: PrincipalId,
    pub category: Category,
    pub description: String,
    pub location: Location,
    pub media_handle: Option<MediaHandle>,
    /// Caller-chosen id. Retrying a submission with the same id is safe.
    pub report_id: Option<ReportId>,
}

impl NewReport {
    pub fn new(submitter: PrincipalId, category: Category, location: Location) -> Self {
        Self {
            submitter,
            category,
            description: String::new(),
            location,
            media_handle: None,
            report_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_media(mut self, handle: MediaHandle) -> Self {
        self.media_handle = Some(handle);
        self
    }

    pub fn with_report_id(mut self, id: ReportId) -> Self {
        self.report_id = Some(id);
        self
    }
}

/// Both accounts as committed by a transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub from: Account,
    pub to: Account,
    pub amount: u64,
}

enum CommitOutcome {
    Applied,
    /// Another writer changed one of the records since it was read.
    Stale,
}

pub struct VerificationEngine {
    store: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityGateway>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    lifecycle: ReportLifecycle,
    report_locks: KeyedLocks,
    account_locks: KeyedLocks,
    ids: ReportIdGenerator,
    ops: Semaphore,
    events: EventBus,
    metrics: EngineMetrics,
}

impl VerificationEngine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityGateway>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            identity,
            clock: Arc::new(SystemClock),
            lifecycle: ReportLifecycle::from_params(&settings.params),
            report_locks: KeyedLocks::new(),
            account_locks: KeyedLocks::new(),
            ids: ReportIdGenerator::new(),
            ops: Semaphore::new(settings.max_concurrent_ops.max(1)),
            events: EventBus::new(),
            metrics: EngineMetrics::new(),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register an event listener. Listeners run inline after each commit.
    pub fn subscribe(&mut self, listener: Box<dyn Fn(&EngineEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub fn params(&self) -> &EngineParams {
        &self.settings.params
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Live per-key lock entries, reports and accounts together. Zero when
    /// no operation is in flight.
    pub fn lock_entries(&self) -> usize {
        self.report_locks.len() + self.account_locks.len()
    }

    // ── Submission ──────────────────────────────────────────────────────

    /// Store a new pending report and pay the submission reward.
    pub async fn submit(&self, new: NewReport) -> Result<Report, EngineError> {
        let _permit = self.permit().await?;

        let max = self.settings.params.max_description_len;
        let len = new.description.chars().count();
        if len > max {
            return Err(ValidationError::DescriptionTooLong { len, max }.into());
        }
        self.require_principal(&new.submitter).await?;

        // Generated ids are private to this call until committed; only a
        // caller-supplied id can race with another submission.
        let _report_guard = match &new.report_id {
            Some(id) => Some(self.report_locks.acquire(id.as_str()).await),
            None => None,
        };
        let _account_guard = self.account_locks.acquire(new.submitter.as_str()).await;

        for attempt in 0..=self.settings.max_commit_retries {
            let now = self.clock.now();
            let id = match &new.report_id {
                Some(id) => {
                    if let Some(existing) = self.find_report(id).await? {
                        return self.resubmission(existing.record, &new.submitter);
                    }
                    id.clone()
                }
                None => self.ids.next(now)?,
            };

            let report = Report::new_pending(
                id,
                new.submitter.clone(),
                new.category,
                new.description.clone(),
                new.location.clone(),
                new.media_handle.clone(),
                now,
            );
            let (mut account, account_version) =
                self.account_or_new(&new.submitter, now).await?;
            let deltas = compute_rewards(
                &self.settings.params.rewards,
                RewardEvent::SubmissionAccepted,
                &new.submitter,
                &report,
            );
            for delta in &deltas {
                apply_delta(&mut account, delta);
            }
            account.record_submission(&report.id);

            let mut batch = WriteBatch::new();
            batch.stage_report(&report, 0).map_err(|e| self.store_failure("encode", e))?;
            batch
                .stage_account(&account, account_version)
                .map_err(|e| self.store_failure("encode", e))?;

            match self.commit(batch).await? {
                CommitOutcome::Applied => {
                    tracing::info!(
                        report_id = %report.id,
                        submitter = %report.submitter,
                        category = %report.category,
                        "report submitted"
                    );
                    self.metrics.submissions.inc();
                    self.events.emit(&EngineEvent::Submitted {
                        report_id: report.id.clone(),
                        submitter: report.submitter.clone(),
                    });
                    self.emit_rewards(&report.id, RewardEvent::SubmissionAccepted, &deltas);
                    return Ok(report);
                }
                CommitOutcome::Stale => {
                    tracing::debug!(attempt, submitter = %new.submitter, "submission raced, retrying");
                }
            }
        }
        Err(self.retries_exhausted("submit"))
    }

    /// A supplied id that already exists: the same submitter retrying gets
    /// the stored report back, anyone else is refused.
    fn resubmission(&self, stored: Report, submitter: &PrincipalId) -> Result<Report, EngineError> {
        if stored.submitter == *submitter {
            tracing::debug!(report_id = %stored.id, "submission already committed, returning stored report");
            Ok(stored)
        } else {
            Err(EngineError::conflict(
                ConflictReason::ReportIdTaken,
                format!("report id {} belongs to another submitter", stored.id),
            ))
        }
    }

    // ── Votes ───────────────────────────────────────────────────────────

    /// Record a vote on a pending report.
    ///
    /// Affirmative votes pay the partial reward and may complete quorum. A
    /// negative vote rejects the report outright when rejection is enabled;
    /// it writes no account.
    pub async fn corroborate(
        &self,
        report_id: &ReportId,
        voter: &PrincipalId,
        affirmative: bool,
    ) -> Result<Report, EngineError> {
        let _permit = self.permit().await?;
        self.require_principal(voter).await?;
        let _report_guard = self.report_locks.acquire(report_id.as_str()).await;

        for attempt in 0..=self.settings.max_commit_retries {
            let now = self.clock.now();
            let Versioned { version, record } = self.load_report(report_id).await?;
            let mut report = record;

            let transition = self
                .lifecycle
                .corroborate(&mut report, voter, affirmative, now)?;
            check_invariants(&report, self.lifecycle.quorum)?;
            tracing::debug!(
                report_id = %report_id,
                voter = %voter,
                affirmative,
                count = report.corroboration_count,
                "vote applied"
            );

            let deltas = rewards_for(&self.settings.params.rewards, &transition, voter, &report);
            let mut touched: Vec<PrincipalId> = deltas.iter().map(|d| d.account.clone()).collect();
            if affirmative && !touched.contains(voter) {
                touched.push(voter.clone());
            }
            let _account_guards = self
                .account_locks
                .acquire_many(touched.iter().map(|p| p.as_str()))
                .await;

            let mut batch = WriteBatch::new();
            batch
                .stage_report(&report, version)
                .map_err(|e| self.store_failure("encode", e))?;
            for principal in &touched {
                let (mut account, account_version) = self.account_or_new(principal, now).await?;
                for delta in deltas.iter().filter(|d| d.account == *principal) {
                    apply_delta(&mut account, delta);
                }
                if affirmative && principal == voter {
                    account.record_corroboration(report_id);
                }
                batch
                    .stage_account(&account, account_version)
                    .map_err(|e| self.store_failure("encode", e))?;
            }

            match self.commit(batch).await? {
                CommitOutcome::Applied => {
                    self.metrics.votes.inc();
                    self.after_transition(&report, &transition, voter);
                    return Ok(report);
                }
                CommitOutcome::Stale => {
                    tracing::debug!(attempt, report_id = %report_id, "vote raced, retrying");
                }
            }
        }
        Err(self.retries_exhausted("corroborate"))
    }

    // ── Administration ──────────────────────────────────────────────────

    /// Ask the identity gateway whether `principal` holds the admin role.
    pub async fn is_admin(&self, principal: &PrincipalId) -> Result<bool, EngineError> {
        let principal = principal.clone();
        self.with_identity("is_admin", move |id| id.is_admin(&principal))
            .await
    }

    /// Force a pending report to `verified`. Pays no rewards.
    pub async fn admin_override(
        &self,
        report_id: &ReportId,
        admin: &PrincipalId,
        is_admin: bool,
    ) -> Result<Report, EngineError> {
        self.admin_decision(report_id, admin, is_admin, true).await
    }

    /// Force a pending report to `rejected`. Pays no rewards.
    pub async fn admin_reject(
        &self,
        report_id: &ReportId,
        admin: &PrincipalId,
        is_admin: bool,
    ) -> Result<Report, EngineError> {
        self.admin_decision(report_id, admin, is_admin, false).await
    }

    async fn admin_decision(
        &self,
        report_id: &ReportId,
        admin: &PrincipalId,
        is_admin: bool,
        verify: bool,
    ) -> Result<Report, EngineError> {
        if !is_admin {
            return Err(EngineError::Unauthorized(format!("{admin} is not an administrator")));
        }
        let _permit = self.permit().await?;
        let _report_guard = self.report_locks.acquire(report_id.as_str()).await;

        for attempt in 0..=self.settings.max_commit_retries {
            let now = self.clock.now();
            let Versioned { version, record } = self.load_report(report_id).await?;
            let mut report = record;

            let transition = if verify {
                self.lifecycle.admin_verify(&mut report, admin, now)?
            } else {
                self.lifecycle.admin_reject(&mut report, admin, now)?
            };
            check_invariants(&report, self.lifecycle.quorum)?;

            let mut batch = WriteBatch::new();
            batch
                .stage_report(&report, version)
                .map_err(|e| self.store_failure("encode", e))?;

            match self.commit(batch).await? {
                CommitOutcome::Applied => {
                    self.after_transition(&report, &transition, admin);
                    return Ok(report);
                }
                CommitOutcome::Stale => {
                    tracing::debug!(attempt, report_id = %report_id, "admin decision raced, retrying");
                }
            }
        }
        Err(self.retries_exhausted(if verify { "admin_override" } else { "admin_reject" }))
    }

    // ── Transfers ───────────────────────────────────────────────────────

    /// Move tokens between two existing accounts.
    pub async fn transfer(
        &self,
        from: &PrincipalId,
        to: &PrincipalId,
        amount: u64,
    ) -> Result<TransferReceipt, EngineError> {
        if amount == 0 {
            return Err(EngineError::InvalidInput("transfer amount must be positive".into()));
        }
        if from == to {
            return Err(EngineError::InvalidInput("cannot transfer to the same account".into()));
        }
        let _permit = self.permit().await?;
        let _account_guards = self
            .account_locks
            .acquire_many([from.as_str(), to.as_str()])
            .await;

        for attempt in 0..=self.settings.max_commit_retries {
            let mut loaded = self.load_accounts(vec![from.clone(), to.clone()]).await?;
            let (Some(receiver), Some(sender)) = (loaded.pop().flatten(), loaded.pop().flatten())
            else {
                let missing = if self.find_account(from).await?.is_none() { from } else { to };
                return Err(EngineError::NotFound(format!("account {missing}")));
            };

            let mut sender_account = sender.record;
            let mut receiver_account = receiver.record;
            if !sender_account.try_debit(amount) {
                return Err(EngineError::conflict(
                    ConflictReason::InsufficientBalance,
                    format!(
                        "{from} holds {} tokens, {amount} requested",
                        sender_account.token_balance
                    ),
                ));
            }
            receiver_account.credit(amount, 0);

            let mut batch = WriteBatch::new();
            batch
                .stage_account(&sender_account, sender.version)
                .map_err(|e| self.store_failure("encode", e))?;
            batch
                .stage_account(&receiver_account, receiver.version)
                .map_err(|e| self.store_failure("encode", e))?;

            match self.commit(batch).await? {
                CommitOutcome::Applied => {
                    tracing::info!(from = %from, to = %to, amount, "tokens transferred");
                    self.metrics.transfers.inc();
                    self.events.emit(&EngineEvent::Transferred {
                        from: from.clone(),
                        to: to.clone(),
                        amount,
                    });
                    return Ok(TransferReceipt {
                        from: sender_account,
                        to: receiver_account,
                        amount,
                    });
                }
                CommitOutcome::Stale => {
                    tracing::debug!(attempt, from = %from, to = %to, "transfer raced, retrying");
                }
            }
        }
        Err(self.retries_exhausted("transfer"))
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// Snapshot the stored reports and filter them lazily.
    pub async fn query(&self, query: ReportQuery) -> Result<ReportSet, EngineError> {
        let _permit = self.permit().await?;
        let reports = self.with_store("scan_reports", |s| s.all_reports()).await?;
        Ok(ReportSet::new(reports, query))
    }

    pub async fn report(&self, id: &ReportId) -> Result<Report, EngineError> {
        let _permit = self.permit().await?;
        Ok(self.load_report(id).await?.record)
    }

    pub async fn account(&self, principal: &PrincipalId) -> Result<Account, EngineError> {
        let _permit = self.permit().await?;
        self.find_account(principal)
            .await?
            .map(|v| v.record)
            .ok_or_else(|| EngineError::NotFound(format!("account {principal}")))
    }

    pub async fn accounts(&self) -> Result<Vec<Account>, EngineError> {
        let _permit = self.permit().await?;
        self.with_store("scan_accounts", |s| s.all_accounts()).await
    }

    /// Reports the principal submitted, oldest first.
    pub async fn reports_submitted_by(
        &self,
        principal: &PrincipalId,
    ) -> Result<Vec<Report>, EngineError> {
        let account = self.account(principal).await?;
        self.reports_by_id(account.submitted).await
    }

    /// Reports the principal confirmed, oldest first.
    pub async fn reports_corroborated_by(
        &self,
        principal: &PrincipalId,
    ) -> Result<Vec<Report>, EngineError> {
        let account = self.account(principal).await?;
        self.reports_by_id(account.corroborated).await
    }

    async fn reports_by_id(&self, ids: Vec<ReportId>) -> Result<Vec<Report>, EngineError> {
        let _permit = self.permit().await?;
        self.with_store("load_reports", move |s| {
            let mut reports = Vec::with_capacity(ids.len());
            for id in &ids {
                if let Some(found) = s.find_report(id)? {
                    reports.push(found.record);
                }
            }
            Ok(reports)
        })
        .await
    }

    // ── Post-commit bookkeeping ─────────────────────────────────────────

    fn after_transition(&self, report: &Report, transition: &Transition, actor: &PrincipalId) {
        match transition {
            Transition::Corroborated { count } => {
                self.events.emit(&EngineEvent::Corroborated {
                    report_id: report.id.clone(),
                    voter: actor.clone(),
                    count: *count,
                });
            }
            Transition::QuorumReached { corroborators } => {
                tracing::info!(
                    report_id = %report.id,
                    corroborators = corroborators.len(),
                    "report verified by quorum"
                );
                self.metrics.verifications.inc();
                self.events.emit(&EngineEvent::Corroborated {
                    report_id: report.id.clone(),
                    voter: actor.clone(),
                    count: report.corroboration_count,
                });
                self.emit_resolution(report, true);
            }
            Transition::Overridden { by } => {
                tracing::info!(report_id = %report.id, admin = %by, "report verified by administrator");
                self.metrics.overrides.inc();
                self.emit_resolution(report, true);
            }
            Transition::Rejected { by } => {
                tracing::info!(report_id = %report.id, voter = %by, "report rejected by vote");
                self.metrics.rejections.inc();
                self.emit_resolution(report, false);
            }
            Transition::AdminRejected { by } => {
                tracing::info!(report_id = %report.id, admin = %by, "report rejected by administrator");
                self.metrics.rejections.inc();
                self.emit_resolution(report, false);
            }
        }

        for event in events_for(transition) {
            let deltas = compute_rewards(&self.settings.params.rewards, *event, actor, report);
            self.emit_rewards(&report.id, *event, &deltas);
        }
    }

    fn emit_resolution(&self, report: &Report, verified: bool) {
        let Some(resolution) = report.resolution.clone() else {
            return;
        };
        let event = if verified {
            EngineEvent::Verified {
                report_id: report.id.clone(),
                resolution,
            }
        } else {
            EngineEvent::Rejected {
                report_id: report.id.clone(),
                resolution,
            }
        };
        self.events.emit(&event);
    }

    fn emit_rewards(
        &self,
        report_id: &ReportId,
        reason: RewardEvent,
        deltas: &[roadwatch_verification::RewardDelta],
    ) {
        for delta in deltas {
            self.metrics.tokens_rewarded.inc_by(delta.tokens);
            self.events.emit(&EngineEvent::Rewarded {
                account: delta.account.clone(),
                report_id: report_id.clone(),
                reason,
                tokens: delta.tokens,
                reputation: delta.reputation,
            });
        }
    }

    // ── Store and identity plumbing ─────────────────────────────────────

    async fn permit(&self) -> Result<SemaphorePermit<'_>, EngineError> {
        self.ops
            .acquire()
            .await
            .map_err(|_| EngineError::Internal("engine is shutting down".into()))
    }

    async fn require_principal(&self, principal: &PrincipalId) -> Result<(), EngineError> {
        let p = principal.clone();
        if self.with_identity("exists", move |id| id.exists(&p)).await? {
            Ok(())
        } else {
            Err(EngineError::Unauthorized(format!("unknown principal {principal}")))
        }
    }

    async fn load_report(&self, id: &ReportId) -> Result<Versioned<Report>, EngineError> {
        let id = id.clone();
        self.with_store("load_report", move |s| s.load_report(&id)).await
    }

    async fn find_report(&self, id: &ReportId) -> Result<Option<Versioned<Report>>, EngineError> {
        let id = id.clone();
        self.with_store("find_report", move |s| s.find_report(&id)).await
    }

    async fn find_account(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<Versioned<Account>>, EngineError> {
        let principal = principal.clone();
        self.with_store("load_account", move |s| s.load_account(&principal))
            .await
    }

    async fn load_accounts(
        &self,
        principals: Vec<PrincipalId>,
    ) -> Result<Vec<Option<Versioned<Account>>>, EngineError> {
        self.with_store("load_accounts", move |s| {
            principals.iter().map(|p| s.load_account(p)).collect()
        })
        .await
    }

    /// The stored account with its version, or a fresh one at version 0.
    async fn account_or_new(
        &self,
        principal: &PrincipalId,
        now: Timestamp,
    ) -> Result<(Account, u64), EngineError> {
        Ok(match self.find_account(principal).await? {
            Some(v) => (v.record, v.version),
            None => (
                Account::new(
                    principal.clone(),
                    self.settings.params.starting_tokens,
                    self.settings.params.starting_reputation,
                    now,
                ),
                0,
            ),
        })
    }

    /// Commit one batch and report what the store actually did.
    ///
    /// A commit on the blocking pool cannot be cancelled and may land after
    /// `io_timeout`, so a slow commit is waited out and its real outcome
    /// returned. Only reads and identity calls fail on timeout.
    async fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome, EngineError> {
        let started = Instant::now();
        let store = Arc::clone(&self.store);
        let mut task = tokio::task::spawn_blocking(move || store.commit(&batch));
        let joined = match tokio::time::timeout(self.settings.io_timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(
                    backend = self.store.backend_name(),
                    timeout_ms = self.settings.io_timeout.as_millis() as u64,
                    "commit outlived io timeout, waiting for it to settle"
                );
                self.metrics.slow_commits.inc();
                task.await
            }
        };
        let result =
            joined.map_err(|join| EngineError::Internal(format!("commit task failed: {join}")))?;
        self.metrics
            .commit_latency_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(()) => Ok(CommitOutcome::Applied),
            Err(e) if e.is_conflict() => {
                tracing::warn!(backend = self.store.backend_name(), error = %e, "version conflict on commit");
                self.metrics.version_conflicts.inc();
                Ok(CommitOutcome::Stale)
            }
            Err(e) => Err(self.store_failure("commit", e)),
        }
    }

    async fn with_store<T, F>(&self, what: &'static str, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&dyn RecordStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || f(store.as_ref()));
        self.await_blocking(what, task)
            .await?
            .map_err(|e| self.store_failure(what, e))
    }

    async fn with_identity<T, F>(&self, what: &'static str, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&dyn IdentityGateway) -> Result<T, IdentityError> + Send + 'static,
        T: Send + 'static,
    {
        let identity = Arc::clone(&self.identity);
        let task = tokio::task::spawn_blocking(move || f(identity.as_ref()));
        self.await_blocking(what, task).await?.map_err(|e| {
            tracing::warn!(op = what, error = %e, "identity gateway call failed");
            self.metrics.backend_failures.inc();
            EngineError::from(e)
        })
    }

    async fn await_blocking<T>(
        &self,
        what: &'static str,
        task: JoinHandle<T>,
    ) -> Result<T, EngineError> {
        match tokio::time::timeout(self.settings.io_timeout, task).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(join)) => Err(EngineError::Internal(format!("{what} task failed: {join}"))),
            Err(_) => {
                tracing::warn!(
                    op = what,
                    timeout_ms = self.settings.io_timeout.as_millis() as u64,
                    "backend call timed out"
                );
                self.metrics.backend_failures.inc();
                Err(EngineError::BackendUnavailable(format!(
                    "{what} timed out after {:?}",
                    self.settings.io_timeout
                )))
            }
        }
    }

    fn store_failure(&self, what: &'static str, e: StoreError) -> EngineError {
        if !matches!(e, StoreError::NotFound(_)) {
            tracing::warn!(op = what, backend = self.store.backend_name(), error = %e, "record store call failed");
            self.metrics.backend_failures.inc();
        }
        e.into()
    }

    fn retries_exhausted(&self, what: &'static str) -> EngineError {
        tracing::warn!(
            op = what,
            retries = self.settings.max_commit_retries,
            "giving up after repeated version conflicts"
        );
        EngineError::BackendUnavailable(format!(
            "{what}: store kept changing underneath, gave up after {} retries",
            self.settings.max_commit_retries
        ))
    }
}
