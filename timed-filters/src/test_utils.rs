//! In-memory collaborators for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use chrono::Utc;

use crate::backend::{
    AdvisoryLock, IdentityResolver, MailSender, Mailbox, PropertyStore, ThreadIter, TriggerAdmin,
};
use crate::config::options::{validate, JobConfig, OptionValidator, RawOptions};
use crate::services::actions::ActionRegistry;
use crate::state::{Collaborators, Job};
use crate::types::error::{FilterError, Result};
use crate::types::{HandlerId, Schedule, Thread, Trigger};

pub const DEFAULT_OPTIONS: &str = r#"
    queries = [["category:social older_than:2d", "trash"]]
"#;

pub const OWNER: &str = "owner@example.com";

pub fn raw_options(src: &str) -> RawOptions {
    toml::from_str(src).expect("test options should parse")
}

pub fn job_config() -> JobConfig {
    validate(
        &raw_options(DEFAULT_OPTIONS),
        &ActionRegistry::with_builtins(),
        &FixedIdentity(None),
    )
    .expect("default test options should validate")
}

/// `n` distinct threads
pub fn threads(n: usize) -> Vec<Thread> {
    (0..n)
        .map(|i| Thread {
            id: format!("thread-{}", i),
            subject: format!("Subject {}", i),
        })
        .collect()
}

pub struct FixedIdentity(pub Option<String>);

impl IdentityResolver for FixedIdentity {
    fn current_user_email(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn with(pairs: &[(&str, &str)]) -> Self {
        let store = Self::default();
        for (key, value) in pairs {
            store.put(key, value);
        }
        store
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn put(&self, key: &str, value: &str) {
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().unwrap().is_empty()
    }
}

impl PropertyStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.value(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, value);
        Ok(())
    }

    fn delete_all(&self) -> Result<()> {
        self.values.lock().unwrap().clear();
        Ok(())
    }
}

#[derive(Debug, Default)]
struct LockState {
    held: bool,
    acquisitions: usize,
    releases: usize,
    unpaired_releases: usize,
    renewals: usize,
}

/// Blocking in-process lock that records how it was used
#[derive(Default)]
pub struct MemoryLock {
    state: Mutex<LockState>,
    freed: Condvar,
    holders: AtomicUsize,
    max_holders: AtomicUsize,
}

impl MemoryLock {
    pub fn acquisitions(&self) -> usize {
        self.state.lock().unwrap().acquisitions
    }

    pub fn releases(&self) -> usize {
        self.state.lock().unwrap().releases
    }

    pub fn unpaired_releases(&self) -> usize {
        self.state.lock().unwrap().unpaired_releases
    }

    pub fn renewals(&self) -> usize {
        self.state.lock().unwrap().renewals
    }

    pub fn holders(&self) -> usize {
        self.holders.load(Ordering::SeqCst)
    }

    pub fn max_holders(&self) -> usize {
        self.max_holders.load(Ordering::SeqCst)
    }
}

impl AdvisoryLock for MemoryLock {
    fn try_acquire(&self, timeout: Duration) -> Result<bool> {
        let guard = self.state.lock().unwrap();
        let (mut state, _) = self
            .freed
            .wait_timeout_while(guard, timeout, |state| state.held)
            .unwrap();
        if state.held {
            return Ok(false);
        }

        state.held = true;
        state.acquisitions += 1;
        let holders = self.holders.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_holders.fetch_max(holders, Ordering::SeqCst);
        Ok(true)
    }

    fn release(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.held {
            state.unpaired_releases += 1;
            return Ok(());
        }
        self.holders.fetch_sub(1, Ordering::SeqCst);
        state.held = false;
        state.releases += 1;
        self.freed.notify_one();
        Ok(())
    }

    fn renew(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        assert!(state.held, "renewed a lock nobody holds");
        state.renewals += 1;
        Ok(())
    }
}

type Hook = Box<dyn FnOnce() + Send>;

/// Shared MemoryLock that runs a hook once, right before its first grant,
/// so another invocation can slip in between `begin` and the lock.
pub struct RacedLock {
    inner: Arc<MemoryLock>,
    before_grant: Mutex<Option<Hook>>,
}

impl AdvisoryLock for RacedLock {
    fn try_acquire(&self, timeout: Duration) -> Result<bool> {
        let hook = self.before_grant.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        self.inner.try_acquire(timeout)
    }

    fn release(&self) -> Result<()> {
        self.inner.release()
    }

    fn renew(&self) -> Result<()> {
        self.inner.renew()
    }
}

/// Lock whose every wait times out
#[derive(Default)]
pub struct TimeoutLock {
    requested: Mutex<Vec<Duration>>,
    releases: AtomicUsize,
}

impl TimeoutLock {
    pub fn requested(&self) -> Vec<Duration> {
        self.requested.lock().unwrap().clone()
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl AdvisoryLock for TimeoutLock {
    fn try_acquire(&self, timeout: Duration) -> Result<bool> {
        self.requested.lock().unwrap().push(timeout);
        Ok(false)
    }

    fn release(&self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTriggers {
    triggers: Mutex<Vec<Trigger>>,
    next_id: AtomicUsize,
}

impl MemoryTriggers {
    pub fn snapshot(&self) -> Vec<Trigger> {
        self.triggers.lock().unwrap().clone()
    }
}

impl TriggerAdmin for MemoryTriggers {
    fn list(&self) -> Result<Vec<Trigger>> {
        Ok(self.snapshot())
    }

    fn create(&self, handler: HandlerId, schedule: Schedule) -> Result<Trigger> {
        let trigger = Trigger {
            id: format!("trigger-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            handler,
            schedule,
            created_at: Utc::now(),
        };
        self.triggers.lock().unwrap().push(trigger.clone());
        Ok(trigger)
    }

    fn delete(&self, trigger: &Trigger) -> Result<()> {
        self.triggers.lock().unwrap().retain(|t| t.id != trigger.id);
        Ok(())
    }

    fn delete_all(&self) -> Result<usize> {
        let mut triggers = self.triggers.lock().unwrap();
        let removed = triggers.len();
        triggers.clear();
        Ok(removed)
    }
}

/// Mailbox serving canned search results and recording thread operations
#[derive(Default)]
pub struct FakeMailbox {
    results: Mutex<HashMap<String, Vec<Thread>>>,
    searches: Mutex<Vec<String>>,
    applied: Mutex<Vec<(String, String)>>,
    fail_on: Mutex<Option<String>>,
}

impl FakeMailbox {
    pub fn set_results(&self, query: &str, threads: Vec<Thread>) {
        self.results.lock().unwrap().insert(query.to_string(), threads);
    }

    /// Make every action on thread `id` fail.
    pub fn fail_on(&self, id: &str) {
        *self.fail_on.lock().unwrap() = Some(id.to_string());
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    /// `(action, thread id)` pairs in the order they ran
    pub fn applied(&self) -> Vec<(String, String)> {
        self.applied.lock().unwrap().clone()
    }

    fn record(&self, action: &str, thread: &Thread) -> Result<()> {
        if self.fail_on.lock().unwrap().as_deref() == Some(thread.id.as_str()) {
            return Err(FilterError::Action(format!("{} failed for {}", action, thread.id)));
        }
        self.applied
            .lock()
            .unwrap()
            .push((action.to_string(), thread.id.clone()));
        Ok(())
    }
}

impl Mailbox for FakeMailbox {
    fn search(&self, query: &str) -> Result<ThreadIter<'_>> {
        self.searches.lock().unwrap().push(query.to_string());
        let matches = self
            .results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(matches.into_iter().map(Ok)))
    }

    fn trash(&self, thread: &Thread) -> Result<()> {
        self.record("trash", thread)
    }

    fn archive(&self, thread: &Thread) -> Result<()> {
        self.record("archive", thread)
    }

    fn mark_read(&self, thread: &Thread) -> Result<()> {
        self.record("mark-read", thread)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentMail>>,
    failing: AtomicBool,
    observed: Mutex<Option<Arc<MemoryLock>>>,
    holders_at_send: Mutex<Vec<usize>>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Record how many holders `lock` has whenever a message is sent.
    pub fn observe_lock(&self, lock: Arc<MemoryLock>) {
        *self.observed.lock().unwrap() = Some(lock);
    }

    pub fn holders_at_send(&self) -> Vec<usize> {
        self.holders_at_send.lock().unwrap().clone()
    }
}

impl MailSender for RecordingSender {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        if let Some(lock) = self.observed.lock().unwrap().as_ref() {
            self.holders_at_send.lock().unwrap().push(lock.holders());
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FilterError::Transport("sendmail exited with status 75".into()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Shared fakes plus a factory for fresh per-invocation jobs
#[derive(Clone)]
pub struct TestJob {
    options: String,
    pub store: Arc<MemoryStore>,
    pub lock: Arc<MemoryLock>,
    lock_override: Option<Arc<dyn AdvisoryLock>>,
    pub triggers: Arc<MemoryTriggers>,
    pub mailbox: Arc<FakeMailbox>,
    pub mailer: Arc<RecordingSender>,
}

impl TestJob {
    pub fn new() -> Self {
        Self::with_options(DEFAULT_OPTIONS)
    }

    pub fn with_options(options: &str) -> Self {
        Self {
            options: options.to_string(),
            store: Arc::default(),
            lock: Arc::default(),
            lock_override: None,
            triggers: Arc::default(),
            mailbox: Arc::default(),
            mailer: Arc::default(),
        }
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            store: Arc::new(store),
            ..Self::new()
        }
    }

    /// Route every later job through `lock` instead of the shared MemoryLock.
    pub fn with_lock(self, lock: impl AdvisoryLock + 'static) -> Self {
        Self {
            lock_override: Some(Arc::new(lock)),
            ..self
        }
    }

    /// A fresh job, as a new scheduler invocation would build it.
    pub fn job(&self) -> Job {
        let lock: Arc<dyn AdvisoryLock> = match &self.lock_override {
            Some(lock) => Arc::clone(lock),
            None => self.lock.clone(),
        };
        self.job_with_lock(lock)
    }

    /// A fresh job that waits on `lock` instead.
    pub fn job_with_lock(&self, lock: Arc<dyn AdvisoryLock>) -> Job {
        Job::new(
            OptionValidator::new(
                raw_options(&self.options),
                ActionRegistry::with_builtins(),
                Box::new(FixedIdentity(Some(OWNER.to_string()))),
            ),
            Collaborators {
                store: self.store.clone(),
                lock,
                triggers: self.triggers.clone(),
                mailbox: self.mailbox.clone(),
                mailer: self.mailer.clone(),
            },
        )
    }

    /// A fresh job whose first lock request first lets `other` run a whole
    /// invocation against the same fakes.
    pub fn job_raced_by(&self, other: impl FnOnce(&TestJob) + Send + 'static) -> Job {
        let racer = self.clone();
        let hook: Hook = Box::new(move || other(&racer));
        let lock = RacedLock {
            inner: self.lock.clone(),
            before_grant: Mutex::new(Some(hook)),
        };
        self.job_with_lock(Arc::new(lock))
    }
}
