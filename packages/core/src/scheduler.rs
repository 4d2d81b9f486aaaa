//! Admission and retry bookkeeping for a compression queue.
//!
//! [`Scheduler`] is the synchronous half of the queue: it owns the waiting
//! list and the active set, and decides what runs next. It never awaits, so
//! whoever owns it (the queue actor) applies each operation atomically.

use std::collections::{HashMap, HashSet};

use crate::{Job, JobId, Priority, QueueConfig, QueueProgress, QueueStatus};

/// A job handed out for execution.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub job: Job,
    /// Generation the job was admitted in. Completions carrying an older
    /// generation are ignored.
    pub generation: u64,
}

/// What happened to a job after a failed attempt.
#[derive(Debug, Clone)]
pub enum FailureOutcome {
    /// The job went back to the waiting list as this new value.
    Retrying(Job),
    /// The job ran out of retries.
    Exhausted(Job),
}

/// Waiting list, active set and pause flag of one queue.
#[derive(Debug)]
pub struct Scheduler {
    config: QueueConfig,
    /// Sorted by priority, ascending. Ties keep insertion order.
    waiting: Vec<Job>,
    /// Ids in `waiting`.
    waiting_ids: HashSet<JobId>,
    active: HashMap<JobId, Job>,
    paused: bool,
    generation: u64,
}

impl Scheduler {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            waiting: Vec::new(),
            waiting_ids: HashSet::new(),
            active: HashMap::new(),
            paused: false,
            generation: 0,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Add jobs to the waiting list.
    ///
    /// Jobs whose id is already waiting or active are skipped. Priorities
    /// are capped by [`Scheduler::max_priority`]. Returns the jobs that were
    /// accepted.
    pub fn enqueue(&mut self, jobs: impl IntoIterator<Item = Job>) -> Vec<JobId> {
        let mut accepted = Vec::new();
        for mut job in jobs {
            if self.active.contains_key(&job.id) || !self.waiting_ids.insert(job.id.clone()) {
                tracing::warn!("Skipping duplicate job {}", job.id);
                continue;
            }
            job.priority = job.priority.min(self.max_priority(job.max_retries));
            accepted.push(job.id.clone());
            self.waiting.push(job);
        }
        self.sort_waiting();
        accepted
    }

    /// Change the priority of a waiting job. Active and unknown jobs are left alone.
    pub fn set_priority(&mut self, id: &JobId, priority: Priority) -> bool {
        if !self.waiting_ids.contains(id) {
            return false;
        }
        let penalty = self.config.retry_penalty;
        let Some(job) = self.waiting.iter_mut().find(|j| &j.id == id) else {
            return false;
        };
        let remaining = job.max_retries.saturating_sub(job.retry_count);
        job.priority = priority.min(priority_cap(penalty, remaining));
        self.sort_waiting();
        true
    }

    /// Highest priority a fresh job with `max_retries` may hold, so that
    /// every retry still lands on a strictly greater value.
    pub fn max_priority(&self, max_retries: u32) -> Priority {
        priority_cap(self.config.retry_penalty, max_retries)
    }

    /// Move as many waiting jobs into the active set as free slots allow.
    pub fn admit(&mut self) -> Vec<Dispatch> {
        let mut dispatched = Vec::new();
        if self.paused {
            return dispatched;
        }

        while self.active.len() < self.config.concurrency_limit && !self.waiting.is_empty() {
            let job = self.waiting.remove(0);
            self.waiting_ids.remove(&job.id);
            self.active.insert(job.id.clone(), job.clone());
            dispatched.push(Dispatch {
                job,
                generation: self.generation,
            });
        }

        dispatched
    }

    /// Record a successful attempt. Returns `None` for stale completions.
    pub fn succeed(&mut self, id: &JobId, generation: u64) -> Option<Job> {
        if generation != self.generation {
            return None;
        }
        self.active.remove(id)
    }

    /// Record a failed attempt. Returns `None` for stale completions.
    pub fn fail(&mut self, id: &JobId, generation: u64) -> Option<FailureOutcome> {
        if generation != self.generation {
            return None;
        }
        let job = self.active.remove(id)?;

        if job.can_retry() {
            let retried = job.retried(self.config.retry_penalty);
            let index = self
                .waiting
                .partition_point(|j| j.priority <= retried.priority);
            self.waiting_ids.insert(retried.id.clone());
            self.waiting.insert(index, retried.clone());
            Some(FailureOutcome::Retrying(retried))
        } else {
            Some(FailureOutcome::Exhausted(job))
        }
    }

    /// Drop all waiting work, forget the active set and lift a pause.
    ///
    /// In-flight calls keep running; their completions belong to the old
    /// generation and are ignored. Returns the number of jobs discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.waiting.len() + self.active.len();
        self.waiting.clear();
        self.waiting_ids.clear();
        self.active.clear();
        self.paused = false;
        self.generation += 1;
        discarded
    }

    /// Stop admitting work. Returns whether the state changed.
    pub fn pause(&mut self) -> bool {
        !std::mem::replace(&mut self.paused, true)
    }

    /// Allow admissions again. Returns whether the state changed.
    pub fn resume(&mut self) -> bool {
        std::mem::replace(&mut self.paused, false)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether any work is waiting or in flight.
    pub fn is_processing(&self) -> bool {
        !self.waiting.is_empty() || !self.active.is_empty()
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.active.contains_key(id) || self.waiting_ids.contains(id)
    }

    pub fn is_active(&self, id: &JobId) -> bool {
        self.active.contains_key(id)
    }

    pub fn waiting(&self) -> &[Job] {
        &self.waiting
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            waiting_count: self.waiting.len(),
            active_count: self.active.len(),
            is_processing: self.is_processing(),
            paused: self.paused,
        }
    }

    pub fn progress(&self) -> QueueProgress {
        QueueProgress {
            current: self.active.len(),
            total: self.active.len() + self.waiting.len(),
            completed: 0,
            failed: 0,
            processing: self.is_processing(),
        }
    }

    // `sort_by_key` is stable, which gives insertion order on ties.
    fn sort_waiting(&mut self) {
        self.waiting.sort_by_key(|j| j.priority);
    }
}

fn priority_cap(penalty: Priority, retries: u32) -> Priority {
    Priority::MAX.saturating_sub(penalty.saturating_mul(Priority::from(retries)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompressionOptions, SourceImage};
    use proptest::prelude::*;

    fn job(id: &str, priority: Priority) -> Job {
        let source = SourceImage::new(format!("{id}.jpg"), vec![0u8; 8])
            .with_id(id)
            .into_ref();
        Job::new(source, CompressionOptions::default()).with_priority(priority)
    }

    fn ids(dispatched: &[Dispatch]) -> Vec<&str> {
        dispatched.iter().map(|d| d.job.id.as_str()).collect()
    }

    fn scheduler(limit: usize) -> Scheduler {
        Scheduler::new(QueueConfig::default().with_concurrency_limit(limit))
    }

    #[test]
    fn admits_up_to_the_limit_in_priority_order() {
        let mut s = scheduler(3);
        s.enqueue((0..5).map(|i| job(&format!("job-{i}"), i)));

        let dispatched = s.admit();
        assert_eq!(ids(&dispatched), ["job-0", "job-1", "job-2"]);
        assert_eq!(s.status().active_count, 3);
        assert_eq!(s.status().waiting_count, 2);
        assert!(s.admit().is_empty());

        s.succeed(&"job-1".into(), 0).unwrap();
        assert_eq!(ids(&s.admit()), ["job-3"]);
    }

    #[test]
    fn lower_priority_value_runs_first() {
        let mut s = scheduler(1);
        s.enqueue([job("slow", 5), job("fast", 1)]);
        assert_eq!(ids(&s.admit()), ["fast"]);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut s = scheduler(10);
        s.enqueue([job("a", 1), job("b", 0), job("c", 1), job("d", 0)]);
        let order: Vec<_> = s.waiting().iter().map(|j| j.id.as_str()).collect();
        assert_eq!(order, ["b", "d", "a", "c"]);
    }

    #[test]
    fn duplicates_are_skipped() {
        let mut s = scheduler(1);
        let accepted = s.enqueue([job("a", 0), job("a", 1), job("b", 2)]);
        assert_eq!(accepted.len(), 2);

        s.admit();
        assert!(s.is_active(&"a".into()));
        assert!(s.enqueue([job("a", 0)]).is_empty());
        assert_eq!(s.status().waiting_count, 1);
    }

    #[test]
    fn failed_job_is_requeued_behind_fresh_work() {
        let mut s = scheduler(1);
        s.enqueue([job("a", 0), job("b", 1)]);
        s.admit();

        let Some(FailureOutcome::Retrying(retried)) = s.fail(&"a".into(), 0) else {
            panic!("expected a retry");
        };
        assert_eq!(retried.retry_count, 1);
        assert_eq!(retried.priority, 1000);
        assert_eq!(ids(&s.admit()), ["b"]);
        s.succeed(&"b".into(), 0);
        assert_eq!(ids(&s.admit()), ["a"]);
    }

    #[test]
    fn job_fails_for_good_after_max_retries() {
        let mut s = Scheduler::new(QueueConfig::default().with_concurrency_limit(1));
        s.enqueue([job("a", 0).with_max_retries(2)]);

        for attempt in 1..=2 {
            s.admit();
            let outcome = s.fail(&"a".into(), 0).unwrap();
            assert!(
                matches!(outcome, FailureOutcome::Retrying(ref j) if j.retry_count == attempt)
            );
        }

        s.admit();
        let outcome = s.fail(&"a".into(), 0).unwrap();
        assert!(matches!(outcome, FailureOutcome::Exhausted(ref j) if j.retry_count == 2));
        assert!(!s.is_processing());
    }

    #[test]
    fn set_priority_only_touches_waiting_jobs() {
        let mut s = scheduler(1);
        s.enqueue([job("a", 0), job("b", 1), job("c", 2)]);
        s.admit();

        assert!(!s.set_priority(&"a".into(), 50));
        assert!(!s.set_priority(&"missing".into(), 50));
        assert!(s.set_priority(&"c".into(), -1));

        let order: Vec<_> = s.waiting().iter().map(|j| j.id.as_str()).collect();
        assert_eq!(order, ["c", "b"]);
    }

    #[test]
    fn clear_resets_and_ignores_stale_completions() {
        let mut s = scheduler(2);
        s.enqueue([job("a", 0), job("b", 1), job("c", 2)]);
        let dispatched = s.admit();
        let stale_generation = dispatched[0].generation;

        assert_eq!(s.clear(), 3);
        assert_eq!(
            s.status(),
            QueueStatus {
                waiting_count: 0,
                active_count: 0,
                is_processing: false,
                paused: false,
            }
        );

        s.enqueue([job("a", 0)]);
        s.admit();
        assert!(s.succeed(&"a".into(), stale_generation).is_none());
        assert!(s.fail(&"a".into(), stale_generation).is_none());
        assert!(s.is_active(&"a".into()));
        assert!(s.succeed(&"a".into(), s.generation()).is_some());
    }

    #[test]
    fn pause_blocks_admission_until_resume() {
        let mut s = scheduler(2);
        assert!(s.pause());
        assert!(!s.pause());

        s.enqueue([job("a", 0)]);
        assert!(s.admit().is_empty());
        assert!(s.is_processing());
        assert!(s.status().paused);

        assert!(s.resume());
        assert!(!s.resume());
        assert_eq!(ids(&s.admit()), ["a"]);
    }

    #[test]
    fn clear_lifts_a_pause() {
        let mut s = scheduler(2);
        s.pause();
        s.enqueue([job("a", 0)]);
        s.clear();
        assert!(!s.is_paused());

        s.enqueue([job("b", 0)]);
        assert_eq!(ids(&s.admit()), ["b"]);
    }

    #[test]
    fn large_batches_enqueue_quickly() {
        let mut s = scheduler(3);
        let started = std::time::Instant::now();

        let accepted = s.enqueue((0..40_000).map(|i| job(&format!("job-{i}"), i)));
        assert_eq!(accepted.len(), 40_000);
        assert!(s.enqueue([job("job-39999", 0)]).is_empty());
        assert!(s.contains(&"job-20000".into()));

        assert_eq!(ids(&s.admit()), ["job-0", "job-1", "job-2"]);
        assert!(s.contains(&"job-0".into()));
        assert!(s.enqueue([job("job-0", 0)]).is_empty());
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn retry_from_the_top_priority_still_goes_backwards() {
        let mut s = scheduler(1);
        let cap = s.max_priority(2);
        s.enqueue([job("a", Priority::MAX).with_max_retries(2)]);
        assert_eq!(s.waiting()[0].priority, cap);

        let mut last = cap;
        for _ in 0..2 {
            let generation = s.generation();
            s.admit();
            match s.fail(&"a".into(), generation) {
                Some(FailureOutcome::Retrying(job)) => {
                    assert!(job.priority > last);
                    last = job.priority;
                }
                other => panic!("expected a retry, got {other:?}"),
            }
        }
    }

    #[test]
    fn set_priority_is_capped_by_remaining_retries() {
        let mut s = scheduler(1);
        s.enqueue([job("a", 0).with_max_retries(2)]);
        assert!(s.set_priority(&"a".into(), Priority::MAX));
        assert_eq!(s.waiting()[0].priority, s.max_priority(2));
    }

    #[test]
    fn progress_uses_a_moving_total() {
        let mut s = scheduler(1);
        s.enqueue([job("a", 0)]);
        s.admit();
        assert_eq!(s.progress().total, 1);

        s.fail(&"a".into(), 0);
        let progress = s.progress();
        assert_eq!(progress.current, 0);
        assert_eq!(progress.total, 1);
        assert_eq!(progress.completed, 0);
        assert_eq!(progress.failed, 0);
        assert!(progress.processing);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Enqueue(u8, i64),
        Admit,
        Succeed(u8),
        Fail(u8),
        SetPriority(u8, i64),
        Pause,
        Resume,
        Clear,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (0u8..12, -5i64..20).prop_map(|(id, p)| Op::Enqueue(id, p)),
            4 => Just(Op::Admit),
            3 => (0u8..12).prop_map(Op::Succeed),
            3 => (0u8..12).prop_map(Op::Fail),
            2 => (0u8..12, -5i64..20).prop_map(|(id, p)| Op::SetPriority(id, p)),
            1 => Just(Op::Pause),
            1 => Just(Op::Resume),
            1 => Just(Op::Clear),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_for_any_operation_sequence(
            limit in 1usize..5,
            ops in proptest::collection::vec(op(), 1..80),
        ) {
            let mut s = scheduler(limit);

            for op in ops {
                let generation = s.generation();
                match op {
                    Op::Enqueue(id, p) => {
                        s.enqueue([job(&format!("j{id}"), p)]);
                    }
                    Op::Admit => {
                        s.admit();
                    }
                    Op::Succeed(id) => {
                        s.succeed(&format!("j{id}").into(), generation);
                    }
                    Op::Fail(id) => {
                        let before = s.waiting().len();
                        match s.fail(&format!("j{id}").into(), generation) {
                            Some(FailureOutcome::Retrying(job)) => {
                                prop_assert!(job.retry_count <= job.max_retries);
                                prop_assert_eq!(s.waiting().len(), before + 1);
                            }
                            Some(FailureOutcome::Exhausted(job)) => {
                                prop_assert_eq!(job.retry_count, job.max_retries);
                                prop_assert!(!s.contains(&job.id));
                            }
                            None => {}
                        }
                    }
                    Op::SetPriority(id, p) => {
                        s.set_priority(&format!("j{id}").into(), p);
                    }
                    Op::Pause => {
                        s.pause();
                    }
                    Op::Resume => {
                        s.resume();
                    }
                    Op::Clear => {
                        s.clear();
                    }
                }

                prop_assert!(s.active_count() <= limit);
                prop_assert!(s.waiting().windows(2).all(|w| w[0].priority <= w[1].priority));
                for waiting in s.waiting() {
                    prop_assert!(!s.is_active(&waiting.id));
                }
                let unique: std::collections::HashSet<_> =
                    s.waiting().iter().map(|j| &j.id).collect();
                prop_assert_eq!(unique.len(), s.waiting().len());
                prop_assert_eq!(
                    s.is_processing(),
                    s.status().waiting_count + s.status().active_count > 0
                );
            }
        }

        #[test]
        fn retries_always_lower_precedence(
            priority in prop_oneof![
                Just(Priority::MAX),
                Just(Priority::MAX - 1),
                Just(Priority::MIN),
                any::<Priority>(),
            ],
            penalty in prop_oneof![Just(1i64), 1i64..5000, Just(Priority::MAX / 4)],
            max_retries in 0u32..4,
        ) {
            let config = QueueConfig {
                retry_penalty: penalty,
                max_retries,
                ..QueueConfig::default().with_concurrency_limit(1)
            };
            prop_assume!(config.validate().is_ok());
            let mut s = Scheduler::new(config);
            s.enqueue([job("a", priority).with_max_retries(max_retries)]);

            let mut last = s.waiting()[0].priority;
            let mut attempts = 0;
            loop {
                let generation = s.generation();
                prop_assert_eq!(s.admit().len(), 1);
                attempts += 1;
                match s.fail(&"a".into(), generation) {
                    Some(FailureOutcome::Retrying(job)) => {
                        prop_assert!(job.priority > last);
                        prop_assert_eq!(job.retry_count, attempts);
                        last = job.priority;
                    }
                    Some(FailureOutcome::Exhausted(job)) => {
                        prop_assert_eq!(job.retry_count, max_retries);
                        break;
                    }
                    None => prop_assert!(false, "job went missing"),
                }
            }
            prop_assert_eq!(attempts, max_retries + 1);
        }
    }
}
