use async_channel::{Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::poll::{poll_until_terminal, PollPolicy};
use super::state::JobState;
use crate::{
    api::{RouteAPI, API},
    entities::{RouteRequest, RouteResult},
    error::Error,
};

/// Identifies one submitted analysis. Stale handles are inert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobHandle {
    pub id: Uuid,
    /// `None` when the submission was superseded before the backend answered.
    pub route_id: Option<String>,
}

/// What subscribers observe. Intermediate polls produce nothing.
#[derive(Clone, Debug, PartialEq)]
pub enum JobEvent {
    Result(RouteResult),
    Error(Error),
}

#[derive(Default)]
struct Inner {
    state: JobState,
    active: Option<Uuid>,
    route_id: Option<String>,
    task: Option<JoinHandle<()>>,
    last_result: Option<RouteResult>,
    last_error: Option<Error>,
    subscribers: Vec<Sender<JobEvent>>,
}

impl Inner {
    fn emit(&mut self, event: JobEvent) {
        self.subscribers
            .retain(|tx| tx.try_send(event.clone()).is_ok());
    }

    fn cancel_active(&mut self) -> bool {
        let Some(id) = self.active.take() else {
            return false;
        };

        if let Some(task) = self.task.take() {
            task.abort();
        }

        if self.state.cancel().is_ok() {
            tracing::info!("cancelled job {}", id);
        }

        self.route_id = None;
        true
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns the submit → poll → terminal lifecycle of at most one analysis.
pub struct JobClient<A: ?Sized = dyn API + Send + Sync> {
    api: Arc<A>,
    policy: PollPolicy,
    inner: Arc<Mutex<Inner>>,
}

impl<A> JobClient<A>
where
    A: RouteAPI + Send + Sync + ?Sized + 'static,
{
    pub fn new(api: Arc<A>, policy: PollPolicy) -> Self {
        Self {
            api,
            policy,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn subscribe(&self) -> Receiver<JobEvent> {
        let (tx, rx) = async_channel::unbounded();
        lock(&self.inner).subscribers.push(tx);
        rx
    }

    pub fn state(&self) -> JobState {
        lock(&self.inner).state
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.inner).state.is_loading()
    }

    pub fn active_route_id(&self) -> Option<String> {
        lock(&self.inner).route_id.clone()
    }

    /// The most recent completed result, kept across later failures.
    pub fn last_result(&self) -> Option<RouteResult> {
        lock(&self.inner).last_result.clone()
    }

    pub fn last_error(&self) -> Option<Error> {
        lock(&self.inner).last_error.clone()
    }

    /// Cancels whatever is active, submits `request` and starts polling.
    #[tracing::instrument(skip(self))]
    pub async fn submit(&self, request: RouteRequest) -> Result<JobHandle, Error> {
        let id = Uuid::new_v4();

        {
            let mut inner = lock(&self.inner);
            inner.cancel_active();
            inner.state.submit()?;
            inner.active = Some(id);
            inner.last_error = None;
        }

        let created = match request.validate() {
            Ok(()) => self.api.create_route(&request).await,
            Err(err) => Err(err),
        };

        let mut inner = lock(&self.inner);

        if inner.active != Some(id) {
            tracing::debug!("submission {} superseded, discarding response", id);
            return Ok(JobHandle {
                id,
                route_id: created.ok().map(|c| c.route_id),
            });
        }

        let created = match created {
            Ok(created) => created,
            Err(err) => {
                let err = err.into_submission_error();
                inner.state.fail()?;
                inner.active = None;
                inner.last_error = Some(err.clone());
                inner.emit(JobEvent::Error(err.clone()));
                return Err(err);
            }
        };

        inner.state.accepted()?;
        inner.route_id = Some(created.route_id.clone());

        let task = tokio::spawn(run_poll(
            self.api.clone(),
            self.inner.clone(),
            id,
            created.route_id.clone(),
            self.policy,
        ));
        inner.task = Some(task);

        tracing::info!("polling route {} as job {}", created.route_id, id);

        Ok(JobHandle {
            id,
            route_id: Some(created.route_id),
        })
    }

    /// Marks `handle` inactive. Returns false for stale or finished handles.
    #[tracing::instrument(skip(self))]
    pub fn cancel(&self, handle: &JobHandle) -> bool {
        let mut inner = lock(&self.inner);

        if inner.active != Some(handle.id) {
            return false;
        }

        inner.cancel_active()
    }

    /// Cancels the active job, if any.
    pub fn cancel_active(&self) -> bool {
        lock(&self.inner).cancel_active()
    }
}

impl<A: ?Sized> Drop for JobClient<A> {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.inner).task.take() {
            task.abort();
        }
    }
}

async fn run_poll<A>(
    api: Arc<A>,
    inner: Arc<Mutex<Inner>>,
    id: Uuid,
    route_id: String,
    policy: PollPolicy,
) where
    A: RouteAPI + Send + Sync + ?Sized,
{
    let outcome = poll_until_terminal(api.as_ref(), &route_id, &policy, || {
        lock(&inner).active == Some(id)
    })
    .await;

    let mut inner = lock(&inner);

    // the check and the emission happen under one lock so a cancel that wins
    // the race leaves nothing observable
    if inner.active != Some(id) {
        tracing::debug!("job {} no longer active, dropping outcome", id);
        return;
    }

    inner.active = None;
    inner.task = None;

    let transition = match outcome {
        Ok(Some(result)) => {
            inner.last_result = Some(result.clone());
            inner.emit(JobEvent::Result(result));
            inner.state.complete()
        }
        Ok(None) => return,
        Err(err) => {
            inner.last_error = Some(err.clone());
            let transition = if err.is_timeout_error() {
                inner.state.time_out()
            } else {
                inner.state.fail()
            };
            inner.emit(JobEvent::Error(err));
            transition
        }
    };

    if let Err(err) = transition {
        tracing::warn!("job {} finished from unexpected state: {}", id, err);
    }
}
