//! Cancel-and-replace search pipeline.
//!
//! At most one query runs at any instant. Claiming the pipeline for a new query
//! preempts the in-flight one: its token is cancelled, its partial results are
//! discarded silently and the new run owns the next callback invocation. Queries are
//! never queued.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

use crate::engine::{EngineError, HierarchicalObjectRef, Scene};

/// A unique identifier for one search run.
pub type SearchId = Uuid;

/// Invoked with the complete result set of a query that ran to completion, in
/// arrival order. The callback is a cheap synchronous handoff and must not call back
/// into the pipeline.
pub type ResultCallback = Arc<dyn Fn(&[HierarchicalObjectRef]) + Send + Sync>;

#[derive(Debug, Error)]
pub enum SearchError {
	#[error(transparent)]
	Source(#[from] EngineError),
}

/// What became of one search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
	/// Blank query, nothing ran.
	Ignored,
	/// Ran to completion and delivered its results.
	Completed { count: usize },
	/// Preempted by a later run; partial results were discarded.
	Superseded,
}

/// A claimed run, created by [`SearchPipeline::begin`] and consumed by
/// [`SearchPipeline::drive`].
#[derive(Debug)]
pub struct SearchRun {
	id: SearchId,
	query: String,
	token: CancellationToken,
	generation: u64,
}

#[derive(Debug, Default)]
struct SearchState {
	/// Bumped on every run that starts. Delivery is only allowed to the run holding
	/// the current generation, so a superseded run can never deliver after its
	/// successor.
	generation: u64,
	/// Token of the in-flight run, `None` when idle.
	active: Option<CancellationToken>,
}

pub struct SearchPipeline<S> {
	scene: Arc<S>,
	state: Arc<Mutex<SearchState>>,
	on_results: ResultCallback,
}

impl<S> Clone for SearchPipeline<S> {
	fn clone(&self) -> Self {
		Self {
			scene: Arc::clone(&self.scene),
			state: Arc::clone(&self.state),
			on_results: Arc::clone(&self.on_results),
		}
	}
}

impl<S: Scene> SearchPipeline<S> {
	pub fn new(scene: Arc<S>, on_results: ResultCallback) -> Self {
		Self {
			scene,
			state: Arc::new(Mutex::new(SearchState::default())),
			on_results,
		}
	}

	fn lock_state(&self) -> MutexGuard<'_, SearchState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Whether a query is currently in flight.
	pub fn is_running(&self) -> bool {
		self.lock_state().active.is_some()
	}

	/// Synchronously claim the pipeline for `query`, cancelling any in-flight run.
	///
	/// Returns `None` for a blank query, which changes no pipeline state. Claims
	/// take effect in call order, so the caller that claims last owns the next
	/// delivery.
	pub fn begin(&self, query: &str) -> Option<SearchRun> {
		if query.trim().is_empty() {
			trace!("blank query ignored");
			return None;
		}

		let token = CancellationToken::new();
		let mut state = self.lock_state();
		if let Some(prev) = state.active.take() {
			debug!("preempting in-flight search");
			prev.cancel();
		}
		state.generation += 1;
		state.active = Some(token.clone());

		Some(SearchRun {
			id: SearchId::new_v4(),
			query: query.to_string(),
			token,
			generation: state.generation,
		})
	}

	/// Drain the search source for a claimed run and deliver its result.
	///
	/// Source failures are returned to the caller with the pipeline left idle;
	/// cancellation is not a failure and reports [`SubmitOutcome::Superseded`] with
	/// zero deliveries.
	#[instrument(skip(self, run), fields(search_id = %run.id, query = %run.query))]
	pub async fn drive(&self, run: SearchRun) -> Result<SubmitOutcome, SearchError> {
		let SearchRun {
			query,
			token,
			generation,
			..
		} = run;

		let mut source = self.scene.search(&query, token.clone());
		let mut results = Vec::new();

		loop {
			tokio::select! {
				() = token.cancelled() => {
					trace!(collected = results.len(), "superseded, discarding partial results");
					return Ok(SubmitOutcome::Superseded);
				}
				item = source.next() => match item {
					Some(Ok(obj)) => results.push(obj),
					Some(Err(e)) => {
						let mut state = self.lock_state();
						if state.generation == generation {
							state.active = None;
						}
						warn!(%e, "search source failed");
						return Err(e.into());
					}
					None => break,
				},
			}
		}

		let mut state = self.lock_state();
		if state.generation != generation || token.is_cancelled() {
			trace!("source completed after preemption, discarding");
			return Ok(SubmitOutcome::Superseded);
		}
		state.active = None;

		let count = results.len();
		debug!(count, "search completed");
		// Deliver while still holding the state lock: a younger run can neither
		// claim nor deliver until this callback returns.
		(self.on_results)(&results);

		Ok(SubmitOutcome::Completed { count })
	}

	/// Claim and drive in one call.
	pub async fn submit(&self, query: &str) -> Result<SubmitOutcome, SearchError> {
		match self.begin(query) {
			Some(run) => self.drive(run).await,
			None => Ok(SubmitOutcome::Ignored),
		}
	}
}
