use crate::error::App;
use crate::player::{PipelineEvent, PipelineEventSource, PlaybackState};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Inner {
    state: PlaybackState,
    requested: Vec<PlaybackState>,
    events: VecDeque<PipelineEvent>,
    failing: bool,
}

/// Records every state request and replays queued bus events.
#[derive(Clone, Debug)]
pub struct Recording {
    inner: Arc<Mutex<Inner>>,
}

impl Recording {
    pub fn new(state: PlaybackState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state,
                requested: Vec::new(),
                events: VecDeque::new(),
                failing: false,
            })),
        }
    }

    pub fn push_event(&self, event: PipelineEvent) {
        self.inner.lock().unwrap().events.push_back(event);
    }

    /// Makes subsequent `set_state` calls fail without changing state.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap().failing = failing;
    }

    /// Changes the state behind the controller's back.
    pub fn force_state(&self, state: PlaybackState) {
        self.inner.lock().unwrap().state = state;
    }

    pub fn requested(&self) -> Vec<PlaybackState> {
        self.inner.lock().unwrap().requested.clone()
    }

    pub fn pending_events(&self) -> usize {
        self.inner.lock().unwrap().events.len()
    }
}

impl PipelineEventSource for Recording {
    fn set_state(&self, target: PlaybackState) -> Result<(), App> {
        let mut inner = self.inner.lock().unwrap();
        inner.requested.push(target);
        if inner.failing {
            return Err(App::PipelineCommand(format!("refused {target:?}")));
        }
        inner.state = target;
        Ok(())
    }

    fn query_state(&self) -> PlaybackState {
        self.inner.lock().unwrap().state
    }

    fn poll_event(&self) -> Option<PipelineEvent> {
        self.inner.lock().unwrap().events.pop_front()
    }
}
