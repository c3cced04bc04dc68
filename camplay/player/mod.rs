pub mod controller;
pub mod graph;
pub mod gst_pipeline;
#[cfg(test)]
pub mod mock;

use crate::error::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

/// Status events reported by the running pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    EndOfStream,
    Error(String),
}

// set_state and query_state may block until the pipeline settles; poll_event never blocks.
pub trait PipelineEventSource {
    fn set_state(&self, target: PlaybackState) -> Result<(), App>;

    fn query_state(&self) -> PlaybackState;

    fn poll_event(&self) -> Option<PipelineEvent>;
}
