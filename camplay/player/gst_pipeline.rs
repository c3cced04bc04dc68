use crate::error::App;
use crate::player::{PipelineEvent, PipelineEventSource, PlaybackState};
use gstreamer::prelude::*;
use gstreamer::{Bus, ClockTime, MessageView, Pipeline, State, StateChangeSuccess};
use log::{info, warn};

impl From<PlaybackState> for State {
    fn from(state: PlaybackState) -> Self {
        match state {
            PlaybackState::Playing => State::Playing,
            PlaybackState::Paused => State::Paused,
            PlaybackState::Stopped => State::Null,
        }
    }
}

impl From<State> for PlaybackState {
    fn from(state: State) -> Self {
        match state {
            State::Playing => PlaybackState::Playing,
            State::Paused => PlaybackState::Paused,
            _ => PlaybackState::Stopped,
        }
    }
}

/// [`PipelineEventSource`] backed by a GStreamer pipeline and its bus.
#[derive(Debug)]
pub struct GstPipeline {
    pipeline: Pipeline,
    bus: Bus,
}

impl GstPipeline {
    pub fn new(pipeline: Pipeline) -> Result<Self, App> {
        let bus = pipeline
            .bus()
            .ok_or_else(|| App::Pipeline("Failed to get GStreamer bus".to_string()))?;
        Ok(Self { pipeline, bus })
    }
}

impl PipelineEventSource for GstPipeline {
    fn set_state(&self, target: PlaybackState) -> Result<(), App> {
        let change = self
            .pipeline
            .set_state(target.into())
            .map_err(|_| App::PipelineCommand(format!("Failed to set pipeline to {target:?}")))?;

        if change == StateChangeSuccess::Async {
            let (result, current, _pending) = self.pipeline.state(ClockTime::NONE);
            result.map_err(|_| {
                App::PipelineCommand(format!(
                    "Pipeline did not reach {target:?}, stuck in {current:?}"
                ))
            })?;
        }
        Ok(())
    }

    fn query_state(&self) -> PlaybackState {
        let (_result, current, _pending) = self.pipeline.state(ClockTime::NONE);
        current.into()
    }

    fn poll_event(&self) -> Option<PipelineEvent> {
        while let Some(msg) = self.bus.pop() {
            let source = msg
                .src()
                .map(|src| src.path_string().to_string())
                .unwrap_or_default();

            match msg.view() {
                MessageView::Eos(_) => {
                    info!("EOS message received");
                    return Some(PipelineEvent::EndOfStream);
                }
                MessageView::Error(err) => {
                    let mut message = format!("{source}: {}", err.error());
                    if let Some(debug) = err.debug() {
                        message.push_str(&format!(" ({debug})"));
                    }
                    return Some(PipelineEvent::Error(message));
                }
                MessageView::Warning(warning) => {
                    warn!("Warning from {}: {}", source, warning.error());
                }
                _ => (),
            }
        }
        None
    }
}
