use crate::error::App;
use crate::player::{PipelineEvent, PipelineEventSource, PlaybackState};
use log::{debug, error, info, warn};
use std::io::{self, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    PauseToggle,
    Quit,
    EndOfStream,
    Failure(String),
}

impl From<PipelineEvent> for ControlEvent {
    fn from(event: PipelineEvent) -> Self {
        match event {
            PipelineEvent::EndOfStream => ControlEvent::EndOfStream,
            PipelineEvent::Error(message) => ControlEvent::Failure(message),
        }
    }
}

/// How the control loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    Success,
    Failure(String),
}

impl Exit {
    pub fn code(&self) -> i32 {
        match self {
            Exit::Success => 0,
            Exit::Failure(_) => 1,
        }
    }

    pub fn report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if let Exit::Failure(message) = self {
            writeln!(out, "camplay: {}", App::PipelineFailure(message.clone()))?;
            out.flush()?;
        }
        Ok(())
    }
}

/// Playback state machine fed by the keyboard, signals and the pipeline bus.
pub struct Controller<P: PipelineEventSource> {
    pipeline: P,
    state: PlaybackState,
    pause_receiver: mpsc::Receiver<()>,
    quit_receiver: mpsc::Receiver<()>,
    ticker: Interval,
}

impl<P: PipelineEventSource> Controller<P> {
    pub fn start(
        pipeline: P,
        pause_receiver: mpsc::Receiver<()>,
        quit_receiver: mpsc::Receiver<()>,
        poll_interval: Duration,
    ) -> Result<Self, App> {
        if let Err(e) = pipeline.set_state(PlaybackState::Playing) {
            if let Err(stop_error) = pipeline.set_state(PlaybackState::Stopped) {
                error!("Failed to stop pipeline after failed start: {}", stop_error);
            }
            return Err(e);
        }
        info!("PLAY (press space to pause)");

        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Ok(Self {
            pipeline,
            state: PlaybackState::Playing,
            pause_receiver,
            quit_receiver,
            ticker,
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub async fn run(mut self) -> Exit {
        loop {
            let event = self.next_event().await;
            if let Some(exit) = self.handle(event) {
                debug!("Control loop finished in {:?}", self.state());
                return exit;
            }
        }
    }

    // Keyboard and signal requests race the poll tick; each tick drains the bus.
    pub async fn next_event(&mut self) -> ControlEvent {
        loop {
            tokio::select! {
                Some(()) = self.pause_receiver.recv() => return ControlEvent::PauseToggle,
                Some(()) = self.quit_receiver.recv() => return ControlEvent::Quit,
                _ = self.ticker.tick() => {}
            }

            if let Some(event) = self.drain_pipeline() {
                return event;
            }
        }
    }

    fn drain_pipeline(&self) -> Option<ControlEvent> {
        let mut first = None;
        while let Some(event) = self.pipeline.poll_event() {
            if first.is_none() {
                first = Some(ControlEvent::from(event));
            } else {
                debug!("Pipeline event after termination request ignored: {:?}", event);
            }
        }
        first
    }

    pub fn handle(&mut self, event: ControlEvent) -> Option<Exit> {
        if self.state == PlaybackState::Stopped {
            warn!("Event {:?} received after stop", event);
            return None;
        }

        match event {
            ControlEvent::PauseToggle => {
                self.toggle();
                None
            }
            ControlEvent::Quit => {
                self.stop();
                info!("end");
                Some(Exit::Success)
            }
            ControlEvent::EndOfStream => {
                info!("End of stream");
                self.stop();
                Some(Exit::Success)
            }
            ControlEvent::Failure(message) => {
                // Reported on stderr by Exit::report.
                debug!("Error from GStreamer pipeline: {}", message);
                self.stop();
                Some(Exit::Failure(message))
            }
        }
    }

    fn toggle(&mut self) {
        let current = self.pipeline.query_state();
        if current != self.state {
            debug!("Pipeline reports {:?}, expected {:?}", current, self.state);
        }

        let target = match current {
            PlaybackState::Playing => PlaybackState::Paused,
            PlaybackState::Paused => PlaybackState::Playing,
            PlaybackState::Stopped => {
                warn!("Pause toggle ignored, pipeline is stopped");
                return;
            }
        };
        self.state = current;

        match self.pipeline.set_state(target) {
            Ok(()) => {
                self.state = target;
                if target == PlaybackState::Paused {
                    info!("PAUSE (press space to continue)");
                } else {
                    info!("PLAY (press space to pause)");
                }
            }
            Err(e) => error!("Failed to switch to {:?}: {}", target, e),
        }
    }

    fn stop(&mut self) {
        if let Err(e) = self.pipeline.set_state(PlaybackState::Stopped) {
            error!("Failed to stop: {}", e);
        }
        self.state = PlaybackState::Stopped;
    }
}
