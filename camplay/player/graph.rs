use crate::config::PipelineConfig;
use crate::error::App;
use gstreamer::prelude::*;
use gstreamer::{Caps, Element, ElementFactory, Pipeline};
use log::info;
use std::str::FromStr;

fn make(factory: &str) -> Result<Element, App> {
    ElementFactory::make(factory)
        .build()
        .map_err(|_| App::Element(format!("Failed to create {factory} element")))
}

/// `gstreamer::init` must have been called.
pub fn build(config: &PipelineConfig) -> Result<Pipeline, App> {
    let pipeline = Pipeline::new();

    let source = make("v4l2src")?;
    source.set_property("device", config.device.as_str());

    let caps = Caps::from_str(&config.caps)
        .map_err(|_| App::Element(format!("Invalid caps: {}", config.caps)))?;
    let filter = make("capsfilter")?;
    filter.set_property("caps", caps);

    let queue = make("queue")?;
    queue.set_property("max-size-buffers", config.queue_max_buffers);
    queue.set_property_from_str("leaky", "downstream");

    let parser = make(&config.parser)?;
    let decoder = make(&config.decoder)?;
    let postproc = make(&config.postproc)?;

    let video_sink = make(&config.video_sink)?;
    video_sink.set_property("sync", false);
    if video_sink.find_property("force-aspect-ratio").is_some() {
        video_sink.set_property("force-aspect-ratio", true);
    }

    let display = make("fpsdisplaysink")?;
    display.set_property("text-overlay", config.text_overlay);
    display.set_property("sync", false);
    display.set_property("video-sink", video_sink);

    let elements = [source, filter, queue, parser, decoder, postproc, display];
    pipeline
        .add_many(&elements)
        .map_err(|_| App::Pipeline("Failed to add elements to pipeline".to_string()))?;
    Element::link_many(&elements)
        .map_err(|_| App::Link("Failed to link capture elements".to_string()))?;

    info!(
        "Pipeline built for {} ({} -> {} -> {})",
        config.device, config.caps, config.decoder, config.video_sink
    );
    Ok(pipeline)
}
