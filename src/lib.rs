//! Chalkboard animates tactics diagrams.
//!
//! Movement annotations (runs, passes, dribbles) drawn on a board are ordered into steps and
//! played back in batches, either interactively against a wall clock or offline at a fixed frame
//! rate for deterministic video export.
//!
//! - Build a queue from a [`Diagram`] with [`build_unscoped`] or [`build_scoped`]
//! - Drive it with a [`Scheduler`] (or the all-in-one [`Engine`])
//! - Export frames through an [`Exporter`] into a [`VideoEncoder`]
#![forbid(unsafe_code)]

pub mod choreography;
pub mod config;
pub mod diagram;
pub mod encode;
pub mod export;
pub mod foundation;
pub mod keyframe;
pub mod playback;
pub mod render;
pub mod session;

pub use crate::foundation::core::{AnnotationId, Canvas, EntityId, Fps, Point, Rgba8};
pub use crate::foundation::error::{ChalkboardError, ChalkboardResult};

pub use crate::choreography::queue::{
    ChoreographyQueue, QueuedAnimation, Selection, build_scoped, build_unscoped,
};
pub use crate::choreography::resolve::LiveInstance;
pub use crate::config::EngineConfig;
pub use crate::diagram::model::{
    Annotation, AnnotationKind, CurveDirection, Diagram, DiagramDocument, EndPoint, Entity,
    EntityKind, Ghost, MovementKind, Team,
};
pub use crate::diagram::state::{DiagramState, DiagramView, MovementCommit, Transition};
pub use crate::encode::ffmpeg::FfmpegWebmEncoder;
pub use crate::encode::sink::{EncoderConfig, InMemorySink, VideoEncoder};
pub use crate::export::exporter::{CancelToken, ExportHandle, ExportOptions, Exporter};
pub use crate::export::source::{ChoreographySource, FrameSource, SequenceSource};
pub use crate::keyframe::ease::Ease;
pub use crate::keyframe::sequence::{Keyframe, Sequence, SequenceEditor};
pub use crate::playback::clock::{Clock, SystemClock, VirtualClock};
pub use crate::playback::scheduler::{PlaybackMode, Scheduler};
pub use crate::render::cpu::CpuRenderer;
pub use crate::render::scene::{FrameRGBA, SceneRenderer, SceneSnapshot};
pub use crate::session::{Engine, ExportContent, UserRequest};

#[cfg(test)]
#[path = "../tests/unit/fixtures.rs"]
mod fixtures;
