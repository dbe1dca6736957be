//! Report pipeline: messages, producer, step handlers and workers

mod analysis;
mod handler;
mod idea;
mod message;
mod overview;
mod producer;
mod worker;

pub use analysis::AnalysisHandler;
pub use handler::StepHandler;
pub use idea::IdeaHandler;
pub use message::{Step, StepMessage};
pub use overview::OverviewHandler;
pub use producer::ReportProducer;
pub use worker::StepWorker;
