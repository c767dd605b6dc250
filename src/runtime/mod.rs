/// Runtime surfaces module - Gateway

mod input;
mod interactive;
mod non_interactive;
mod render;

pub use interactive::InteractiveRunner;
pub use non_interactive::{ExecutionMetadata, NonInteractiveResult, NonInteractiveRunner};
pub use render::{render_notice, render_turn};
