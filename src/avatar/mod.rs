/// Avatar resolution module - Gateway

mod resolver;

pub use resolver::{AvatarCoordinator, AvatarImage, AvatarState};
