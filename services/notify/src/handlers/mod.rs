pub mod events;
pub mod post;
pub mod subscription;
