pub mod post;
pub mod subscription;
