pub mod backend;
pub mod resources;

pub use backend::{ProcessBackend, ProcessRequest};
pub use resources::ResourceManager;
