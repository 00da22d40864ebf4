pub mod crop_store;
pub mod server;
pub mod session;

pub use crop_store::{CropRecord, CropStore, Generation};
pub use session::{SceneState, Session};
