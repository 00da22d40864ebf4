pub mod compositor;
pub mod participants;
pub mod upstream;
