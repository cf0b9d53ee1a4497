pub mod analysis;
pub mod decode;
pub mod notes;
pub mod spectrum;
pub mod window;
