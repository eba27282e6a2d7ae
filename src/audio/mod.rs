pub mod decode;
pub mod features;
pub mod level;
pub mod source;
pub mod spectrum;
