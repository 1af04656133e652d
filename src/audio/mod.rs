pub mod analysis;
pub mod batch;
pub mod decode;
pub mod features;
pub mod source;
