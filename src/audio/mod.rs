pub mod decode;
pub mod signal;

pub use decode::decode_file;
pub use signal::Signal;
