//! Services that keep decoding, file access and naming out of the transforms

pub mod format;
pub mod io;

pub use format::{DownloadName, OutputFormatHandler, OutputKind};
pub use io::ImageIOService;
