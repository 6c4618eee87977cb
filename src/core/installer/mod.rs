pub mod archive;

pub use archive::ArchiveInstaller;
