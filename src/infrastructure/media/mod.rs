pub mod fs_media_source;

pub use fs_media_source::FsMediaSource;
