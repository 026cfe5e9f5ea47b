//! Icon processing: recoloring, staged file naming, and zip packaging.

pub mod archive;
pub mod naming;
pub mod recolor;

pub use archive::{archive_directory, list_entries, ArchiveError};
pub use naming::{sanitize_file_stem, FileNamer};
pub use recolor::{
    classify, encode_png, recolor, remap, resize_rgba, Color, DecodeError, Palette, PixelClass,
    DEFAULT_TARGET_SIZE, ICON_THRESHOLD, MAX_TARGET_SIZE,
};
