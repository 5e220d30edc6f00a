//! `.pkpass` archive creation and inspection.

pub mod inspect;
pub mod zipper;

pub use inspect::PassArchive;
pub use zipper::{write_archive, ZipCommand, ZipWriterZipper, Zipper};
