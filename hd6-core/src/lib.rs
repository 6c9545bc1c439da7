//! HD6 index / DAT archive pairs.

pub mod cursor;
pub mod datfile;
pub mod error;
pub mod extract;
pub mod hd6;
pub mod name;
pub mod package;
pub mod raw;
pub mod read;
pub mod replace;
pub mod write;
