#![allow(
    clippy::needless_return,
    clippy::similar_names,
    clippy::module_name_repetitions
)]
#![warn(clippy::correctness, clippy::perf, clippy::pedantic)]
#[macro_use]
extern crate log;

pub use crate::decoder::{Decoder, Image, ImageInfo, OutputFormat};
pub use crate::probe::is_jpeg;

mod bitstream;
pub mod bmp;
mod components;
mod decoder;
pub mod errors;
mod headers;
mod huffman;
mod idct;
mod marker;
mod mcu;
mod mcu_prog;
mod misc;
mod probe;
mod scan;
mod worker;
