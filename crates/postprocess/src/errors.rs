use std::io;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostProcessError {
    #[error(
        "Invalid letterbox geometry: {width}x{height} image into {network_size}px network input"
    )]
    InvalidGeometry {
        width: u32,
        height: u32,
        network_size: u32,
    },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Names file contains no class names")]
    Empty,
}

#[derive(Error, Debug)]
pub enum LabelWriteError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
