pub mod draw;
pub mod maze;
pub mod progress;
pub mod raster;
