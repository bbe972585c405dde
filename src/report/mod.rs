pub mod colormap;
pub mod pdf;
pub mod png;
pub mod svg;
