mod imageresize;

pub use imageresize::{ImageResizer, ImageResizerError, ImageSource, ResizeSpec};
