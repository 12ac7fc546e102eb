#![forbid(unsafe_code)]

mod rendering;

pub use rendering::{init_tracing, render_heights_to_png, HeightRamp, RenderConfig};
