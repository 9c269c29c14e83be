//! Page widgets outside the globe
//!
//! Pure state machines; the DOM side lives in the wasm entry point.

pub mod carousel;
pub mod counter;

pub use carousel::{Breakpoint, Carousel, CarouselConfig};
pub use counter::{Counter, CounterTick};
