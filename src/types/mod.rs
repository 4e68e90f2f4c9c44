pub mod candle;
pub mod forecast;
pub mod indicator;
pub mod sentiment;
pub mod signal;

pub use candle::*;
pub use forecast::*;
pub use indicator::*;
pub use sentiment::*;
pub use signal::*;
