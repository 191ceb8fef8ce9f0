mod stream;

pub use stream::*;
