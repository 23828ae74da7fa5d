mod client;
mod executor;
mod expression;
mod result;

pub use client::*;
pub use executor::*;
pub use expression::*;
pub use result::*;
