#![forbid(unsafe_code)]

mod filter;
mod ident;
mod outcome;
mod record;
mod schema;
mod value;

pub use filter::*;
pub use ident::*;
pub use outcome::*;
pub use record::*;
pub use schema::*;
pub use value::*;

#[cfg(test)]
mod tests;
