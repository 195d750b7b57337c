mod claims;
mod signing_key;
mod token;

pub use claims::*;
pub use signing_key::*;
pub use token::*;
