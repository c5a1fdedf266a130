pub mod claims;
pub mod codec;
pub mod keys;
pub mod token;

pub use claims::ClaimMap;
pub use codec::TokenCodec;
pub use token::Token;
