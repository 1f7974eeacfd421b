pub mod directory;
pub mod error;
pub mod provider;
pub mod upstox;
