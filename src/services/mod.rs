pub mod encryption;
pub mod wallet;
