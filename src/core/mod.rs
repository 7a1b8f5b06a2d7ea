pub mod account_service;
pub mod card_service;
pub mod random;
pub mod reveal;
pub mod session_service;
pub mod token;
pub mod verification;
