pub mod card_repo;
