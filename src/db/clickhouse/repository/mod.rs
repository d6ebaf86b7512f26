pub mod currency_repository;
