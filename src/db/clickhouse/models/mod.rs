pub mod currency_rate;
