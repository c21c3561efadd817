pub mod account;
pub mod cart;
pub mod catalog;
pub mod favorites;
pub mod order;
pub mod payment;
pub mod stock;
pub mod sweeper;
