pub mod address;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;
