pub mod answer;
pub mod error;
pub mod health;
pub mod openapi;
