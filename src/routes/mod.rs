pub mod health;
pub mod itinerarios;
