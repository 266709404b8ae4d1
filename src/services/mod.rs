pub mod error;
pub mod itinerarios;
pub mod serializer;
pub mod validation;
