pub mod itinerario;
