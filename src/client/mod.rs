pub mod controller;
pub mod gateway;
pub mod mirror;
pub mod temp_id;
pub mod view;
