pub mod doctor;
pub mod gateway;
