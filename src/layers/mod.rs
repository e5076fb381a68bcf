pub mod halo;
pub mod marker;
