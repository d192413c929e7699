pub mod additive;
pub mod linear;
