pub mod bootstrap;
pub mod check;
