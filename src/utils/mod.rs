pub mod rolling;
