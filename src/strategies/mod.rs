pub mod ma_cross;
pub mod traits;
