pub mod board;
pub mod load_data;
