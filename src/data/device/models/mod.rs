pub mod bitaxe;
pub mod whatsminer;
