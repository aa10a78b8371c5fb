pub mod credits;
pub mod enums;
