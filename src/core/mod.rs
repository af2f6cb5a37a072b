// Core types shared by the startup pipeline and the domains

pub mod errors;
pub mod logger;
