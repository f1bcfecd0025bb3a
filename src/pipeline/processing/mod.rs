// Pipeline stages, leaf to root

pub mod assemble;
pub mod extract;
pub mod mapper;
pub mod time;
