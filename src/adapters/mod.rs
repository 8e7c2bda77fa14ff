pub mod diagram;
pub mod loaders;
pub mod writers;
