pub mod delimited;
pub mod engine;
pub mod io;
pub mod model;
pub mod table;
#[cfg(test)]
pub mod testutil;
pub mod xlsx;
