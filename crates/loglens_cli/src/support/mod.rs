pub mod fs;
pub mod io;
