pub mod archives;
pub mod artifacts;
pub mod paths;
pub mod temps;
