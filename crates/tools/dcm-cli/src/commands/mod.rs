pub mod apply;
pub mod deployment;
pub mod keygen;
pub mod permit;
pub mod replay;
