// Filesystem families, one adapter each
pub mod ext;
pub mod none;
pub mod xfs;
