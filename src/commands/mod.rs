// Alignment
pub mod align;
pub mod rollback;

// Server maintenance
pub mod backup;
pub mod history;
pub mod server;
