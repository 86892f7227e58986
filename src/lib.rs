// Altwatch: alt-account detection for Discord servers
//
// This is the library root. Scoring is pure and synchronous; the handler
// wraps it with the ban store, the moderation platform and audit reporting.

pub mod audit;
pub mod config;
pub mod db;
pub mod handler;
pub mod output;
pub mod platform;
pub mod scoring;
pub mod status;
