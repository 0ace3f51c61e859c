// Canvass - in-product survey delivery for Rust analytics SDKs
//
// This library decides which surveys a visitor should see: it fetches
// definitions once, filters them through targeting conditions and
// feature-flag gates, and hands eligible surveys to a lazily-loaded
// renderer extension.

// Re-export the pure evaluation layer
pub use canvass_core::*;

// Re-export the delivery runtime
pub use canvass_client::*;
