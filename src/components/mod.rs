// Export components
pub mod calendar;
pub mod posts;
pub mod query;

// Re-export the feed handle
pub use calendar::CalendarFeedHandle;
