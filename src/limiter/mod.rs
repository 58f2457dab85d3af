//! Rate limiting for replayed requests
//!
//! A single `RateLimiter` is shared by every outbound call of a run. It is
//! the only admission-control point for upstream traffic; the action queue
//! deliberately does not throttle.

mod rate_limiter;

pub use rate_limiter::RateLimiter;
