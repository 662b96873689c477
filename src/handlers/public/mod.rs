// Public handlers: no authentication required.
mod health;

pub use health::health;
