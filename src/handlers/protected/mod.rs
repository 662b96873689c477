// Protected handlers: any valid session. Mutations are additionally gated by
// the permission evaluator before the data service is touched.
pub mod data;
pub mod tenant;
pub mod uploads;
pub mod users;
