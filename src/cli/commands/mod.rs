pub mod db;
pub mod tenant;
pub mod token;
