pub mod courier;
pub mod delivery;
pub mod notification;
pub mod order;
pub mod preference;
