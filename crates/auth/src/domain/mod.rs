//! Domain layer: entities, value objects and the traits the application
//! layer depends on

pub mod entity;
pub mod event;
pub mod notifier;
pub mod repository;
pub mod value_object;
