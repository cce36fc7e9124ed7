//! Clients for the booking app's managed services, the asset copier, and the
//! commands built on them.

pub(crate) mod api;
pub(crate) mod assets;
pub(crate) mod commands;
pub(crate) mod models;
