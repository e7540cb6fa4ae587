pub mod backend_adapter;
pub mod http_client;
pub mod identity_adapter;
pub mod map_surface;
pub mod notifier;
