pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod external;
pub mod jobs;
pub mod map;
pub mod navigation;
pub mod signals;
