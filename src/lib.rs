pub mod bible;
pub mod completion;
pub mod config;
pub mod dialogue;
pub mod emotions;
pub mod health;
pub mod lock;
pub mod service;
pub mod verses;
