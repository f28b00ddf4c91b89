pub mod client;
pub mod client_impl;
pub mod credentials;
pub mod factory;
pub mod prompts;
pub mod retry;
