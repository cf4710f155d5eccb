pub mod access;
pub mod event;
pub mod listener;
pub mod manager;
pub mod source;
pub mod state;
pub mod worker;

#[cfg(test)]
mod access_test;
#[cfg(test)]
mod worker_test;
