//! Session domain module: messages, history, and stream events

pub mod entities;
pub mod stream;
