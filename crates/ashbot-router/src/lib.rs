//! Message routing: priority-ordered classification and dispatch of every
//! inbound message, the command engine, query handlers, conversation flows,
//! trivia sessions, and reminder parsing.

pub mod backpressure;
pub mod classify;
pub mod commands;
pub mod context;
pub mod handlers;
pub mod reminders;
pub mod router;
pub mod sweeps;

pub use context::BotContext;
pub use router::Router;
