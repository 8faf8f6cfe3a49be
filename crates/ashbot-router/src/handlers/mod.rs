pub mod chat;
pub mod conversation;
pub mod queries;
pub mod strikes;
pub mod trivia;
