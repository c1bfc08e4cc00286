//! Encoder models and the building blocks they share.

pub mod components;
pub mod implementations;

pub use implementations::{DistilBertSentimentModel, RobertaSentimentModel, SentimentModel};
