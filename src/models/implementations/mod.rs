pub mod distilbert;
pub mod roberta;
pub mod sentiment;

pub use distilbert::DistilBertSentimentModel;
pub use roberta::RobertaSentimentModel;
pub use sentiment::SentimentModel;
