pub mod attempt;
pub mod question;
pub mod score_conversion;
pub mod submission;
