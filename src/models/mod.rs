pub mod submission;

pub use submission::{NewSubmission, RatingField, Submission};
