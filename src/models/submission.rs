use chrono::{DateTime, Utc};

/// A stored survey response. `id` and `created_at` come from the store.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Submission {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub role: String,
    pub support: Option<i32>,
    pub response: Option<i32>,
    pub clarity: Option<i32>,
    pub reports: Option<String>,
    pub overall: Option<i32>,
    pub comments: Option<String>,
}

/// A validated response that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewSubmission {
    pub name: String,
    pub role: String,
    pub support: Option<i32>,
    pub response: Option<i32>,
    pub clarity: Option<i32>,
    pub reports: Option<String>,
    pub overall: Option<i32>,
    pub comments: Option<String>,
}

impl NewSubmission {
    pub fn set_rating(&mut self, field: RatingField, value: Option<i32>) {
        let slot = match field {
            RatingField::Support => &mut self.support,
            RatingField::Response => &mut self.response,
            RatingField::Clarity => &mut self.clarity,
            RatingField::Overall => &mut self.overall,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingField {
    Support,
    Response,
    Clarity,
    Overall,
}

impl RatingField {
    pub const ALL: [RatingField; 4] = [
        RatingField::Support,
        RatingField::Response,
        RatingField::Clarity,
        RatingField::Overall,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RatingField::Support => "support",
            RatingField::Response => "response",
            RatingField::Clarity => "clarity",
            RatingField::Overall => "overall",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(s.trim()))
    }
}
