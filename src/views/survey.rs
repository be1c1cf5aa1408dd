use askama::Template;
use axum::response::Html;

use crate::error::AppError;
use crate::models::RatingField;

/// Fields the browser insists on before it sends anything.
const CLIENT_REQUIRED: [&str; 6] = ["name", "role", "support", "response", "clarity", "overall"];

#[derive(Template)]
#[template(path = "survey.html")]
struct SurveyTemplate {
    client_required: String,
    questions: Vec<RatingQuestion>,
    scale: Vec<u8>,
}

struct RatingQuestion {
    name: &'static str,
    label: &'static str,
}

fn question_label(field: RatingField) -> &'static str {
    match field {
        RatingField::Support => "How satisfied are you with the support you receive?",
        RatingField::Response => "How quickly are your requests answered?",
        RatingField::Clarity => "How clear is the information you are given?",
        RatingField::Overall => "Overall, how would you rate the experience?",
    }
}

pub async fn form_page() -> Result<Html<String>, AppError> {
    let template = SurveyTemplate {
        client_required: CLIENT_REQUIRED.join(","),
        questions: RatingField::ALL
            .into_iter()
            .map(|field| RatingQuestion {
                name: field.name(),
                label: question_label(field),
            })
            .collect(),
        scale: (1..=5).collect(),
    };

    template
        .render()
        .map(Html)
        .map_err(|e| AppError::Internal(format!("Template render failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn renders_every_rating_group() {
        let Html(page) = form_page().await.unwrap();
        for field in RatingField::ALL {
            assert!(page.contains(&format!("name=\"{}\"", field.name())));
        }
        assert!(page.contains("data-required=\"name,role,support,response,clarity,overall\""));
        assert!(page.contains("id=\"downloadBtn\""));
    }
}
