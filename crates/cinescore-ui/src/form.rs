//! Form page rendering.
//!
//! The page is a single self-contained HTML template, embedded at compile
//! time. Rendering fills its `{{...}}` slots; every user-supplied value is
//! HTML-escaped.

use std::fmt::Write;

use crate::interactive::{FormInput, Prediction};

/// The form page template.
pub const FORM_HTML: &str = include_str!("../assets/form.html");

const DEFAULT_RUNTIME: u32 = 120;

/// Everything one render of the page shows.
#[derive(Debug, Default)]
pub struct FormView<'a> {
    pub genres: &'a [String],
    pub languages: &'a [String],
    pub generation: Option<&'a str>,
    /// Values to pre-fill, usually the last submission.
    pub input: Option<&'a FormInput>,
    pub prediction: Option<&'a Prediction>,
    pub error: Option<String>,
}

/// Render the form page.
pub fn render_form(view: &FormView<'_>) -> String {
    let runtime = view.input.map(|i| i.runtime).unwrap_or(DEFAULT_RUNTIME);
    let overview = view.input.map(|i| i.overview.as_str()).unwrap_or("");
    let genre = view.input.map(|i| i.genre.as_str());
    let language = view.input.map(|i| i.language.as_str());

    FORM_HTML
        .replace("{{RUNTIME}}", &runtime.to_string())
        .replace("{{GENRE_OPTIONS}}", &options(view.genres, genre))
        .replace("{{LANGUAGE_OPTIONS}}", &options(view.languages, language))
        .replace("{{GENERATION}}", &escape(view.generation.unwrap_or("unversioned")))
        .replace("{{RESULT}}", &result_block(view))
        .replace("{{OVERVIEW}}", &escape(overview))
}

fn options(values: &[String], selected: Option<&str>) -> String {
    let mut html = String::new();
    for value in values {
        let escaped = escape(value);
        let marker = if Some(value.as_str()) == selected {
            " selected"
        } else {
            ""
        };
        let _ = write!(html, "<option value=\"{}\"{}>{}</option>", escaped, marker, escaped);
    }
    html
}

fn result_block(view: &FormView<'_>) -> String {
    if let Some(error) = &view.error {
        return format!("<div class=\"error\">{}</div>", escape(error));
    }
    let Some(prediction) = view.prediction else {
        return String::new();
    };

    let mut html = String::from("<div class=\"result\">");
    let _ = write!(
        html,
        "<div>Predicted rating</div><div class=\"rating\">{}</div>",
        prediction.rating_display()
    );
    let _ = write!(
        html,
        "<div>Overview sentiment: <strong>{}</strong> ({})</div>",
        prediction.label,
        prediction.score_display()
    );
    if let Some(input) = view.input {
        let _ = write!(
            html,
            "<div class=\"note\">Genre: {} / Language: {} / Runtime: {} min</div>",
            escape(&input.genre),
            escape(&input.language),
            input.runtime
        );
    }
    if prediction.scored_text.is_degraded() {
        html.push_str(
            "<div class=\"note\">Translation unavailable; sentiment was scored on the text as typed.</div>",
        );
    }
    html.push_str("</div>");
    html
}

/// Minimal HTML escaping for text and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinescore_core::outcome::Outcome;
    use cinescore_core::types::SentimentLabel;

    fn classes(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_template_has_all_slots() {
        for slot in [
            "{{RUNTIME}}",
            "{{GENRE_OPTIONS}}",
            "{{LANGUAGE_OPTIONS}}",
            "{{OVERVIEW}}",
            "{{RESULT}}",
            "{{GENERATION}}",
        ] {
            assert!(FORM_HTML.contains(slot), "missing {}", slot);
        }
        assert!(FORM_HTML.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_empty_form_lists_encoder_classes() {
        let genres = classes(&["Action", "Drama"]);
        let languages = classes(&["en"]);
        let html = render_form(&FormView {
            genres: &genres,
            languages: &languages,
            ..Default::default()
        });

        assert!(html.contains("<option value=\"Action\">Action</option>"));
        assert!(html.contains("<option value=\"en\">en</option>"));
        assert!(html.contains("value=\"120\""));
        assert!(html.contains("unversioned"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_result_and_echo_line() {
        let genres = classes(&["Action", "Drama"]);
        let languages = classes(&["en", "ko"]);
        let input = FormInput {
            runtime: 95,
            genre: "Drama".into(),
            language: "ko".into(),
            overview: "<b>bold</b>".into(),
        };
        let prediction = Prediction {
            rating: 7.2571,
            sentiment: -0.3333,
            label: SentimentLabel::Negative,
            overview_len: 11,
            scored_text: Outcome::degraded("<b>bold</b>".to_string(), "offline"),
        };
        let html = render_form(&FormView {
            genres: &genres,
            languages: &languages,
            generation: Some("2026-01-23-abc"),
            input: Some(&input),
            prediction: Some(&prediction),
            error: None,
        });

        assert!(html.contains("7.26 / 10"));
        assert!(html.contains("<strong>negative</strong> (-0.33)"));
        assert!(html.contains("Genre: Drama / Language: ko / Runtime: 95 min"));
        assert!(html.contains("<option value=\"Drama\" selected>"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(!html.contains("<b>bold</b>"));
        assert!(html.contains("Translation unavailable"));
        assert!(html.contains("2026-01-23-abc"));
    }

    #[test]
    fn test_error_block_is_escaped() {
        let html = render_form(&FormView {
            error: Some("Unknown genre: <script>".into()),
            ..Default::default()
        });
        assert!(html.contains("<div class=\"error\">Unknown genre: &lt;script&gt;</div>"));
    }
}
