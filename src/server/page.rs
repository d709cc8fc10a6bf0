use base64::{engine::general_purpose, Engine as _};

use crate::config::DisplayConfig;
use crate::decoder::Caption;

const TEMPLATE: &str = include_str!("assets/page.html");

/// What goes under the upload form.
pub enum Outcome<'a> {
    Empty,
    Captioned {
        image: &'a [u8],
        mime: &'static str,
        caption: &'a Caption,
        display: &'a DisplayConfig,
    },
    Error(String),
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn render(outcome: Outcome) -> String {
    let result = match outcome {
        Outcome::Empty => String::new(),
        Outcome::Captioned {
            image,
            mime,
            caption,
            display,
        } => format!(
            r#"<section class="result">
  <img src="data:{mime};base64,{data}" alt="Uploaded Image">
  <p class="hint">Uploaded Image</p>
  <h2>Generated Caption:</h2>
  <p class="caption">{caption}</p>
  <pre>Accuracy: {accuracy}
Loss: {loss}</pre>
  <p class="hint">Figures from the model's training run, not from this image.</p>
</section>"#,
            mime = mime,
            data = general_purpose::STANDARD.encode(image),
            caption = html_escape(&caption.text()),
            accuracy = html_escape(&display.accuracy),
            loss = html_escape(&display.loss),
        ),
        Outcome::Error(message) => format!(
            r#"<div class="error">ERROR: {}</div>"#,
            html_escape(&message)
        ),
    };
    TEMPLATE.replace("{{RESULT}}", &result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_page_has_upload_form() {
        let html = render(Outcome::Empty);
        assert!(html.contains(r#"action="/caption""#));
        assert!(html.contains("multipart/form-data"));
        assert!(!html.contains("{{RESULT}}"));
        assert!(!html.contains("Generated Caption:"));
    }

    #[test]
    fn test_error_is_escaped() {
        let html = render(Outcome::Error("<script>".to_string()));
        assert!(html.contains("ERROR: &lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape(r#"a & "b" <c>"#), "a &amp; &quot;b&quot; &lt;c&gt;");
    }
}
