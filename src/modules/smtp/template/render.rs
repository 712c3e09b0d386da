use crate::modules::error::code::ErrorCode;
use crate::modules::smtp::template::entity::{EmailTemplate, MessageFormat};
use crate::{modules::error::RustRelayResult, raise_error};
use handlebars::Handlebars;
use pulldown_cmark::{html, Parser};
use serde_json::Value;
pub struct Templates;

impl Templates {
    pub fn render(
        template: &EmailTemplate,
        data: &Option<Value>,
    ) -> RustRelayResult<(String, Option<String>, Option<String>)> {
        match data {
            None => Ok((
                template.subject.clone(),
                template.text.clone(),
                template.html.clone(),
            )),
            Some(data) => {
                let mut handlebars = Handlebars::new();

                let register_template = |hb: &mut Handlebars, name: &str, content: &str| {
                    hb.register_template_string(name, content).map_err(|e| {
                        raise_error!(
                            format!("Handlebars register '{name}' error: {e}"),
                            ErrorCode::InternalError
                        )
                    })
                };

                register_template(&mut handlebars, "subject", &template.subject)?;
                if let Some(text) = &template.text {
                    register_template(&mut handlebars, "text", text)?;
                }
                if let Some(html) = &template.html {
                    register_template(&mut handlebars, "html", html)?;
                }

                let render_template = |hb: &Handlebars, name: &str| {
                    hb.render(name, data).map_err(|e| {
                        raise_error!(
                            format!("Handlebars '{name}' render error: {e}"),
                            ErrorCode::InternalError
                        )
                    })
                };

                let subject = render_template(&handlebars, "subject")?;
                let text = template
                    .text
                    .as_ref()
                    .map(|_| render_template(&handlebars, "text"))
                    .transpose()?;
                let mut html = template
                    .html
                    .as_ref()
                    .map(|_| render_template(&handlebars, "html"))
                    .transpose()?;

                if let Some(format) = &template.format {
                    if let Some(html_content) = &mut html {
                        if matches!(format, MessageFormat::Markdown) {
                            let mut html_output = String::new();
                            html::push_html(&mut html_output, Parser::new(html_content));
                            *html_content = html_output;
                        }
                    }
                }

                Ok((subject, text, html))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build_template() -> EmailTemplate {
        EmailTemplate {
            id: 1,
            kind: Some("welcome".into()),
            description: None,
            subject: "Welcome to {{site_name}}".into(),
            text: Some("Hello {{recipient_name}}, your inbox is ready.".into()),
            html: Some("<p>Hello {{recipient_name}}</p>".into()),
            format: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_render_substitutes_variables() {
        let template = build_template();
        let data = json!({"site_name": "TempMail", "recipient_name": "Ada"});
        let (subject, text, html) = Templates::render(&template, &Some(data)).unwrap();
        assert_eq!(subject, "Welcome to TempMail");
        assert_eq!(text.unwrap(), "Hello Ada, your inbox is ready.");
        assert_eq!(html.unwrap(), "<p>Hello Ada</p>");
    }

    #[test]
    fn test_render_without_data_returns_raw_template() {
        let template = build_template();
        let (subject, text, _) = Templates::render(&template, &None).unwrap();
        assert_eq!(subject, "Welcome to {{site_name}}");
        assert!(text.unwrap().contains("{{recipient_name}}"));
    }

    #[test]
    fn test_render_missing_variable_renders_empty() {
        let template = build_template();
        let (subject, _, _) =
            Templates::render(&template, &Some(json!({"recipient_name": "Ada"}))).unwrap();
        assert_eq!(subject, "Welcome to ");
    }

    #[test]
    fn test_markdown_body_is_converted_to_html() {
        let mut template = build_template();
        template.format = Some(MessageFormat::Markdown);
        template.html = Some("# Hello {{recipient_name}}".into());
        let data = json!({"recipient_name": "Ada"});
        let (_, _, html) = Templates::render(&template, &Some(data)).unwrap();
        assert_eq!(html.unwrap().trim(), "<h1>Hello Ada</h1>");
    }
}
