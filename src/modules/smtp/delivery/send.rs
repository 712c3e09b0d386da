use serde_json::{Map, Value};

use crate::modules::error::code::ErrorCode;
use crate::modules::error::RustRelayResult;
use crate::modules::settings::system::{SystemSetting, SITE_NAME_KEY, SITE_URL_KEY};
use crate::modules::smtp::delivery::payload::{
    SendEmailRequest, SendMailResponse, SendTestMailRequest,
};
use crate::modules::smtp::delivery::{DeliveryOrchestrator, DeliveryOutcome, DeliveryRequest};
use crate::modules::smtp::template::entity::EmailTemplate;
use crate::modules::smtp::template::render::Templates;
use crate::modules::smtp::transport::RenderedMail;
use crate::{raise_error, validate_email};

/// Render a stored template and push the result through the failover engine.
pub async fn send_templated_email(request: SendEmailRequest) -> RustRelayResult<SendMailResponse> {
    request.validate()?;

    let template = match (request.template_id, &request.template_kind) {
        (Some(id), _) => EmailTemplate::get(id).await?.ok_or_else(|| {
            raise_error!(
                format!("Template with id {id} not found"),
                ErrorCode::ResourceNotFound
            )
        })?,
        (None, Some(kind)) => EmailTemplate::find_by_kind(kind).await?.ok_or_else(|| {
            raise_error!(
                format!("No template with kind '{kind}' found"),
                ErrorCode::ResourceNotFound
            )
        })?,
        (None, None) => {
            return Err(raise_error!(
                "Either 'template_id' or 'template_kind' must be provided.".into(),
                ErrorCode::InvalidParameter
            ))
        }
    };

    let data = template_data(&request)?;
    let (subject, text, html) = Templates::render(&template, &Some(data))?;
    if text.is_none() && html.is_none() {
        return Err(raise_error!(
            format!("Template {} has neither a text nor an html body", template.id),
            ErrorCode::InvalidParameter
        ));
    }

    let mail = RenderedMail {
        to_address: request.recipient_email.clone(),
        to_name: request.recipient_name.clone(),
        subject: subject.clone(),
        text,
        html,
    };
    let outcome = deliver_detached(DeliveryRequest {
        mail,
        smtp_config: None,
    })
    .await?;

    Ok(SendMailResponse {
        success: true,
        message: "Email delivered".into(),
        subject,
        details: Some(describe_outcome(&outcome)),
    })
}

/// Direct send bypassing the template path; used for smoke-testing SMTP
/// configuration. Caller-supplied credentials, when present, are tried
/// before the pool.
pub async fn send_direct_email(request: SendTestMailRequest) -> RustRelayResult<SendMailResponse> {
    validate_email!(&request.recipient_email)?;

    let subject = request
        .subject
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "rustrelay test message".to_string());
    let body = request
        .body
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| "This is a rustrelay delivery test.".to_string());

    let mail = RenderedMail {
        to_address: request.recipient_email.clone(),
        to_name: None,
        subject: subject.clone(),
        text: Some(body),
        html: None,
    };
    let outcome = deliver_detached(DeliveryRequest {
        mail,
        smtp_config: request.smtp_config.map(|config| config.into_credentials()),
    })
    .await?;

    Ok(SendMailResponse {
        success: true,
        message: "Email delivered".into(),
        subject,
        details: Some(describe_outcome(&outcome)),
    })
}

/// Build the handlebars data for a send: site-level settings first, then the
/// recipient fields, then caller variables (which may override both).
fn template_data(request: &SendEmailRequest) -> RustRelayResult<Value> {
    let mut data = Map::new();
    if let Some(site_name) = SystemSetting::get_existing_value(SITE_NAME_KEY)? {
        data.insert("site_name".into(), Value::String(site_name));
    }
    if let Some(site_url) = SystemSetting::get_existing_value(SITE_URL_KEY)? {
        data.insert("site_url".into(), Value::String(site_url));
    }
    data.insert(
        "recipient_email".into(),
        Value::String(request.recipient_email.clone()),
    );
    if let Some(recipient_name) = &request.recipient_name {
        data.insert(
            "recipient_name".into(),
            Value::String(recipient_name.clone()),
        );
    }
    if let Some(custom_variables) = &request.custom_variables {
        for (key, value) in custom_variables {
            data.insert(key.clone(), Value::String(value.clone()));
        }
    }
    Ok(Value::Object(data))
}

/// Run the delivery on its own task: if the caller disconnects mid-send, a
/// dispatched attempt still completes, so the mailbox health state and the
/// attempt log reflect what actually happened on the wire.
async fn deliver_detached(request: DeliveryRequest) -> RustRelayResult<DeliveryOutcome> {
    tokio::spawn(async move { DeliveryOrchestrator::new().deliver(&request).await })
        .await
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
}

fn describe_outcome(outcome: &DeliveryOutcome) -> String {
    match (outcome.mailbox_id, outcome.via_fallback) {
        (Some(mailbox_id), _) => format!(
            "delivered via mailbox {} on attempt {}",
            mailbox_id, outcome.attempts
        ),
        (None, true) => format!(
            "delivered via fallback SMTP after {} attempts",
            outcome.attempts
        ),
        (None, false) => "delivered via caller-supplied SMTP configuration".to_string(),
    }
}
