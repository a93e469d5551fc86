//! Notification templates
//!
//! Builds the emails sent on lifecycle and verification events. Each builder
//! returns `None` when there is no address to send to.

use crate::domain::notifications::EmailMessage;
use crate::domain::{RequestStatus, ServiceRequest, Technician};

/// Escape text for inclusion in an HTML body
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

fn service_label(service_type: &str) -> String {
    let label = service_type.replace('_', " ");
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => label,
    }
}

fn recipient(email: Option<&str>) -> Option<&str> {
    email.map(str::trim).filter(|e| !e.is_empty())
}

/// Confirmation to the requester after submission
pub fn request_submitted(request: &ServiceRequest) -> Option<EmailMessage> {
    let to = recipient(request.contact_email.as_deref())?;
    let service = escape_html(&service_label(&request.service_type));

    Some(EmailMessage::new(
        to,
        format!("We received your {} request", service_label(&request.service_type)),
        format!(
            "<p>Hi {},</p>\
             <p>Your <strong>{}</strong> request for the {} at {} has been received. \
             We'll let you know as soon as a technician is assigned.</p>\
             <p>Reference: {}</p>",
            escape_html(&request.contact_name),
            service,
            escape_html(&request.vehicle_model),
            escape_html(&request.address),
            request.id
        ),
    ))
}

/// Status change notice to the requester
pub fn request_status_changed(request: &ServiceRequest) -> Option<EmailMessage> {
    let to = recipient(request.contact_email.as_deref())?;

    let detail = match request.status {
        RequestStatus::Pending => "is waiting for a technician",
        RequestStatus::Assigned => "has been assigned to a technician who is on the way",
        RequestStatus::Completed => "has been completed. Thanks for using our service",
        RequestStatus::Cancelled => "has been cancelled",
    };

    Some(EmailMessage::new(
        to,
        format!("Your service request is now {}", request.status),
        format!(
            "<p>Hi {},</p><p>Your <strong>{}</strong> request {}.</p><p>Reference: {}</p>",
            escape_html(&request.contact_name),
            escape_html(&service_label(&request.service_type)),
            detail,
            request.id
        ),
    ))
}

/// Approval notice to the technician
pub fn technician_verified(technician: &Technician) -> Option<EmailMessage> {
    let to = recipient(technician.email.as_deref())?;

    Some(EmailMessage::new(
        to,
        "Your technician account has been verified",
        format!(
            "<p>Hi {},</p><p>Your account has been verified. \
             You can now receive roadside assistance requests.</p>",
            escape_html(&technician.name)
        ),
    ))
}

/// Rejection notice to the technician, with the admin's reason
pub fn technician_rejected(technician: &Technician, reason: &str) -> Option<EmailMessage> {
    let to = recipient(technician.email.as_deref())?;

    Some(EmailMessage::new(
        to,
        "Your technician application was not approved",
        format!(
            "<p>Hi {},</p><p>We could not verify your account.</p>\
             <p>Reason: {}</p><p>Reply to this email if you'd like to resubmit.</p>",
            escape_html(&technician.name),
            escape_html(reason)
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PaymentStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn request(email: Option<&str>) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            technician_id: None,
            service_type: "tire_change".into(),
            vehicle_type: "suv".into(),
            vehicle_model: "RAV4".into(),
            location_lat: 0.0,
            location_lng: 0.0,
            address: "Route 9 <north>".into(),
            description: String::new(),
            contact_name: "Dana & Co".into(),
            contact_phone: "555-0199".into(),
            contact_email: email.map(String::from),
            status: RequestStatus::Completed,
            payment_status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: Some(now),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html(r#"<b>"Tom's" & co</b>"#), "&lt;b&gt;&quot;Tom&#39;s&quot; &amp; co&lt;/b&gt;");
    }

    #[test]
    fn submitted_email_escapes_user_text() {
        let msg = request_submitted(&request(Some("dana@example.com"))).unwrap();
        assert_eq!(msg.to, "dana@example.com");
        assert_eq!(msg.subject, "We received your Tire change request");
        assert!(msg.html.contains("Dana &amp; Co"));
        assert!(msg.html.contains("Route 9 &lt;north&gt;"));
    }

    #[test]
    fn no_address_means_no_email() {
        assert!(request_submitted(&request(None)).is_none());
        assert!(request_status_changed(&request(Some("  "))).is_none());
    }

    #[test]
    fn status_email_names_new_status() {
        let msg = request_status_changed(&request(Some("dana@example.com"))).unwrap();
        assert_eq!(msg.subject, "Your service request is now completed");
        assert!(msg.html.contains("has been completed"));
    }
}
