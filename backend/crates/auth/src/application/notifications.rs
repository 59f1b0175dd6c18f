//! Transactional mail bodies

use platform::mail::{OutgoingMail, render_action_body, render_html_layout};

use crate::domain::value_object::email::Email;

pub(crate) fn password_reset_mail(to: &Email, user_name: &str, link: &str, ttl_minutes: u64) -> OutgoingMail {
    let subject = "Reset your password";
    let paragraph = format!(
        "Hi {user_name}, we received a request to reset your password. \
         The link below is valid for {ttl_minutes} minutes."
    );
    OutgoingMail {
        to: to.to_string(),
        subject: subject.to_string(),
        html: render_html_layout(subject, &render_action_body(&paragraph, "Reset password", link)),
        text: format!("{paragraph}\n\n{link}\n"),
    }
}

pub(crate) fn email_change_mail(
    to: &Email,
    user_name: &str,
    new_email: &Email,
    link: &str,
    to_new_address: bool,
) -> OutgoingMail {
    let subject = "Confirm your email change";
    let paragraph = if to_new_address {
        format!(
            "Hi {user_name}, confirm that you want to use this address ({new_email}) for your account."
        )
    } else {
        format!(
            "Hi {user_name}, a change of your account email to {new_email} was requested. \
             Confirm from this address to approve it."
        )
    };
    OutgoingMail {
        to: to.to_string(),
        subject: subject.to_string(),
        html: render_html_layout(subject, &render_action_body(&paragraph, "Confirm", link)),
        text: format!("{paragraph}\n\n{link}\n"),
    }
}
