// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transactional email templates.

use crate::models::{EmailTemplate, RoleProfile, UserProfile};

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
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

fn layout(heading: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <style>body {{ font-family: Arial, sans-serif; color: #1f2933; }} \
         .card {{ max-width: 560px; margin: 0 auto; padding: 24px; }} \
         td {{ padding: 4px 12px 4px 0; }}</style></head>\
         <body><div class=\"card\"><h2>{}</h2>{}\
         <p style=\"color:#7b8794;font-size:12px\">Bottle Pickup</p></div></body></html>",
        escape_html(heading),
        body
    )
}

fn rows(pairs: &[(&str, &str)]) -> String {
    let cells: String = pairs
        .iter()
        .map(|(label, value)| {
            format!(
                "<tr><td><strong>{}</strong></td><td>{}</td></tr>",
                escape_html(label),
                escape_html(value)
            )
        })
        .collect();
    format!("<table>{}</table>", cells)
}

/// Alert to the operator address about a new vendor or driver registration.
///
/// The subject carries the role in upper case, e.g. `New DRIVER Signup: Jane`.
pub fn signup_alert(operator_email: &str, profile: &UserProfile) -> EmailTemplate {
    let role = profile.role().as_str().to_uppercase();
    let phone = profile.phone.as_deref().unwrap_or("Not provided");

    let mut details: Vec<(&str, &str)> = vec![
        ("Name", profile.display_name.as_str()),
        ("Email", profile.email.as_str()),
        ("Phone", phone),
    ];
    match &profile.role {
        RoleProfile::Vendor {
            business_name,
            business_category,
            business_location,
            ..
        } => {
            details.push(("Business", business_name.as_str()));
            details.push(("Category", business_category.as_str()));
            details.push(("Location", business_location.as_str()));
        }
        RoleProfile::Driver { vehicle_info, .. } => {
            details.push(("Vehicle", vehicle_info.as_str()));
        }
        RoleProfile::Admin => {}
    }
    details.push(("Registered", profile.created_at.as_str()));

    let body = format!(
        "<p>A new {} account is waiting for approval.</p>{}\
         <p>Review it from the admin dashboard.</p>",
        escape_html(&profile.role().as_str().to_lowercase()),
        rows(&details)
    );

    EmailTemplate {
        to: operator_email.to_string(),
        subject: format!("New {} Signup: {}", role, profile.display_name),
        html: layout(&format!("New {} Signup", role), &body),
    }
}

/// Account-approved notice to a driver.
pub fn driver_approved(driver: &UserProfile) -> EmailTemplate {
    let body = format!(
        "<p>Hi {},</p><p>Your driver account has been approved. \
         You can now sign in and start accepting pickups.</p>",
        escape_html(&driver.display_name)
    );
    EmailTemplate {
        to: driver.email.clone(),
        subject: "Your driver account has been approved".to_string(),
        html: layout("Welcome aboard!", &body),
    }
}

/// Pickup-completed receipt for a vendor.
pub fn pickup_completed(
    to: &str,
    vendor_name: &str,
    driver_name: &str,
    address: &str,
    bottle_count: u32,
) -> EmailTemplate {
    let bottles = bottle_count.to_string();
    let body = format!(
        "<p>Hi {},</p><p>Your pickup has been completed.</p>{}",
        escape_html(vendor_name),
        rows(&[
            ("Driver", driver_name),
            ("Address", address),
            ("Bottles", bottles.as_str()),
        ])
    );
    EmailTemplate {
        to: to.to_string(),
        subject: "Pickup Completed".to_string(),
        html: layout("Pickup Completed", &body),
    }
}
