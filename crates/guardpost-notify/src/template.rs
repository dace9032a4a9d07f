//! Alert message rendering
//!
//! Builds the guardian-facing notification from a fixed French template:
//! subject line, plain-text body, and an HTML alternative with the device
//! fields laid out as labeled rows.

use chrono::{DateTime, Utc};

use guardpost_core::DeviceReport;

use crate::AlertNotification;

/// Notification subject line
pub const SUBJECT: &str = "⚠️ Alerte de contrôle parental - Contenu inapproprié détecté";

/// Placeholder for fields the device report did not include
const MISSING: &str = "-";

/// Display cap for long string fields (user agent)
const MAX_FIELD_CHARS: usize = 50;

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background: #f0f0f5; padding: 20px; }
        .container { background-color: white; padding: 30px; border-radius: 10px; max-width: 700px; margin: 0 auto; }
        .header { background: linear-gradient(135deg, #d9534f 0%, #c9302c 100%); color: white; padding: 25px; border-radius: 8px; margin-bottom: 25px; text-align: center; }
        .section-title { font-weight: bold; color: #d9534f; font-size: 16px; margin-bottom: 10px; border-bottom: 2px solid #d9534f; padding-bottom: 8px; }
        .info-box { background-color: #f5f5f5; padding: 15px; border-left: 4px solid #d9534f; margin: 10px 0; border-radius: 4px; }
        .info-row { display: flex; justify-content: space-between; padding: 8px 0; border-bottom: 1px solid #e0e0e0; }
        .info-label { font-weight: 600; color: #555; }
        .info-value { color: #333; word-break: break-all; text-align: right; }
        .alert-box { background-color: #fff3cd; border: 1px solid #ffc107; color: #856404; padding: 15px; border-radius: 4px; margin: 15px 0; }
        .footer { color: #999; font-size: 12px; border-top: 1px solid #ddd; padding-top: 20px; margin-top: 25px; text-align: center; }
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>⚠️ Alerte de Contrôle Parental</h1>
            <p>Contenu inapproprié détecté</p>
        </div>
        <p>Bonjour,</p>
        <p>Notre système de contrôle parental a détecté du contenu potentiellement inapproprié lors de l'utilisation du navigateur de votre enfant.</p>
        <div class="section-title">📍 Information du Site</div>
        <div class="info-box">
            <div class="info-row">
                <span class="info-label">URL détectée:</span>
                <span class="info-value">%URL%</span>
            </div>
        </div>
        <div class="section-title">💻 Information de l'Appareil</div>
        <div class="info-box">
%DEVICE_ROWS%
        </div>
        <div class="alert-box">
            <strong>⚠️ Conseil:</strong> Nous vous recommandons de vérifier l'activité en ligne de votre enfant et de discuter des contenus appropriés.
        </div>
        <div class="footer">
            <p>Ce message a été généré automatiquement par le système de contrôle parental.</p>
            <p>Heure de détection: %TIMESTAMP%</p>
        </div>
    </div>
</body>
</html>
"#;

/// Render the HTML body for an alert
pub fn render_html(alert: &AlertNotification) -> String {
    HTML_TEMPLATE
        .replace("%URL%", &escape_html(&alert.url))
        .replace("%DEVICE_ROWS%", &device_rows_html(&alert.device))
        .replace("%TIMESTAMP%", &human_timestamp(alert.detected_at))
}

/// Render the plain-text alternative for an alert
pub fn render_text(alert: &AlertNotification) -> String {
    let device = &alert.device;
    format!(
        "Alerte de Contrôle Parental\n\
         ==========================\n\
         \n\
         Contenu inapproprié détecté lors de l'utilisation du navigateur de votre enfant.\n\
         \n\
         URL détectée: {}\n\
         \n\
         Information de l'Appareil:\n\
         - IP Publique: {}\n\
         - Navigateur: {}\n\
         - Système: {}\n\
         - Langue: {}\n\
         - Résolution: {}\n\
         - Fuseau Horaire: {}\n\
         - Connecté: {}\n\
         \n\
         Heure de Détection: {}\n\
         \n\
         Nous vous recommandons de vérifier l'activité en ligne et de discuter avec votre enfant.\n",
        alert.url,
        field_or_missing(device.public_ip.as_deref()),
        clipped(field_or_missing(device.user_agent.as_deref())),
        field_or_missing(device.platform.as_deref()),
        field_or_missing(device.language.as_deref()),
        resolution_or_missing(device),
        field_or_missing(device.timezone.as_deref()),
        online_glyph(device.on_line),
        human_timestamp(alert.detected_at),
    )
}

/// Device fields as HTML info rows, in a fixed label order
fn device_rows_html(device: &DeviceReport) -> String {
    let rows = [
        (
            "Adresse IP Publique",
            field_or_missing(device.public_ip.as_deref()).to_string(),
        ),
        (
            "Navigateur",
            clipped(field_or_missing(device.user_agent.as_deref())),
        ),
        (
            "Système d'Exploitation",
            field_or_missing(device.platform.as_deref()).to_string(),
        ),
        (
            "Langue",
            field_or_missing(device.language.as_deref()).to_string(),
        ),
        ("Résolution Écran", resolution_or_missing(device)),
        (
            "Fuseau Horaire",
            field_or_missing(device.timezone.as_deref()).to_string(),
        ),
        ("Connecté", online_glyph(device.on_line).to_string()),
    ];

    rows.iter()
        .map(|(label, value)| {
            format!(
                "            <div class=\"info-row\">\
                 <span class=\"info-label\">{}:</span>\
                 <span class=\"info-value\">{}</span>\
                 </div>\n",
                label,
                escape_html(value)
            )
        })
        .collect()
}

fn field_or_missing(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => MISSING,
    }
}

fn resolution_or_missing(device: &DeviceReport) -> String {
    match (device.screen_width, device.screen_height) {
        (Some(w), Some(h)) => format!("{}x{}", w, h),
        _ => MISSING.to_string(),
    }
}

fn online_glyph(on_line: Option<bool>) -> &'static str {
    match on_line {
        Some(true) => "✅ Oui",
        Some(false) => "❌ Non",
        None => MISSING,
    }
}

/// Clip a long field for display, appending an ellipsis
fn clipped(value: &str) -> String {
    if value.chars().count() > MAX_FIELD_CHARS {
        let cut: String = value.chars().take(MAX_FIELD_CHARS).collect();
        format!("{}...", cut)
    } else {
        value.to_string()
    }
}

fn human_timestamp(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y à %H:%M:%S").to_string()
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn notification() -> AlertNotification {
        AlertNotification {
            url: "https://www.reddit.com/r/thread".to_string(),
            device: DeviceReport {
                public_ip: Some("203.0.113.7".to_string()),
                user_agent: Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)".to_string()),
                platform: Some("Win32".to_string()),
                language: Some("fr-FR".to_string()),
                screen_width: Some(1920),
                screen_height: Some(1080),
                timezone: Some("Europe/Paris".to_string()),
                on_line: Some(true),
                timestamp: None,
            },
            detected_at: Utc.with_ymd_and_hms(2026, 8, 6, 14, 30, 5).unwrap(),
        }
    }

    #[test]
    fn test_html_contains_url_and_timestamp() {
        let html = render_html(&notification());
        assert!(html.contains("https://www.reddit.com/r/thread"));
        assert!(html.contains("06/08/2026 à 14:30:05"));
    }

    #[test]
    fn test_online_renders_localized_glyphs() {
        let mut alert = notification();
        assert!(render_html(&alert).contains("✅ Oui"));

        alert.device.on_line = Some(false);
        assert!(render_html(&alert).contains("❌ Non"));

        alert.device.on_line = None;
        assert!(!render_html(&alert).contains("✅"));
    }

    #[test]
    fn test_long_user_agent_is_clipped() {
        let html = render_html(&notification());
        let row = html
            .lines()
            .find(|l| l.contains("Navigateur"))
            .expect("user agent row");
        assert!(row.contains("..."));
        assert!(!row.contains("KHTML"));
    }

    #[test]
    fn test_missing_fields_render_placeholder() {
        let alert = AlertNotification {
            url: "https://example.com".to_string(),
            device: DeviceReport::default(),
            detected_at: Utc.with_ymd_and_hms(2026, 8, 6, 14, 30, 5).unwrap(),
        };

        let html = render_html(&alert);
        let ip_row = html
            .lines()
            .find(|l| l.contains("Adresse IP Publique"))
            .expect("ip row");
        assert!(ip_row.contains(">-<"));
    }

    #[test]
    fn test_html_values_are_escaped() {
        let mut alert = notification();
        alert.url = "https://example.com/?q=<script>".to_string();

        let html = render_html(&alert);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_text_body_lists_device_fields() {
        let text = render_text(&notification());
        assert!(text.contains("IP Publique: 203.0.113.7"));
        assert!(text.contains("Résolution: 1920x1080"));
        assert!(text.contains("Connecté: ✅ Oui"));
    }
}
