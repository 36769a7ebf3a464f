use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread;

use anyhow::Result;
use log::{error, info, warn};
use serde_json::{Value, json};

use crate::assessment::AlertRecord;
use crate::config::constants;

/// Embed sidebar colour for critical maintenance alerts.
const CRITICAL_COLOR: u32 = 0xFF0000;

/// Discord alert service forwarding critical maintenance alerts.
///
/// Delivery is best-effort: the HTTP response to the caller never waits on
/// or depends on the webhook.
#[derive(Debug, Clone)]
pub struct AlertService {
    webhook_url: String,
}

impl AlertService {
    /// Create a new AlertService with the provided Discord webhook URL.
    ///
    /// # Arguments
    ///
    /// * `webhook_url` - A valid Discord webhook URL
    pub fn new(webhook_url: String) -> Self {
        Self { webhook_url }
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    /// Build the Discord embed payload for a maintenance alert.
    ///
    /// The description carries the alert message followed by the material
    /// and, when present, the maintenance checklist as a bullet list.
    pub fn embed_for(alert: &AlertRecord, material: &str) -> Value {
        let mut description = format!("{}\n\n**Material:** {}", alert.message, material);
        if let Some(items) = &alert.maintenance_items {
            description.push_str("\n\n**Maintenance checklist:**");
            for item in items {
                description.push_str("\n• ");
                description.push_str(item);
            }
        }

        json!({
            "embeds": [{
                "title": format!("🚨 {}: {}", alert.component, alert.message),
                "description": description,
                "color": CRITICAL_COLOR,
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "footer": {
                    "text": constants::SERVICE_NAME
                }
            }]
        })
    }

    /// Send a single alert to the webhook.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HTTP request fails
    /// - The Discord API returns an error status
    pub fn send_alert(&self, alert: &AlertRecord, material: &str) -> Result<()> {
        let embed = Self::embed_for(alert, material);

        let client = reqwest::blocking::Client::new();
        let response = client
            .post(&self.webhook_url)
            .header("Content-Type", "application/json")
            .json(&embed)
            .send()?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Failed to send Discord alert: HTTP {}",
                response.status()
            ));
        }

        Ok(())
    }

    /// Forward every critical alert, logging failures instead of returning them.
    ///
    /// Returns the number of alerts delivered.
    pub fn forward_critical(&self, alerts: &[AlertRecord], material: &str) -> usize {
        let mut delivered = 0;
        for alert in alerts.iter().filter(|alert| alert.is_critical()) {
            match self.send_alert(alert, material) {
                Ok(()) => {
                    delivered += 1;
                    info!("Forwarded '{}' alert to Discord", alert.message);
                }
                Err(e) => {
                    error!("Failed to forward '{}' alert: {}", alert.message, e);
                }
            }
        }
        delivered
    }
}

/// Critical alerts of one assessment awaiting delivery.
struct Delivery {
    alerts: Vec<AlertRecord>,
    material: String,
}

/// Bounded queue in front of a single delivery thread.
///
/// Enqueueing never blocks; when the queue is full the alerts are dropped
/// with a warning. The worker exits once the queue is dropped.
pub struct AlertQueue {
    sender: SyncSender<Delivery>,
}

impl AlertQueue {
    /// Start the delivery thread for `service`.
    pub fn spawn(service: AlertService, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::sync_channel::<Delivery>(capacity);
        thread::spawn(move || {
            for delivery in receiver {
                service.forward_critical(&delivery.alerts, &delivery.material);
            }
        });
        Self { sender }
    }

    /// Queue the critical alerts among `alerts`.
    ///
    /// Returns `true` if a delivery was queued.
    pub fn enqueue(&self, alerts: &[AlertRecord], material: &str) -> bool {
        let critical: Vec<AlertRecord> = alerts
            .iter()
            .filter(|alert| alert.is_critical())
            .cloned()
            .collect();
        if critical.is_empty() {
            return false;
        }

        let delivery = Delivery {
            alerts: critical,
            material: material.to_string(),
        };
        match self.sender.try_send(delivery) {
            Ok(()) => true,
            Err(TrySendError::Full(delivery)) => {
                warn!(
                    "Alert queue full, dropping {} alert(s) for {}",
                    delivery.alerts.len(),
                    delivery.material
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                error!("Alert delivery thread has stopped");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{AlertType, Priority};
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    fn alert(alert_type: AlertType) -> AlertRecord {
        AlertRecord {
            alert_type,
            message: "High wear conditions detected".to_string(),
            component: "Nozzle".to_string(),
            priority: Priority::Critical,
            maintenance_items: None,
        }
    }

    #[test]
    fn test_queue_skips_jobs_without_critical_alerts() {
        let service = AlertService::new("http://127.0.0.1:9/webhook".to_string());
        let queue = AlertQueue::spawn(service, 4);
        assert!(!queue.enqueue(&[], "PLA"));
        assert!(!queue.enqueue(&[alert(AlertType::Warning)], "PLA"));
    }

    #[test]
    fn test_queued_alert_reaches_webhook() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/webhook", listener.local_addr().unwrap());
        let queue = AlertQueue::spawn(AlertService::new(url), 4);

        assert!(queue.enqueue(&[alert(AlertType::Warning), alert(AlertType::Critical)], "PLA"));

        let (stream, _) = listener.accept().unwrap();
        let mut request_line = String::new();
        BufReader::new(stream).read_line(&mut request_line).unwrap();
        assert!(request_line.starts_with("POST /webhook "), "{request_line}");
    }
}
