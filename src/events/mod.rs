use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::notifications::{send_to_self, Mailer};

/// Sender half of the domain event channel
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Queues an event without waiting. A full or closed channel drops the
    /// event with a warning so request handling never blocks on delivery.
    pub fn send_or_log(&self, event: Event) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                counter!("sportfacility_events.dropped", 1);
                warn!("Event queue is full; dropping {:?}", event);
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!("Event channel closed; dropping {:?}", event);
            }
        }
    }
}

/// Things that happened to the facility directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    FacilityCreated {
        facility_id: Uuid,
        name: String,
        address: String,
        owner: String,
        type_name: String,
    },
    FacilityUpdated(Uuid),
    FacilityDeleted(Uuid),
    SpreadsheetImported {
        size_bytes: usize,
        rows: usize,
        imported: usize,
    },
    PhotoAttached {
        facility_id: Uuid,
        photo_id: Uuid,
    },
    PhotoDetached {
        facility_id: Uuid,
        photo_id: Uuid,
    },
}

/// Subject and body of the operator notification for an event, if it warrants one
pub fn notification_for(event: &Event) -> Option<(String, String)> {
    match event {
        Event::FacilityCreated {
            name,
            address,
            owner,
            type_name,
            ..
        } => Some((
            "Был создан новый спортивный объект".to_string(),
            format!(
                "На сайте был создан новый спортивный объект:\n\n\
                 Название - {name}\n\
                 Адрес - {address}\n\
                 Пользователь - {owner}\n\
                 Тип объекта - {type_name}"
            ),
        )),
        Event::SpreadsheetImported {
            size_bytes,
            rows,
            imported,
        } => Some((
            "Был загружен Excel документ".to_string(),
            format!(
                "На сайт был загружен Excel документ\n\n\
                 Размер файла - {:.3} KB\n\
                 {rows} спортивных объектов содержал документ\n\
                 {imported} из них было добавлено в базу данных",
                *size_bytes as f64 / 1000.0
            ),
        )),
        _ => None,
    }
}

/// Drains the event channel, mailing operator notifications as they arrive.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, mailer: Arc<dyn Mailer>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        debug!("Received event: {:?}", event);
        counter!("sportfacility_events.processed", 1);

        if let Some((subject, body)) = notification_for(&event) {
            if !send_to_self(mailer.as_ref(), &subject, &body).await {
                counter!("sportfacility_events.notification_failed", 1);
                warn!("Notification for {:?} was not delivered", event);
            }
        }
    }

    info!("Event channel closed; event processing stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::MockMailer;

    #[test]
    fn created_facility_notification_lists_details() {
        let (subject, body) = notification_for(&Event::FacilityCreated {
            facility_id: Uuid::new_v4(),
            name: "Pool A".into(),
            address: "1 Main St".into(),
            owner: "City".into(),
            type_name: "бассейны".into(),
        })
        .unwrap();

        assert_eq!(subject, "Был создан новый спортивный объект");
        assert!(body.contains("Название - Pool A"));
        assert!(body.contains("Тип объекта - бассейны"));
    }

    #[test]
    fn import_notification_reports_counts() {
        let (_, body) = notification_for(&Event::SpreadsheetImported {
            size_bytes: 2048,
            rows: 5,
            imported: 4,
        })
        .unwrap();
        assert!(body.contains("2.048 KB"));
        assert!(body.contains("5 спортивных объектов"));
        assert!(body.contains("4 из них"));
    }

    #[test]
    fn plain_updates_are_silent() {
        assert!(notification_for(&Event::FacilityUpdated(Uuid::new_v4())).is_none());
    }

    #[tokio::test]
    async fn full_queue_drops_events_without_waiting() {
        let (tx, mut rx) = mpsc::channel(1);
        let sender = EventSender::new(tx);

        sender.send_or_log(Event::FacilityUpdated(Uuid::nil()));
        sender.send_or_log(Event::FacilityDeleted(Uuid::nil()));
        drop(sender);

        assert_eq!(rx.recv().await, Some(Event::FacilityUpdated(Uuid::nil())));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn processor_mails_notifications_until_channel_closes() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_sender()
            .return_const(Some("ops@example.com".to_string()));
        mailer.expect_send().times(1).returning(|_, _, _| true);

        let (tx, rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        sender
            .send_or_log(Event::SpreadsheetImported {
                size_bytes: 10,
                rows: 1,
                imported: 1,
            });
        sender.send_or_log(Event::FacilityDeleted(Uuid::new_v4()));
        drop(sender);

        process_events(rx, Arc::new(mailer)).await;
    }
}
