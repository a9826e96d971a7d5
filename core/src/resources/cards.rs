//! Fuel cards (`/tarjetas-combustible`) and their monthly consumption
//! reports.
//!
//! Convention: envelope; the PDF export uses the document convention.

use serde::Serialize;

use crate::client::ApiClient;
use crate::document::DocumentResult;
use crate::envelope::{Envelope, Operation};
use crate::http::HttpMethod;
use crate::resource::{Id, Pagination, Record, Resource, ResourceDef};
use crate::resources::ReportPeriod;

pub const CARDS: ResourceDef = ResourceDef::new("/tarjetas-combustible", "fuel card", "fuel cards");

const CONSUMPTION_REPORT: &str = "reportes/consumo-mes";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CardFilter {
    #[serde(flatten)]
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chofer_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_combustible_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activa: Option<bool>,
}

pub struct Cards<'a> {
    resource: Resource<'a>,
}

impl ApiClient {
    pub fn cards(&self) -> Cards<'_> {
        Cards {
            resource: Resource::new(self, CARDS),
        }
    }
}

impl Cards<'_> {
    pub fn list(&self, filter: &CardFilter) -> Envelope<Vec<Record>> {
        self.resource.list(filter).envelope()
    }

    /// Every card, unpaginated, for selectors.
    pub fn all(&self) -> Envelope<Vec<Record>> {
        self.resource.all().envelope()
    }

    pub fn get(&self, id: Id) -> Envelope<Record> {
        self.resource.get(id).envelope()
    }

    pub fn create<B: Serialize + ?Sized>(&self, card: &B) -> Envelope<Record> {
        self.resource.create(card).envelope()
    }

    pub fn update<B: Serialize + ?Sized>(&self, id: Id, card: &B) -> Envelope<Record> {
        self.resource.update(id, card).envelope()
    }

    pub fn delete(&self, id: Id) -> Envelope<Record> {
        self.resource.delete(id).envelope()
    }

    /// Monthly consumption per card, as JSON.
    pub fn consumption_report(&self, period: ReportPeriod) -> Envelope<Record> {
        self.resource
            .at(
                HttpMethod::Get,
                CONSUMPTION_REPORT,
                Operation::new(
                    "An error occurred while generating the report",
                    CARDS.not_found(),
                ),
            )
            .query(&period)
            .envelope()
    }

    /// Monthly consumption as a PDF, optionally for a single card.
    pub fn export_consumption_pdf(
        &self,
        period: ReportPeriod,
        card_id: Option<Id>,
    ) -> DocumentResult {
        self.resource
            .at(
                HttpMethod::Get,
                CONSUMPTION_REPORT,
                Operation::new(
                    "An error occurred while generating the PDF",
                    CARDS.not_found(),
                ),
            )
            .query(&period.for_card(card_id))
            .document()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{accepting, client_with, ScriptedTransport};

    #[test]
    fn active_flag_is_sent_as_bool_text() {
        let transport = accepting();
        let client = client_with(transport.clone());
        let _ = client.cards().list(&CardFilter {
            activa: Some(true),
            ..CardFilter::default()
        });
        assert_eq!(
            transport.last_request().query,
            vec![("activa".to_string(), "true".to_string())]
        );
    }

    #[test]
    fn consumption_report_returns_json_data() {
        let transport = ScriptedTransport::replying(
            200,
            json!({"success": true, "data": {"year": 2024, "month": 6, "cards": []}}),
        );
        let client = client_with(transport.clone());
        let env = client.cards().consumption_report(ReportPeriod::new(2024, 6));
        assert!(env.success);
        assert_eq!(env.data.unwrap()["month"], 6);

        let sent = transport.last_request();
        assert_eq!(sent.path, "http://fleet.test/api/tarjetas-combustible/reportes/consumo-mes");
        assert_eq!(sent.header("accept"), Some("application/json"));
        assert!(sent.query_value("tarjeta_id").is_none());
    }

    #[test]
    fn pdf_export_reports_json_error() {
        let client = client_with(ScriptedTransport::replying(
            422,
            json!({"message": "The month field must be between 1 and 12."}),
        ));
        let result = client.cards().export_consumption_pdf(ReportPeriod::new(2024, 13), None);
        assert!(!result.success);
        assert!(result.file.is_none());
        assert_eq!(result.message, "The month field must be between 1 and 12.");
    }
}
