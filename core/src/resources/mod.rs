//! One module per backend path family. Each adds an accessor to `ApiClient`
//! (`client.vehicles()`, `client.cards()`, ...) returning a thin wrapper over
//! `Resource` that fixes the calling convention per operation.

use serde::Serialize;

use crate::resource::Id;

pub mod auth;
pub mod cards;
pub mod categories;
pub mod charges;
pub mod companies;
pub mod drivers;
pub mod fuel_types;
pub mod products;
pub mod users;
pub mod vehicles;
pub mod withdrawals;

/// Month a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportPeriod {
    pub year: i32,
    pub month: u32,
}

impl ReportPeriod {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub(crate) fn for_card(self, card_id: Option<Id>) -> CardReportQuery {
        CardReportQuery {
            period: self,
            tarjeta_id: card_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CardReportQuery {
    #[serde(flatten)]
    period: ReportPeriod,
    #[serde(skip_serializing_if = "Option::is_none")]
    tarjeta_id: Option<Id>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn card_is_optional_in_report_query() {
        let period = ReportPeriod::new(2024, 6);
        assert_eq!(
            serde_json::to_value(period.for_card(None)).unwrap(),
            json!({"year": 2024, "month": 6})
        );
        assert_eq!(
            serde_json::to_value(period.for_card(Some(3))).unwrap(),
            json!({"year": 2024, "month": 6, "tarjeta_id": 3})
        );
    }
}
