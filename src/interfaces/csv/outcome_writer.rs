use crate::application::workflow::{Step, WorkflowSnapshot};
use crate::error::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Where one application ended up after the batch run.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ApplicationOutcome {
    pub row: usize,
    pub step: Step,
    pub quote_id: Option<String>,
    pub premium_amount: Option<Decimal>,
    pub policy_number: Option<String>,
    pub policy_id: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub message: Option<String>,
}

impl ApplicationOutcome {
    pub fn from_snapshot(row: usize, snapshot: &WorkflowSnapshot) -> Self {
        let quote = snapshot.stage.quote();
        let policy = snapshot.stage.policy();
        Self {
            row,
            step: snapshot.step(),
            quote_id: quote.map(|q| q.quote_id.clone()),
            premium_amount: policy
                .map(|p| p.premium_amount)
                .or_else(|| quote.map(|q| q.premium_amount)),
            policy_number: policy.map(|p| p.policy_number.clone()),
            policy_id: policy.map(|p| p.policy_id.clone()),
            effective_date: policy.map(|p| p.effective_date),
            message: snapshot.error.clone(),
        }
    }
}

/// Writes application outcomes as CSV with a header row.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_outcome(&mut self, outcome: &ApplicationOutcome) -> Result<()> {
        self.writer.serialize(outcome)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::workflow::Stage;
    use crate::domain::records::QuoteRecord;
    use rust_decimal_macros::dec;

    fn render(outcomes: &[ApplicationOutcome]) -> String {
        let mut buffer = Vec::new();
        {
            let mut writer = OutcomeWriter::new(&mut buffer);
            for outcome in outcomes {
                writer.write_outcome(outcome).unwrap();
            }
            writer.flush().unwrap();
        }
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_quoted_outcome_row() {
        let snapshot = WorkflowSnapshot {
            stage: Stage::Quoted {
                quote: QuoteRecord {
                    quote_id: "quote-0001".into(),
                    premium_amount: dec!(125.00),
                    coverage_details: serde_json::json!({}),
                    valid_until: None,
                },
            },
            error: Some("card declined".into()),
            ..Default::default()
        };
        let output = render(&[ApplicationOutcome::from_snapshot(1, &snapshot)]);

        assert!(output.starts_with(
            "row,step,quote_id,premium_amount,policy_number,policy_id,effective_date,message\n"
        ));
        assert!(output.contains("1,quoted,quote-0001,125.00,,,,card declined"));
    }

    #[test]
    fn test_collecting_info_outcome_row() {
        let snapshot = WorkflowSnapshot {
            error: Some("Please enter a valid email address".into()),
            ..Default::default()
        };
        let output = render(&[ApplicationOutcome::from_snapshot(2, &snapshot)]);
        assert!(output.contains("2,collecting_info,,,,,,Please enter a valid email address"));
    }
}
