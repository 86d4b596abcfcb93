use serde::Serialize;

use shelfwatch_core::{ExtractedFields, ExtractionResult};

/// A field absent in at least this fraction of rows marks the batch broken.
const CRITICAL_EMPTINESS: f64 = 0.5;
/// A field absent in at least this fraction of rows is worth a look.
const WARNING_EMPTINESS: f64 = 0.2;
/// How many error excerpts a summary carries at most, newest last.
const MAX_ERROR_EXCERPTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warning,
    Critical,
}

/// Whether the packaged artifacts reached the remote store. A batch with
/// nothing to deliver is skipped, which is not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOutcome {
    Delivered,
    Skipped,
    Failed,
}

/// Absence count for one extractable field across the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldEmptiness {
    pub field: &'static str,
    pub absent: usize,
    pub ratio: f64,
}

/// What one worker invocation produced, in the shape the webhook receives.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub site: String,
    pub run_id: i64,
    pub processed: usize,
    pub succeeded: usize,
    pub aborted: usize,
    pub emptiness: Vec<FieldEmptiness>,
    pub delivery: DeliveryOutcome,
    pub severity: Severity,
    pub errors: Vec<String>,
}

impl BatchSummary {
    /// Grade a finished batch. `errors` may hold every excerpt collected
    /// during the run; only the last [`MAX_ERROR_EXCERPTS`] survive.
    #[must_use]
    pub fn from_results(
        site: &str,
        run_id: i64,
        results: &[ExtractionResult],
        delivery: DeliveryOutcome,
        mut errors: Vec<String>,
    ) -> Self {
        let processed = results.len();
        let aborted = results.iter().filter(|r| r.is_aborted()).count();
        let emptiness = field_emptiness(results);
        let severity = grade(processed, aborted, &emptiness, delivery);
        let keep_from = errors.len().saturating_sub(MAX_ERROR_EXCERPTS);
        let errors = errors.split_off(keep_from);
        Self {
            site: site.to_owned(),
            run_id,
            processed,
            succeeded: processed - aborted,
            aborted,
            emptiness,
            delivery,
            severity,
            errors,
        }
    }
}

/// Absence ratio per extractable field. An empty batch reports 0.0 for
/// every field; the nothing-processed case is graded separately.
#[allow(clippy::cast_precision_loss)]
fn field_emptiness(results: &[ExtractionResult]) -> Vec<FieldEmptiness> {
    ExtractedFields::default()
        .absence_flags()
        .into_iter()
        .enumerate()
        .map(|(slot, (field, _))| {
            let absent = results
                .iter()
                .filter(|r| r.fields.absence_flags()[slot].1)
                .count();
            let ratio = if results.is_empty() {
                0.0
            } else {
                absent as f64 / results.len() as f64
            };
            FieldEmptiness {
                field,
                absent,
                ratio,
            }
        })
        .collect()
}

fn grade(
    processed: usize,
    aborted: usize,
    emptiness: &[FieldEmptiness],
    delivery: DeliveryOutcome,
) -> Severity {
    let worst_ratio = emptiness.iter().map(|f| f.ratio).fold(0.0, f64::max);
    if delivery == DeliveryOutcome::Failed || aborted > 0 || worst_ratio >= CRITICAL_EMPTINESS {
        return Severity::Critical;
    }
    if processed == 0 || worst_ratio >= WARNING_EMPTINESS {
        return Severity::Warning;
    }
    Severity::Ok
}
