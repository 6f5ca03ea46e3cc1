/// Outcome of a single row in a scheduled batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Every step for the row completed.
    Succeeded,
    /// The row's state advanced but a delivery step failed; the reason says
    /// which one.
    Partial(String),
    /// The row turned out not to qualify once examined.
    Skipped(String),
    /// The row failed before its state advanced; safe to retry next run.
    Failed(String),
}

/// Per-row ledger for one batch run. Failures never abort the batch, so the
/// report is how a run communicates what actually happened.
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<(i64, RowOutcome)>,
}

impl BatchReport {
    pub fn record(&mut self, row_id: i64, outcome: RowOutcome) {
        self.outcomes.push((row_id, outcome));
    }

    /// Rows whose state advanced: fully succeeded plus partials.
    pub fn processed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, RowOutcome::Succeeded | RowOutcome::Partial(_)))
            .count()
    }

    pub fn succeeded(&self) -> usize {
        self.count_matching(|o| matches!(o, RowOutcome::Succeeded))
    }

    pub fn partial(&self) -> usize {
        self.count_matching(|o| matches!(o, RowOutcome::Partial(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count_matching(|o| matches!(o, RowOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count_matching(|o| matches!(o, RowOutcome::Failed(_)))
    }

    pub fn outcomes(&self) -> &[(i64, RowOutcome)] {
        &self.outcomes
    }

    pub fn outcome_for(&self, row_id: i64) -> Option<&RowOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| *id == row_id)
            .map(|(_, outcome)| outcome)
    }

    fn count_matching(&self, predicate: impl Fn(&RowOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| predicate(o)).count()
    }
}
