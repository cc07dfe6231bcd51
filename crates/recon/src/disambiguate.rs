use crate::model::Code;

/// What extraction alone can decide about a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disambiguation {
    /// Zero candidates.
    NoCodeFound,
    /// Exactly one candidate, picked without asking anyone.
    Selected(Code),
    /// Two or more candidates; only the operator may pick.
    Ambiguous(Vec<Code>),
}

/// Classify the candidate list. Ambiguity is never resolved heuristically.
pub fn disambiguate(mut candidates: Vec<Code>) -> Disambiguation {
    match candidates.len() {
        0 => Disambiguation::NoCodeFound,
        1 => Disambiguation::Selected(candidates.remove(0)),
        _ => Disambiguation::Ambiguous(candidates),
    }
}

/// The operator's answer at the selection prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Selected(Code),
    /// "None of these": keep the capture, drop the code.
    Declined,
    /// Abort the whole capture.
    Cancelled,
}

/// Human-in-the-loop boundary of the capture pipeline.
///
/// Each call blocks the current capture until the operator answers.
pub trait Operator {
    /// Pick one of `candidates`, decline all of them, or cancel.
    fn select(&mut self, candidates: &[Code]) -> Selection;

    /// Confirm saving a record that carries no code.
    fn confirm_codeless(&mut self, raw_text: &str) -> bool;
}

impl<O: Operator + ?Sized> Operator for &mut O {
    fn select(&mut self, candidates: &[Code]) -> Selection {
        (**self).select(candidates)
    }

    fn confirm_codeless(&mut self, raw_text: &str) -> bool {
        (**self).confirm_codeless(raw_text)
    }
}

/// Pre-recorded answers, for non-interactive callers and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedOperator {
    pub choice: ScriptedChoice,
    pub confirm_codeless: bool,
    /// Number of times the selection prompt was shown.
    pub prompts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedChoice {
    /// Zero-based index into the candidate list.
    Pick(usize),
    Decline,
    Cancel,
}

impl ScriptedOperator {
    pub fn new(choice: ScriptedChoice) -> Self {
        Self { choice, confirm_codeless: false, prompts: 0 }
    }

    pub fn confirming_codeless(mut self, confirm: bool) -> Self {
        self.confirm_codeless = confirm;
        self
    }
}

impl Operator for ScriptedOperator {
    fn select(&mut self, candidates: &[Code]) -> Selection {
        self.prompts += 1;
        match self.choice {
            // An out-of-range pick behaves like closing the prompt.
            ScriptedChoice::Pick(i) => candidates
                .get(i)
                .cloned()
                .map(Selection::Selected)
                .unwrap_or(Selection::Cancelled),
            ScriptedChoice::Decline => Selection::Declined,
            ScriptedChoice::Cancel => Selection::Cancelled,
        }
    }

    fn confirm_codeless(&mut self, _raw_text: &str) -> bool {
        self.confirm_codeless
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_codes;

    #[test]
    fn zero_one_many() {
        assert_eq!(disambiguate(vec![]), Disambiguation::NoCodeFound);

        let one = extract_codes("2448AGNMV1B");
        assert_eq!(disambiguate(one.clone()), Disambiguation::Selected(one[0].clone()));

        let two = extract_codes("2448AGNMV1B 7293AGAMV");
        assert_eq!(disambiguate(two.clone()), Disambiguation::Ambiguous(two));
    }

    #[test]
    fn scripted_operator_picks_by_index() {
        let codes = extract_codes("2448AGNMV1B 7293AGAMV");
        let mut op = ScriptedOperator::new(ScriptedChoice::Pick(1));
        assert_eq!(op.select(&codes), Selection::Selected(codes[1].clone()));
        assert_eq!(op.prompts, 1);
    }

    #[test]
    fn scripted_operator_out_of_range_cancels() {
        let codes = extract_codes("2448AGNMV1B 7293AGAMV");
        let mut op = ScriptedOperator::new(ScriptedChoice::Pick(5));
        assert_eq!(op.select(&codes), Selection::Cancelled);
    }
}
