//! Y/N/All/Quit confirmation protocol shared by every resource kind

use crate::context::Prompt;
use anyhow::Result;

/// Default answer offered at every prompt
pub const DEFAULT_ANSWER: &str = "N";

/// An operator answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    All,
    Quit,
}

impl Answer {
    /// Parse an answer, case-insensitively.
    ///
    /// Empty or unrecognized input is `No`.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_uppercase().as_str() {
            "Y" => Self::Yes,
            "A" => Self::All,
            "Q" => Self::Quit,
            _ => Self::No,
        }
    }
}

/// Where the protocol stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionState {
    /// Prompt for each candidate
    Asking,
    /// Approve the rest without prompting
    AllMode,
    /// Stop visiting candidates
    Aborted,
}

/// What happens to one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Skip,
    /// The operator quit; this candidate and the rest are never visited
    Stop,
}

/// The protocol state machine
#[derive(Debug)]
pub struct Decision {
    state: DecisionState,
}

impl Decision {
    pub fn new() -> Self {
        Self {
            state: DecisionState::Asking,
        }
    }

    pub fn state(&self) -> DecisionState {
        self.state
    }

    /// Decide the next candidate, prompting only in `Asking`
    pub fn decide(&mut self, prompt: &mut dyn Prompt, question: &str) -> Result<Verdict> {
        match self.state {
            DecisionState::Aborted => Ok(Verdict::Stop),
            DecisionState::AllMode => Ok(Verdict::Approve),
            DecisionState::Asking => {
                let answer = Answer::parse(&prompt.ask(question, DEFAULT_ANSWER)?);
                Ok(self.apply(answer))
            }
        }
    }

    fn apply(&mut self, answer: Answer) -> Verdict {
        match answer {
            Answer::Yes => Verdict::Approve,
            Answer::No => Verdict::Skip,
            Answer::All => {
                self.state = DecisionState::AllMode;
                Verdict::Approve
            }
            Answer::Quit => {
                self.state = DecisionState::Aborted;
                Verdict::Stop
            }
        }
    }
}

impl Default for Decision {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the protocol over `candidates`, returning the approved ones in order
pub fn resolve<C, Q>(candidates: Vec<C>, prompt: &mut dyn Prompt, question: Q) -> Result<Vec<C>>
where
    Q: Fn(&C) -> String,
{
    resolve_with(candidates, prompt, question, |_, _| {})
}

/// Like [`resolve`], reporting every verdict to `on_verdict`.
///
/// `Stop` is reported once, for the candidate at which the operator quit.
pub fn resolve_with<C, Q, V>(
    candidates: Vec<C>,
    prompt: &mut dyn Prompt,
    question: Q,
    mut on_verdict: V,
) -> Result<Vec<C>>
where
    Q: Fn(&C) -> String,
    V: FnMut(&C, Verdict),
{
    let mut decision = Decision::new();
    let mut approved = Vec::new();

    for candidate in candidates {
        let verdict = decision.decide(prompt, &question(&candidate))?;
        on_verdict(&candidate, verdict);
        match verdict {
            Verdict::Approve => approved.push(candidate),
            Verdict::Skip => {}
            Verdict::Stop => break,
        }
    }

    Ok(approved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ScriptedPrompt;

    fn run(answers: &[&str], count: usize) -> (Vec<usize>, ScriptedPrompt) {
        let mut prompt = ScriptedPrompt::new(answers.iter().copied());
        let approved = resolve((1..=count).collect(), &mut prompt, |n| format!("item {n}?")).unwrap();
        (approved, prompt)
    }

    #[test]
    fn test_answer_parse() {
        assert_eq!(Answer::parse("y"), Answer::Yes);
        assert_eq!(Answer::parse(" Y "), Answer::Yes);
        assert_eq!(Answer::parse("a"), Answer::All);
        assert_eq!(Answer::parse("q"), Answer::Quit);
        assert_eq!(Answer::parse("n"), Answer::No);
        assert_eq!(Answer::parse(""), Answer::No);
        assert_eq!(Answer::parse("yes please"), Answer::No);
    }

    #[test]
    fn test_yes_then_all_approves_everything() {
        let (approved, prompt) = run(&["Y", "A"], 3);
        assert_eq!(approved, vec![1, 2, 3]);
        // the third candidate is auto-approved
        assert_eq!(prompt.asked.len(), 2);
    }

    #[test]
    fn test_quit_halts_before_next_candidate() {
        let (approved, prompt) = run(&["Y", "Q"], 3);
        assert_eq!(approved, vec![1]);
        assert_eq!(prompt.asked, vec!["item 1?", "item 2?"]);
    }

    #[test]
    fn test_quit_first_approves_nothing() {
        let (approved, _) = run(&["q"], 3);
        assert!(approved.is_empty());
    }

    #[test]
    fn test_default_is_no() {
        let (approved, prompt) = run(&[], 2);
        assert!(approved.is_empty());
        assert_eq!(prompt.asked.len(), 2);
    }

    #[test]
    fn test_mixed_answers() {
        let (approved, _) = run(&["n", "y", "garbage", "Y"], 4);
        assert_eq!(approved, vec![2, 4]);
    }

    #[test]
    fn test_state_transitions() {
        let mut prompt = ScriptedPrompt::new(["A"]);
        let mut decision = Decision::new();
        assert_eq!(decision.state(), DecisionState::Asking);

        assert_eq!(decision.decide(&mut prompt, "?").unwrap(), Verdict::Approve);
        assert_eq!(decision.state(), DecisionState::AllMode);
        assert_eq!(decision.decide(&mut prompt, "?").unwrap(), Verdict::Approve);
        assert_eq!(prompt.asked.len(), 1);
    }

    #[test]
    fn test_verdicts_reported() {
        let mut prompt = ScriptedPrompt::new(["n", "q"]);
        let mut seen = Vec::new();
        let approved = resolve_with(
            vec!["a", "b", "c"],
            &mut prompt,
            |c| (*c).to_string(),
            |c, v| seen.push((*c, v)),
        )
        .unwrap();

        assert!(approved.is_empty());
        assert_eq!(seen, vec![("a", Verdict::Skip), ("b", Verdict::Stop)]);
    }
}
