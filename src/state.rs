//! Explicit widget state machine.
//!
//! The browser original encoded these states implicitly through visibility
//! toggles and button disablement; here every transition is guarded.

use log::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WidgetState {
    /// No file selected; the drop zone is showing.
    #[default]
    Empty,
    /// A preview is showing with the crop rectangle at full bounds.
    PreviewingWholeImage,
    /// A preview is showing with an adjusted crop rectangle.
    PreviewingWithCrop,
    /// One submission is in flight; the submit control is disabled.
    Submitting,
}

impl WidgetState {
    /// A new selection may replace the current one at any time except while
    /// a submission is in flight.
    pub fn can_accept_file(self) -> bool {
        !matches!(self, WidgetState::Submitting)
    }

    pub fn can_submit(self) -> bool {
        matches!(
            self,
            WidgetState::PreviewingWholeImage | WidgetState::PreviewingWithCrop
        )
    }

    pub fn has_preview(self) -> bool {
        !matches!(self, WidgetState::Empty)
    }

    pub fn is_submitting(self) -> bool {
        matches!(self, WidgetState::Submitting)
    }

    /// Applies a transition if it is legal; illegal ones are logged and
    /// leave the state unchanged.
    pub fn transition(&mut self, next: WidgetState) -> bool {
        if Self::allowed(*self, next) {
            *self = next;
            true
        } else {
            warn!("illegal widget transition {:?} -> {:?}", self, next);
            false
        }
    }

    fn allowed(from: WidgetState, to: WidgetState) -> bool {
        use WidgetState::*;
        match (from, to) {
            // Identity transitions are harmless (e.g. replacing a selection).
            (a, b) if a == b => true,
            (Empty, PreviewingWholeImage) => true,
            (PreviewingWholeImage, PreviewingWithCrop) => true,
            (PreviewingWithCrop, PreviewingWholeImage) => true,
            (PreviewingWholeImage | PreviewingWithCrop, Submitting) => true,
            // Success resets; failure returns to the pre-submission preview.
            (Submitting, Empty) => true,
            (Submitting, PreviewingWholeImage | PreviewingWithCrop) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WidgetState::*;

    #[test]
    fn accepted_file_enters_preview() {
        let mut state = Empty;
        assert!(state.transition(PreviewingWholeImage));
        assert!(state.can_submit());
    }

    #[test]
    fn crop_adjustment_toggles_between_preview_states() {
        let mut state = PreviewingWholeImage;
        assert!(state.transition(PreviewingWithCrop));
        assert!(state.transition(PreviewingWholeImage));
    }

    #[test]
    fn empty_cannot_submit() {
        let mut state = Empty;
        assert!(!state.can_submit());
        assert!(!state.transition(Submitting));
        assert_eq!(state, Empty);
    }

    #[test]
    fn submitting_blocks_new_selection_and_resubmission() {
        let state = Submitting;
        assert!(!state.can_accept_file());
        assert!(!state.can_submit());
    }

    #[test]
    fn success_resets_and_failure_restores_preview() {
        let mut state = Submitting;
        assert!(state.transition(Empty));

        let mut state = Submitting;
        assert!(state.transition(PreviewingWithCrop));
    }

    #[test]
    fn cannot_skip_from_empty_to_submitting_state() {
        let mut state = Empty;
        assert!(!state.transition(PreviewingWithCrop));
        assert!(!state.transition(Submitting));
    }
}
