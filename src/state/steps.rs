/// Wizard step definitions
///
/// Defines the ordered steps of the avatar generation wizard. The ordinal
/// value is the single source of truth for navigation: forward/backward
/// movement and reachability checks compare ordinals.

/// Wizard step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WizardStep {
    /// Select the subject photo, height, gender and race
    ImageInput,

    /// Review and correct extracted measurements
    Measurements,

    /// Inspect how closely the fitted mesh matches the targets
    AccuracyReview,

    /// Rig and appearance options
    Configure,

    /// Output directory, file name and export formats
    OutputSettings,

    /// Run generation and collect the results
    Generate,
}

impl WizardStep {
    /// Number of steps in the wizard
    pub const COUNT: usize = 6;

    /// Get step title
    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::ImageInput => "Image Input",
            WizardStep::Measurements => "Review Measurements",
            WizardStep::AccuracyReview => "Mesh Accuracy Review",
            WizardStep::Configure => "Configure Avatar",
            WizardStep::OutputSettings => "Output Settings",
            WizardStep::Generate => "Generate",
        }
    }

    /// Zero-based ordinal of this step
    pub fn index(&self) -> usize {
        match self {
            WizardStep::ImageInput => 0,
            WizardStep::Measurements => 1,
            WizardStep::AccuracyReview => 2,
            WizardStep::Configure => 3,
            WizardStep::OutputSettings => 4,
            WizardStep::Generate => 5,
        }
    }

    /// Step for a zero-based ordinal, if in range
    pub fn from_index(index: usize) -> Option<WizardStep> {
        match index {
            0 => Some(WizardStep::ImageInput),
            1 => Some(WizardStep::Measurements),
            2 => Some(WizardStep::AccuracyReview),
            3 => Some(WizardStep::Configure),
            4 => Some(WizardStep::OutputSettings),
            5 => Some(WizardStep::Generate),
            _ => None,
        }
    }

    /// Check if this is the first step
    pub fn is_first(&self) -> bool {
        matches!(self, WizardStep::ImageInput)
    }

    /// Check if this is the last step
    pub fn is_last(&self) -> bool {
        matches!(self, WizardStep::Generate)
    }

    /// Get next step
    pub fn next(&self) -> Option<WizardStep> {
        Self::from_index(self.index() + 1)
    }

    /// Get previous step
    pub fn previous(&self) -> Option<WizardStep> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// Get all steps in order
    pub fn all() -> [WizardStep; 6] {
        [
            WizardStep::ImageInput,
            WizardStep::Measurements,
            WizardStep::AccuracyReview,
            WizardStep::Configure,
            WizardStep::OutputSettings,
            WizardStep::Generate,
        ]
    }
}

impl Default for WizardStep {
    fn default() -> Self {
        WizardStep::ImageInput
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_navigation() {
        let step = WizardStep::ImageInput;
        assert!(step.is_first());
        assert!(!step.is_last());
        assert_eq!(step.next(), Some(WizardStep::Measurements));

        let last = WizardStep::Generate;
        assert!(last.is_last());
        assert!(last.next().is_none());
    }

    #[test]
    fn test_previous_navigation() {
        assert_eq!(
            WizardStep::Measurements.previous(),
            Some(WizardStep::ImageInput)
        );
        assert_eq!(WizardStep::ImageInput.previous(), None);
        assert_eq!(
            WizardStep::Generate.previous(),
            Some(WizardStep::OutputSettings)
        );
    }

    #[test]
    fn test_index_round_trip() {
        for step in WizardStep::all() {
            assert_eq!(WizardStep::from_index(step.index()), Some(step));
        }
        assert_eq!(WizardStep::from_index(WizardStep::COUNT), None);
    }

    #[test]
    fn test_ordinal_order_matches_declaration_order() {
        let all = WizardStep::all();
        for pair in all.windows(2) {
            assert!(pair[0].index() < pair[1].index());
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_titles() {
        assert_eq!(WizardStep::ImageInput.title(), "Image Input");
        assert_eq!(WizardStep::Generate.to_string(), "Generate");
    }
}
