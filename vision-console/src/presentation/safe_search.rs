use vision_defs::{Likelihood, SafeSearchAnnotation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikelihoodDisplay {
    pub label: &'static str,
    /// Bar fill in quarter steps: 0, 25, 50, 75 or 100.
    pub fill_percent: u8,
}

pub fn likelihood_display(likelihood: Likelihood) -> LikelihoodDisplay {
    let label = match likelihood {
        Likelihood::Unknown => "UNKNOWN",
        Likelihood::VeryUnlikely => "VERY UNLIKELY",
        Likelihood::Unlikely => "UNLIKELY",
        Likelihood::Possible => "POSSIBLE",
        Likelihood::Likely => "LIKELY",
        Likelihood::VeryLikely => "VERY LIKELY",
    };
    // Unknown and very unlikely both render as an empty bar.
    let fill_percent = likelihood.ordinal().saturating_sub(1) * 25;
    LikelihoodDisplay { label, fill_percent }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeSearchRow {
    pub category: &'static str,
    pub likelihood: Likelihood,
    pub display: LikelihoodDisplay,
}

/// Rows in fixed order: Adult, Spoof, Medical, Violence, Racy.
pub fn safe_search_rows(annotation: &SafeSearchAnnotation) -> [SafeSearchRow; 5] {
    let row = |category, likelihood| SafeSearchRow {
        category,
        likelihood,
        display: likelihood_display(likelihood),
    };
    [
        row("Adult", annotation.adult),
        row("Spoof", annotation.spoof),
        row("Medical", annotation.medical),
        row("Violence", annotation.violence),
        row("Racy", annotation.racy),
    ]
}
