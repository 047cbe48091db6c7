use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::time::Duration;

/// The three user-visible pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Groups,
    Repos,
    Code,
}

/// Terminal feedback for the pipeline: one progress bar per stage.
///
/// Stages receive three signals — set the total unit count, advance by one,
/// mark complete. Free-text notices are printed above the live bars so they
/// survive redraws.
pub struct Reporter {
    multi: MultiProgress,
    groups: ProgressBar,
    repos: ProgressBar,
    code: ProgressBar,
}

impl Reporter {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// Reporter that draws nothing. Used by tests and library callers that
    /// render their own feedback.
    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:<16} {bar:40.cyan/blue} {pos:>5}/{len:5}")
            .unwrap()
            .progress_chars("=>-")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

        let add_bar = |message: &'static str, total: u64| {
            let pb = multi.add(ProgressBar::new(total));
            pb.set_style(style.clone());
            pb.set_message(message);
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        };

        let groups = add_bar("Searching groups", 1);
        let repos = add_bar("Searching repos", 0);
        let code = add_bar("Searching code", 0);

        Reporter {
            multi,
            groups,
            repos,
            code,
        }
    }

    fn bar(&self, stage: Stage) -> &ProgressBar {
        match stage {
            Stage::Groups => &self.groups,
            Stage::Repos => &self.repos,
            Stage::Code => &self.code,
        }
    }

    pub fn set_total(&self, stage: Stage, total: u64) {
        self.bar(stage).set_length(total);
    }

    pub fn advance(&self, stage: Stage) {
        self.bar(stage).inc(1);
    }

    pub fn complete(&self, stage: Stage) {
        self.bar(stage).finish();
    }

    /// Print a line above the live bars.
    pub fn println(&self, message: &str) {
        let _ = self.multi.println(message);
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}
